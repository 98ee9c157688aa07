use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::MachineStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machines")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Human-assigned identifier, printed on the cabinet.
    #[sea_orm(unique)]
    pub machine_id: String,
    pub display_name: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub purchase_date: Option<Date>,
    #[sea_orm(column_type = "Double", nullable)]
    pub purchase_price: Option<f64>,
    pub rom_version: Option<String>,
    pub software_version: Option<String>,
    /// Lock PIN and named passwords. Never exposed on public routes.
    pub credentials: Option<Json>,
    /// Free-text location; "warehouse" when not deployed to a store.
    pub current_location: String,
    pub store_id: Option<i32>,
    pub hub_id: Option<String>,
    pub game_type: Option<String>,
    pub game_title: Option<String>,
    pub status: MachineStatus,
    pub notes: Option<String>,
    /// QR payload for the scan landing page. Regeneration replaces it.
    #[sea_orm(unique)]
    pub qr_token: Option<String>,
    pub qr_generated_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    Store,
    #[sea_orm(has_many = "super::maintenance_log::Entity")]
    MaintenanceLog,
    #[sea_orm(has_one = "super::asset_tag::Entity")]
    AssetTag,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::maintenance_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaintenanceLog.def()
    }
}

impl Related<super::asset_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetTag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
