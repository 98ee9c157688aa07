use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::TagStatus;

/// A pre-printed QR sticker. `machine_id` is set iff `status` is `linked`;
/// the unique index on `machine_id` enforces the 1:1 bound.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset_tags")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Opaque token used as the QR payload / URL path segment.
    #[sea_orm(unique)]
    pub token: String,
    pub status: TagStatus,
    #[sea_orm(unique)]
    pub machine_id: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub linked_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::MachineId",
        to = "super::machine::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    Machine,
}

impl Related<super::machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
