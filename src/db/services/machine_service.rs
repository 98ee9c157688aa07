use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::db::entities::{asset_tag, machine, maintenance_log, store};
use crate::db::enums::{MachineStatus, TagStatus};
use crate::web::error::{AppError, map_unique_violation};

// --- Machine Service Functions ---

/// Payload for creating a machine. Only `machine_id` is required; the
/// remaining fields follow the relaxed schema the dashboard uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInput {
    pub machine_id: String,
    pub display_name: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub purchase_date: Option<chrono::NaiveDate>,
    pub purchase_price: Option<f64>,
    pub rom_version: Option<String>,
    pub software_version: Option<String>,
    pub credentials: Option<serde_json::Value>,
    pub current_location: Option<String>,
    pub store_id: Option<i32>,
    pub hub_id: Option<String>,
    pub game_type: Option<String>,
    pub game_title: Option<String>,
    pub status: Option<MachineStatus>,
    pub notes: Option<String>,
}

/// Partial update payload. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineUpdate {
    pub machine_id: Option<String>,
    pub display_name: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub purchase_date: Option<chrono::NaiveDate>,
    pub purchase_price: Option<f64>,
    pub rom_version: Option<String>,
    pub software_version: Option<String>,
    pub credentials: Option<serde_json::Value>,
    pub current_location: Option<String>,
    /// Double-option so an explicit `"storeId": null` unassigns the venue
    /// while an absent field leaves it unchanged.
    #[serde(default, deserialize_with = "some_or_null")]
    pub store_id: Option<Option<i32>>,
    pub hub_id: Option<String>,
    pub game_type: Option<String>,
    pub game_title: Option<String>,
    pub status: Option<MachineStatus>,
    pub notes: Option<String>,
}

fn some_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Filters accepted by the machine list endpoint.
#[derive(Debug, Clone, Default)]
pub struct MachineFilters {
    pub status: Option<MachineStatus>,
    pub store_id: Option<i32>,
    pub hub_id: Option<String>,
}

/// Generates a fresh opaque token for QR payloads.
pub fn new_qr_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Lists machines with their venue (if any), most recently updated first.
pub async fn list_machines(
    db: &DatabaseConnection,
    filters: &MachineFilters,
) -> Result<Vec<(machine::Model, Option<store::Model>)>, AppError> {
    let mut query = machine::Entity::find().find_also_related(store::Entity);
    if let Some(status) = &filters.status {
        query = query.filter(machine::Column::Status.eq(status.clone()));
    }
    if let Some(store_id) = filters.store_id {
        query = query.filter(machine::Column::StoreId.eq(store_id));
    }
    if let Some(hub_id) = &filters.hub_id {
        query = query.filter(machine::Column::HubId.eq(hub_id));
    }
    let machines = query
        .order_by_desc(machine::Column::UpdatedAt)
        .all(db)
        .await?;
    Ok(machines)
}

/// One known hub with the number of machines attached to it.
#[derive(Debug, Clone, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct HubSummary {
    pub hub_id: String,
    pub machine_count: i64,
}

/// Machines sharing one hub; `hub_id` is `None` for the unassigned group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubGroup {
    pub hub_id: Option<String>,
    pub machines: Vec<machine::Model>,
}

/// Distinct hub identifiers currently in use, with machine counts.
pub async fn list_hubs(db: &DatabaseConnection) -> Result<Vec<HubSummary>, AppError> {
    let hubs = machine::Entity::find()
        .select_only()
        .column(machine::Column::HubId)
        .column_as(machine::Column::Id.count(), "machine_count")
        .filter(machine::Column::HubId.is_not_null())
        .group_by(machine::Column::HubId)
        .order_by_asc(machine::Column::HubId)
        .into_model::<HubSummary>()
        .all(db)
        .await?;
    Ok(hubs)
}

/// The venue dashboard's hub hierarchy: every machine, grouped by hub.
pub async fn list_machines_by_hub(db: &DatabaseConnection) -> Result<Vec<HubGroup>, AppError> {
    let machines = machine::Entity::find()
        .order_by_asc(machine::Column::HubId)
        .order_by_asc(machine::Column::MachineId)
        .all(db)
        .await?;
    Ok(group_by_hub(machines))
}

/// Groups machines by hub id, hubs sorted by name, machines without a hub
/// collected into a trailing unassigned group.
pub fn group_by_hub(machines: Vec<machine::Model>) -> Vec<HubGroup> {
    let mut groups: Vec<HubGroup> = Vec::new();
    let mut unassigned: Vec<machine::Model> = Vec::new();

    for machine in machines {
        if machine.hub_id.is_none() {
            unassigned.push(machine);
            continue;
        }
        let hub_id = machine.hub_id.clone();
        match groups.iter_mut().find(|group| group.hub_id == hub_id) {
            Some(group) => group.machines.push(machine),
            None => groups.push(HubGroup {
                hub_id,
                machines: vec![machine],
            }),
        }
    }

    groups.sort_by(|a, b| a.hub_id.cmp(&b.hub_id));
    if !unassigned.is_empty() {
        groups.push(HubGroup {
            hub_id: None,
            machines: unassigned,
        });
    }
    groups
}

pub async fn get_machine(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<(machine::Model, Option<store::Model>)>, AppError> {
    let result = machine::Entity::find_by_id(id)
        .find_also_related(store::Entity)
        .one(db)
        .await?;
    Ok(result)
}

/// Inserts a machine on any connection (plain or transactional), so the
/// tag-driven compound create can reuse it.
pub(crate) async fn insert_machine<C: ConnectionTrait>(
    conn: &C,
    input: &MachineInput,
) -> Result<machine::Model, AppError> {
    if input.machine_id.trim().is_empty() {
        return Err(AppError::InvalidInput("machineId is required".to_string()));
    }

    let existing = machine::Entity::find()
        .filter(machine::Column::MachineId.eq(&input.machine_id))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Err(AppError::DuplicateId(
            "Machine ID already exists".to_string(),
        ));
    }

    let now = Utc::now();
    let new_machine = machine::ActiveModel {
        machine_id: Set(input.machine_id.clone()),
        display_name: Set(input.display_name.clone()),
        serial_number: Set(input.serial_number.clone()),
        manufacturer: Set(input.manufacturer.clone()),
        model: Set(input.model.clone()),
        purchase_date: Set(input.purchase_date),
        purchase_price: Set(input.purchase_price),
        rom_version: Set(input.rom_version.clone()),
        software_version: Set(input.software_version.clone()),
        credentials: Set(input.credentials.clone()),
        current_location: Set(input
            .current_location
            .clone()
            .unwrap_or_else(|| "warehouse".to_string())),
        store_id: Set(input.store_id),
        hub_id: Set(input.hub_id.clone()),
        game_type: Set(input.game_type.clone()),
        game_title: Set(input.game_title.clone()),
        status: Set(input.status.clone().unwrap_or_default()),
        notes: Set(input.notes.clone()),
        qr_token: Set(None),
        qr_generated_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // The pre-check above races with concurrent creates; the unique index is
    // the authority, so map its violation to the same error.
    new_machine
        .insert(conn)
        .await
        .map_err(|db_err| map_unique_violation(db_err, "Machine ID already exists"))
}

pub async fn create_machine(
    db: &DatabaseConnection,
    input: &MachineInput,
) -> Result<machine::Model, AppError> {
    insert_machine(db, input).await
}

pub async fn update_machine(
    db: &DatabaseConnection,
    id: i32,
    update: &MachineUpdate,
) -> Result<machine::Model, AppError> {
    let machine_model = machine::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;

    let mut active: machine::ActiveModel = machine_model.into_active_model();
    if let Some(machine_id) = &update.machine_id {
        if machine_id.trim().is_empty() {
            return Err(AppError::InvalidInput("machineId cannot be empty".to_string()));
        }
        active.machine_id = Set(machine_id.clone());
    }
    if let Some(display_name) = &update.display_name {
        active.display_name = Set(Some(display_name.clone()));
    }
    if let Some(serial_number) = &update.serial_number {
        active.serial_number = Set(Some(serial_number.clone()));
    }
    if let Some(manufacturer) = &update.manufacturer {
        active.manufacturer = Set(Some(manufacturer.clone()));
    }
    if let Some(model) = &update.model {
        active.model = Set(Some(model.clone()));
    }
    if let Some(purchase_date) = update.purchase_date {
        active.purchase_date = Set(Some(purchase_date));
    }
    if let Some(purchase_price) = update.purchase_price {
        active.purchase_price = Set(Some(purchase_price));
    }
    if let Some(rom_version) = &update.rom_version {
        active.rom_version = Set(Some(rom_version.clone()));
    }
    if let Some(software_version) = &update.software_version {
        active.software_version = Set(Some(software_version.clone()));
    }
    if let Some(credentials) = &update.credentials {
        active.credentials = Set(Some(credentials.clone()));
    }
    if let Some(current_location) = &update.current_location {
        active.current_location = Set(current_location.clone());
    }
    if let Some(store_id) = update.store_id {
        active.store_id = Set(store_id);
        if store_id.is_none() && update.current_location.is_none() {
            // Unassigned machines fall back to the warehouse.
            active.current_location = Set("warehouse".to_string());
        }
    }
    if let Some(hub_id) = &update.hub_id {
        active.hub_id = Set(Some(hub_id.clone()));
    }
    if let Some(game_type) = &update.game_type {
        active.game_type = Set(Some(game_type.clone()));
    }
    if let Some(game_title) = &update.game_title {
        active.game_title = Set(Some(game_title.clone()));
    }
    if let Some(status) = &update.status {
        active.status = Set(status.clone());
    }
    if let Some(notes) = &update.notes {
        active.notes = Set(Some(notes.clone()));
    }
    active.updated_at = Set(Utc::now());

    active
        .update(db)
        .await
        .map_err(|db_err| map_unique_violation(db_err, "Machine ID already exists"))
}

/// Hard-deletes a machine. Its maintenance logs are removed and any linked
/// asset tag is returned to the pool, all in one transaction.
pub async fn delete_machine(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let machine_model = machine::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;

    let txn = db.begin().await?;

    maintenance_log::Entity::delete_many()
        .filter(maintenance_log::Column::MachineId.eq(id))
        .exec(&txn)
        .await?;

    if let Some(tag_model) = asset_tag::Entity::find()
        .filter(asset_tag::Column::MachineId.eq(id))
        .one(&txn)
        .await?
    {
        let mut active_tag: asset_tag::ActiveModel = tag_model.into_active_model();
        active_tag.status = Set(TagStatus::Unlinked);
        active_tag.machine_id = Set(None);
        active_tag.linked_at = Set(None);
        active_tag.update(&txn).await?;
    }

    machine_model.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Assigns a fresh QR token to the machine, overwriting any previous one.
/// The old printed code stops resolving once this runs.
pub async fn generate_qr_token(
    db: &DatabaseConnection,
    id: i32,
) -> Result<machine::Model, AppError> {
    let machine_model = machine::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;

    let now = Utc::now();
    let mut active: machine::ActiveModel = machine_model.into_active_model();
    active.qr_token = Set(Some(new_qr_token()));
    active.qr_generated_at = Set(Some(now));
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

/// Resolves a scanned QR token to its machine, for the public landing page.
pub async fn find_by_qr_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<(machine::Model, Option<store::Model>)>, AppError> {
    let result = machine::Entity::find()
        .filter(machine::Column::QrToken.eq(token))
        .find_also_related(store::Entity)
        .one(db)
        .await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn machine_fixture(id: i32, hub_id: Option<&str>) -> machine::Model {
        machine::Model {
            id,
            machine_id: format!("M{id}"),
            display_name: None,
            serial_number: None,
            manufacturer: None,
            model: None,
            purchase_date: None,
            purchase_price: None,
            rom_version: None,
            software_version: None,
            credentials: None,
            current_location: "warehouse".to_string(),
            store_id: None,
            hub_id: hub_id.map(|h| h.to_string()),
            game_type: None,
            game_title: None,
            status: MachineStatus::default(),
            notes: None,
            qr_token: None,
            qr_generated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_machine_id_is_rejected_before_insert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![machine_fixture(1, None)]])
            .into_connection();

        let input: MachineInput = serde_json::from_str(r#"{"machineId":"M1"}"#).unwrap();
        let err = create_machine(&db, &input).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateId(msg) if msg == "Machine ID already exists"));
    }

    #[test]
    fn machines_group_by_hub_with_unassigned_last() {
        let machines = vec![
            machine_fixture(1, Some("pi-2")),
            machine_fixture(2, None),
            machine_fixture(3, Some("pi-1")),
            machine_fixture(4, Some("pi-2")),
        ];

        let groups = group_by_hub(machines);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].hub_id.as_deref(), Some("pi-1"));
        assert_eq!(groups[1].hub_id.as_deref(), Some("pi-2"));
        assert_eq!(groups[1].machines.len(), 2);
        assert_eq!(groups[2].hub_id, None);
        assert_eq!(groups[2].machines[0].id, 2);
    }

    #[test]
    fn hub_summary_serializes_camel_case() {
        let json = serde_json::to_value(HubSummary {
            hub_id: "pi-1".to_string(),
            machine_count: 3,
        })
        .unwrap();
        assert_eq!(json["hubId"], "pi-1");
        assert_eq!(json["machineCount"], 3);
    }

    #[test]
    fn qr_tokens_are_unique_and_opaque() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let token = new_qr_token();
            assert_eq!(token.len(), 32);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(seen.insert(token), "duplicate token generated");
        }
    }

    #[test]
    fn machine_input_requires_only_machine_id() {
        let input: MachineInput = serde_json::from_str(r#"{"machineId":"M1"}"#).unwrap();
        assert_eq!(input.machine_id, "M1");
        assert!(input.serial_number.is_none());
        assert!(input.status.is_none());

        // camelCase wire names map onto the snake_case fields
        let input: MachineInput = serde_json::from_str(
            r#"{"machineId":"M2","displayName":"Lucky 7","storeId":3,"status":"deployed"}"#,
        )
        .unwrap();
        assert_eq!(input.display_name.as_deref(), Some("Lucky 7"));
        assert_eq!(input.store_id, Some(3));
        assert_eq!(input.status, Some(MachineStatus::Deployed));

        assert!(serde_json::from_str::<MachineInput>(r#"{"serialNumber":"X"}"#).is_err());
    }

    #[test]
    fn machine_update_distinguishes_null_from_absent_store() {
        let update: MachineUpdate = serde_json::from_str(r#"{"notes":"moved"}"#).unwrap();
        assert_eq!(update.store_id, None); // absent: leave unchanged

        let update: MachineUpdate = serde_json::from_str(r#"{"storeId":null}"#).unwrap();
        assert_eq!(update.store_id, Some(None)); // explicit null: unassign

        let update: MachineUpdate = serde_json::from_str(r#"{"storeId":7}"#).unwrap();
        assert_eq!(update.store_id, Some(Some(7)));
    }
}
