use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::db::entities::{machine, maintenance_log};
use crate::db::enums::MaintenanceType;
use crate::web::error::AppError;

// --- Maintenance Log Service Functions ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceLogInput {
    pub machine_id: i32,
    pub date: chrono::DateTime<Utc>,
    pub technician: String,
    #[serde(rename = "type")]
    pub log_type: MaintenanceType,
    pub description: String,
    pub parts_replaced: Option<Vec<String>>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceLogUpdate {
    pub date: Option<chrono::DateTime<Utc>>,
    pub technician: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<MaintenanceType>,
    pub description: Option<String>,
    pub parts_replaced: Option<Vec<String>>,
    pub cost: Option<f64>,
}

/// Lists logs newest service date first, optionally narrowed to one machine
/// or one event type.
pub async fn list_logs(
    db: &DatabaseConnection,
    machine_id: Option<i32>,
    log_type: Option<MaintenanceType>,
) -> Result<Vec<maintenance_log::Model>, AppError> {
    let mut query = maintenance_log::Entity::find();
    if let Some(machine_id) = machine_id {
        query = query.filter(maintenance_log::Column::MachineId.eq(machine_id));
    }
    if let Some(log_type) = log_type {
        query = query.filter(maintenance_log::Column::LogType.eq(log_type));
    }
    let logs = query
        .order_by_desc(maintenance_log::Column::Date)
        .all(db)
        .await?;
    Ok(logs)
}

pub async fn get_log(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<maintenance_log::Model>, AppError> {
    Ok(maintenance_log::Entity::find_by_id(id).one(db).await?)
}

pub async fn create_log(
    db: &DatabaseConnection,
    input: &MaintenanceLogInput,
) -> Result<maintenance_log::Model, AppError> {
    if input.technician.trim().is_empty() {
        return Err(AppError::InvalidInput("technician is required".to_string()));
    }
    if input.description.trim().is_empty() {
        return Err(AppError::InvalidInput("description is required".to_string()));
    }

    // Logs cannot exist without a machine.
    let machine_exists = machine::Entity::find_by_id(input.machine_id)
        .one(db)
        .await?
        .is_some();
    if !machine_exists {
        return Err(AppError::InvalidInput(format!(
            "machineId {} does not reference an existing machine",
            input.machine_id
        )));
    }

    let now = Utc::now();
    let new_log = maintenance_log::ActiveModel {
        machine_id: Set(input.machine_id),
        date: Set(input.date),
        technician: Set(input.technician.clone()),
        log_type: Set(input.log_type.clone()),
        description: Set(input.description.clone()),
        parts_replaced: Set(input
            .parts_replaced
            .as_ref()
            .map(|parts| serde_json::json!(parts))),
        cost: Set(input.cost),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(new_log.insert(db).await?)
}

pub async fn update_log(
    db: &DatabaseConnection,
    id: i32,
    update: &MaintenanceLogUpdate,
) -> Result<maintenance_log::Model, AppError> {
    let log_model = maintenance_log::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Maintenance log not found".to_string()))?;

    let mut active: maintenance_log::ActiveModel = log_model.into_active_model();
    if let Some(date) = update.date {
        active.date = Set(date);
    }
    if let Some(technician) = &update.technician {
        if technician.trim().is_empty() {
            return Err(AppError::InvalidInput("technician cannot be empty".to_string()));
        }
        active.technician = Set(technician.clone());
    }
    if let Some(log_type) = &update.log_type {
        active.log_type = Set(log_type.clone());
    }
    if let Some(description) = &update.description {
        if description.trim().is_empty() {
            return Err(AppError::InvalidInput("description cannot be empty".to_string()));
        }
        active.description = Set(description.clone());
    }
    if let Some(parts_replaced) = &update.parts_replaced {
        active.parts_replaced = Set(Some(serde_json::json!(parts_replaced)));
    }
    if let Some(cost) = update.cost {
        active.cost = Set(Some(cost));
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

pub async fn delete_log(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let log_model = maintenance_log::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Maintenance log not found".to_string()))?;
    log_model.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_input_rejects_unknown_type_on_the_wire() {
        let ok: MaintenanceLogInput = serde_json::from_str(
            r#"{"machineId":1,"date":"2026-08-01T10:00:00Z","technician":"Ana","type":"preventive","description":"quarterly check"}"#,
        )
        .unwrap();
        assert_eq!(ok.log_type, MaintenanceType::Preventive);
        assert!(ok.parts_replaced.is_none());

        let err = serde_json::from_str::<MaintenanceLogInput>(
            r#"{"machineId":1,"date":"2026-08-01T10:00:00Z","technician":"Ana","type":"upgrade","description":"x"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn log_input_requires_machine_reference() {
        let err = serde_json::from_str::<MaintenanceLogInput>(
            r#"{"date":"2026-08-01T10:00:00Z","technician":"Ana","type":"repair","description":"x"}"#,
        );
        assert!(err.is_err());
    }
}
