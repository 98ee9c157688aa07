use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::entities::maintenance_log;
use crate::db::enums::MaintenanceType;
use crate::db::services::{self, MaintenanceLogInput, MaintenanceLogUpdate};
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceListQuery {
    machine_id: Option<i32>,
    #[serde(rename = "type")]
    log_type: Option<String>,
}

// --- Route Handlers ---

async fn list_logs_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<MaintenanceListQuery>,
) -> Result<Json<Vec<maintenance_log::Model>>, AppError> {
    let log_type = match query.log_type.as_deref() {
        Some(raw) => Some(MaintenanceType::parse(raw).ok_or_else(|| {
            AppError::InvalidInput(format!("unknown maintenance type filter: {raw}"))
        })?),
        None => None,
    };
    let logs = services::list_logs(&app_state.db_pool, query.machine_id, log_type).await?;
    Ok(Json(logs))
}

async fn get_log_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<maintenance_log::Model>, AppError> {
    let log = services::get_log(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Maintenance log not found".to_string()))?;
    Ok(Json(log))
}

async fn create_log_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<MaintenanceLogInput>,
) -> Result<(StatusCode, Json<maintenance_log::Model>), AppError> {
    let log = services::create_log(&app_state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

async fn update_log_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<MaintenanceLogUpdate>,
) -> Result<Json<maintenance_log::Model>, AppError> {
    let log = services::update_log(&app_state.db_pool, id, &payload).await?;
    Ok(Json(log))
}

async fn delete_log_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    services::delete_log(&app_state.db_pool, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// --- Router ---

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_logs_handler).post(create_log_handler))
        .route(
            "/{id}",
            get(get_log_handler)
                .put(update_log_handler)
                .delete(delete_log_handler),
        )
}
