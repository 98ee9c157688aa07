use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::entities::{machine, store};
use crate::db::services::{self, StoreInput, StoreUpdate};
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

/// A store merged with its current machine list (read-time join).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetailResponse {
    #[serde(flatten)]
    store: store::Model,
    machines: Vec<machine::Model>,
}

// --- Route Handlers ---

async fn list_stores_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<store::Model>>, AppError> {
    let stores = services::list_stores(&app_state.db_pool).await?;
    Ok(Json(stores))
}

async fn get_store_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<StoreDetailResponse>, AppError> {
    let (store, machines) = services::get_store_with_machines(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;
    Ok(Json(StoreDetailResponse { store, machines }))
}

async fn create_store_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<StoreInput>,
) -> Result<(StatusCode, Json<store::Model>), AppError> {
    let store = services::create_store(&app_state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

async fn update_store_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<StoreUpdate>,
) -> Result<Json<store::Model>, AppError> {
    let store = services::update_store(&app_state.db_pool, id, &payload).await?;
    Ok(Json(store))
}

async fn delete_store_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    services::delete_store(&app_state.db_pool, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// --- Router ---

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_stores_handler).post(create_store_handler))
        .route(
            "/{id}",
            get(get_store_handler)
                .put(update_store_handler)
                .delete(delete_store_handler),
        )
}
