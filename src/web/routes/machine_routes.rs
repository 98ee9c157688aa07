use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::entities::{machine, store};
use crate::db::enums::MachineStatus;
use crate::db::services::{self, HubGroup, HubSummary, MachineFilters, MachineInput, MachineUpdate};
use crate::services::auth_service;
use crate::web::middleware::auth::{AUTH_COOKIE, extract_token};
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineListQuery {
    status: Option<String>,
    store_id: Option<i32>,
    hub_id: Option<String>,
}

/// A machine together with its derived venue name, for the dashboard lists.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineResponse {
    #[serde(flatten)]
    machine: machine::Model,
    venue: Option<String>,
}

impl From<(machine::Model, Option<store::Model>)> for MachineResponse {
    fn from((machine, store): (machine::Model, Option<store::Model>)) -> Self {
        MachineResponse {
            machine,
            venue: store.map(|s| s.name),
        }
    }
}

/// The QR-scan landing view. Never carries credentials unless the caller
/// also presented a valid auth token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePublicView {
    machine_id: String,
    display_name: Option<String>,
    manufacturer: Option<String>,
    machine_model: Option<String>,
    serial_number: Option<String>,
    status: MachineStatus,
    venue: Option<String>,
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<serde_json::Value>,
}

impl MachinePublicView {
    fn new(
        machine: machine::Model,
        store: Option<store::Model>,
        include_credentials: bool,
    ) -> Self {
        MachinePublicView {
            machine_id: machine.machine_id,
            display_name: machine.display_name,
            manufacturer: machine.manufacturer,
            machine_model: machine.model,
            serial_number: machine.serial_number,
            status: machine.status,
            venue: store.map(|s| s.name),
            location: machine.current_location,
            credentials: if include_credentials {
                machine.credentials
            } else {
                None
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    token: String,
    generated_at: chrono::DateTime<chrono::Utc>,
}

// --- Route Handlers ---

async fn list_machines_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<MachineListQuery>,
) -> Result<Json<Vec<MachineResponse>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(MachineStatus::parse(raw).ok_or_else(|| {
            AppError::InvalidInput(format!("unknown status filter: {raw}"))
        })?),
        None => None,
    };
    let filters = MachineFilters {
        status,
        store_id: query.store_id,
        hub_id: query.hub_id,
    };
    let machines = services::list_machines(&app_state.db_pool, &filters).await?;
    Ok(Json(machines.into_iter().map(MachineResponse::from).collect()))
}

async fn list_hubs_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<HubSummary>>, AppError> {
    let hubs = services::list_hubs(&app_state.db_pool).await?;
    Ok(Json(hubs))
}

async fn machines_by_hub_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<HubGroup>>, AppError> {
    let groups = services::list_machines_by_hub(&app_state.db_pool).await?;
    Ok(Json(groups))
}

async fn get_machine_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<MachineResponse>, AppError> {
    let machine = services::get_machine(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;
    Ok(Json(MachineResponse::from(machine)))
}

async fn create_machine_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<MachineInput>,
) -> Result<(StatusCode, Json<machine::Model>), AppError> {
    let machine = services::create_machine(&app_state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(machine)))
}

async fn update_machine_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<MachineUpdate>,
) -> Result<Json<machine::Model>, AppError> {
    let machine = services::update_machine(&app_state.db_pool, id, &payload).await?;
    Ok(Json(machine))
}

async fn delete_machine_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    services::delete_machine(&app_state.db_pool, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn generate_qr_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<GenerateQrResponse>, AppError> {
    let machine = services::generate_qr_token(&app_state.db_pool, id).await?;
    // Both fields were just set by the service.
    match (machine.qr_token, machine.qr_generated_at) {
        (Some(token), Some(generated_at)) => Ok(Json(GenerateQrResponse {
            token,
            generated_at,
        })),
        _ => Err(AppError::InternalServerError(
            "QR token missing after generation".to_string(),
        )),
    }
}

/// Public QR-scan lookup. Works without authentication; a valid token
/// (header or cookie) additionally unlocks the credential fields.
async fn machine_by_token_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<MachinePublicView>, AppError> {
    let (machine, store) = services::find_by_qr_token(&app_state.db_pool, &token)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let cookie_token = jar.get(AUTH_COOKIE).map(|c| c.value().to_string());
    let authenticated = extract_token(authorization, cookie_token.as_deref())
        .map(|t| auth_service::verify_token(&t, &app_state.config.jwt_secret))
        .unwrap_or(false);

    Ok(Json(MachinePublicView::new(machine, store, authenticated)))
}

// --- Routers ---

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_machines_handler).post(create_machine_handler))
        .route("/by-hub", get(machines_by_hub_handler))
        .route(
            "/{id}",
            get(get_machine_handler)
                .put(update_machine_handler)
                .delete(delete_machine_handler),
        )
        .route("/{id}/generate-qr", post(generate_qr_handler))
}

/// Mounted at `/api/hubs`.
pub fn create_hub_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_hubs_handler))
}

/// Routes that must stay reachable without a session (QR-scan landing page).
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/by-token/{token}", get(machine_by_token_handler))
}
