use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::entities::{asset_tag, machine};
use crate::db::enums::TagStatus;
use crate::db::services::{self, MachineInput};
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Deserialize)]
pub struct TagListQuery {
    status: Option<String>,
}

#[derive(Deserialize)]
pub struct GenerateTagsRequest {
    count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTagRequest {
    machine_id: i32,
}

/// Minimal machine summary shown next to a linked tag.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMachineSummary {
    id: i32,
    machine_id: String,
    display_name: Option<String>,
}

impl From<machine::Model> for TagMachineSummary {
    fn from(machine: machine::Model) -> Self {
        TagMachineSummary {
            id: machine.id,
            machine_id: machine.machine_id,
            display_name: machine.display_name,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    #[serde(flatten)]
    tag: asset_tag::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    machine: Option<TagMachineSummary>,
}

impl From<(asset_tag::Model, Option<machine::Model>)> for TagResponse {
    fn from((tag, machine): (asset_tag::Model, Option<machine::Model>)) -> Self {
        TagResponse {
            tag,
            machine: machine.map(TagMachineSummary::from),
        }
    }
}

/// Public view for a scanned tag: the status always, a non-credential
/// machine subset only when linked.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPublicView {
    token: String,
    status: TagStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    linked_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    machine: Option<TagMachineSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineWithTagResponse {
    machine: machine::Model,
    tag: asset_tag::Model,
}

// --- Route Handlers ---

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TagListQuery>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(TagStatus::parse(raw).ok_or_else(|| {
            AppError::InvalidInput(format!("unknown tag status filter: {raw}"))
        })?),
        None => None,
    };
    let tags = services::list_tags(&app_state.db_pool, status).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn generate_tags_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<GenerateTagsRequest>,
) -> Result<(StatusCode, Json<Vec<asset_tag::Model>>), AppError> {
    let tags = services::generate_batch(&app_state.db_pool, payload.count).await?;
    Ok((StatusCode::CREATED, Json(tags)))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<TagPublicView>, AppError> {
    let (tag, machine) = services::get_by_token(&app_state.db_pool, &token)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
    Ok(Json(TagPublicView {
        token: tag.token,
        status: tag.status,
        linked_at: tag.linked_at,
        machine: machine.map(TagMachineSummary::from),
    }))
}

async fn link_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<LinkTagRequest>,
) -> Result<Json<asset_tag::Model>, AppError> {
    let tag = services::link_tag(&app_state.db_pool, &token, payload.machine_id).await?;
    Ok(Json(tag))
}

async fn unlink_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<asset_tag::Model>, AppError> {
    let tag = services::unlink_tag(&app_state.db_pool, &token).await?;
    Ok(Json(tag))
}

async fn create_machine_with_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<MachineInput>,
) -> Result<(StatusCode, Json<CreateMachineWithTagResponse>), AppError> {
    let (machine, tag) =
        services::create_machine_with_tag(&app_state.db_pool, &token, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateMachineWithTagResponse { machine, tag }),
    ))
}

// --- Routers ---

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags_handler))
        .route("/generate", post(generate_tags_handler))
        .route("/{token}/link", post(link_tag_handler))
        .route("/{token}/unlink", post(unlink_tag_handler))
        .route("/{token}/create-machine", post(create_machine_with_tag_handler))
}

/// The scan landing page resolves tags without a session.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/{token}", get(get_tag_handler))
}
