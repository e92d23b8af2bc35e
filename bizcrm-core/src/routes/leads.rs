use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use tracing::info;

use crate::auth::{CurrentUser, Permission};
use crate::error::{ApiError, ApiResult};
use crate::models::{Client, Lead, LeadPatch, NewLead, NewNote, Note};
use crate::routes::extract::{EntityId, ValidatedJson};
use crate::AppState;

pub async fn list(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Vec<Lead>>> {
    current.require(Permission::ManageLeads)?;
    Ok(Json(state.storage.list_leads().await?))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Lead>> {
    current.require(Permission::ManageLeads)?;
    Ok(Json(state.storage.get_lead(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(lead): ValidatedJson<NewLead>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    current.require(Permission::ManageLeads)?;
    let lead = state.storage.create_lead(lead).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(patch): ValidatedJson<LeadPatch>,
) -> ApiResult<Json<Lead>> {
    current.require(Permission::ManageLeads)?;
    Ok(Json(state.storage.update_lead(id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<StatusCode> {
    current.require(Permission::ManageLeads)?;
    if state.storage.delete_lead(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Lead not found".to_string()))
    }
}

pub async fn add_note(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(note): ValidatedJson<NewNote>,
) -> ApiResult<Json<Lead>> {
    current.require(Permission::ManageLeads)?;
    let note = Note {
        text: note.text,
        timestamp: Utc::now(),
        user: note.user.unwrap_or(current.username),
    };
    Ok(Json(state.storage.add_lead_note(id, note).await?))
}

pub async fn convert(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Client>> {
    current.require(Permission::ManageLeads)?;
    let client = state.storage.convert_lead_to_client(id).await?;
    info!(lead_id = id, client_id = client.id, by = %current.username, "Lead converted");
    Ok(Json(client))
}
