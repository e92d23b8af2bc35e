use axum::{extract::State, http::StatusCode, response::Json};

use crate::auth::{CurrentUser, Permission};
use crate::error::{ApiError, ApiResult};
use crate::models::{Client, ClientPatch, NewClient};
use crate::routes::extract::{EntityId, ValidatedJson};
use crate::AppState;

pub async fn list(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Vec<Client>>> {
    current.require(Permission::ViewClients)?;
    Ok(Json(state.storage.list_clients().await?))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Client>> {
    current.require(Permission::ViewClients)?;
    Ok(Json(state.storage.get_client(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(client): ValidatedJson<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    current.require(Permission::ManageClients)?;
    let client = state.storage.create_client(client).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(patch): ValidatedJson<ClientPatch>,
) -> ApiResult<Json<Client>> {
    current.require(Permission::ManageClients)?;
    Ok(Json(state.storage.update_client(id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<StatusCode> {
    current.require(Permission::ManageClients)?;
    if state.storage.delete_client(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Client not found".to_string()))
    }
}
