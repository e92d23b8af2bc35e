use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;

use crate::auth::{CurrentUser, Permission};
use crate::error::ApiResult;
use crate::models::{NewNote, NewTicket, Note, Ticket, TicketPatch, TicketStatusUpdate};
use crate::routes::extract::{filter_by_client, ClientIdFilter, EntityId, ValidatedJson};
use crate::AppState;

/// `GET /api/tickets[?clientId=N]`
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIdFilter(client_id): ClientIdFilter,
) -> ApiResult<Json<Vec<Ticket>>> {
    current.require(Permission::ViewTickets)?;
    let tickets = state.storage.list_tickets().await?;
    Ok(Json(filter_by_client(tickets, client_id, |t| t.client_id)))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Ticket>> {
    current.require(Permission::ViewTickets)?;
    Ok(Json(state.storage.get_ticket(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(mut ticket): ValidatedJson<NewTicket>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    current.require(Permission::RaiseTickets)?;
    ticket.created_by.get_or_insert(current.username);
    let ticket = state.storage.create_ticket(ticket).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(patch): ValidatedJson<TicketPatch>,
) -> ApiResult<Json<Ticket>> {
    current.require(Permission::EditTickets)?;
    Ok(Json(state.storage.update_ticket(id, patch).await?))
}

pub async fn add_note(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(note): ValidatedJson<NewNote>,
) -> ApiResult<Json<Ticket>> {
    current.require(Permission::RaiseTickets)?;
    let note = Note {
        text: note.text,
        timestamp: Utc::now(),
        user: note.user.unwrap_or(current.username),
    };
    Ok(Json(state.storage.add_ticket_note(id, note).await?))
}

/// `POST /api/tickets/:id/update-status`
pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(update): ValidatedJson<TicketStatusUpdate>,
) -> ApiResult<Json<Ticket>> {
    current.require(Permission::EditTickets)?;
    Ok(Json(state.storage.update_ticket_status(id, update.status).await?))
}
