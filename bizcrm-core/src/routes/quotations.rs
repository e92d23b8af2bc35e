use axum::{extract::State, http::StatusCode, response::Json};
use tracing::info;

use crate::auth::{CurrentUser, Permission};
use crate::error::ApiResult;
use crate::models::{ApprovalRequest, Invoice, NewQuotation, Quotation, QuotationPatch};
use crate::routes::extract::{filter_by_client, ClientIdFilter, EntityId, ValidatedJson};
use crate::AppState;

/// `GET /api/quotations[?clientId=N]`
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIdFilter(client_id): ClientIdFilter,
) -> ApiResult<Json<Vec<Quotation>>> {
    current.require(Permission::ViewQuotations)?;
    let quotations = state.storage.list_quotations().await?;
    Ok(Json(filter_by_client(quotations, client_id, |q| q.client_id)))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Quotation>> {
    current.require(Permission::ViewQuotations)?;
    Ok(Json(state.storage.get_quotation(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(mut quotation): ValidatedJson<NewQuotation>,
) -> ApiResult<(StatusCode, Json<Quotation>)> {
    current.require(Permission::EditQuotations)?;
    quotation.created_by.get_or_insert(current.username);
    let quotation = state.storage.create_quotation(quotation).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(patch): ValidatedJson<QuotationPatch>,
) -> ApiResult<Json<Quotation>> {
    current.require(Permission::EditQuotations)?;
    Ok(Json(state.storage.update_quotation(id, patch).await?))
}

pub async fn submit(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Quotation>> {
    current.require(Permission::EditQuotations)?;
    Ok(Json(state.storage.submit_quotation(id, &current.username).await?))
}

/// `POST /api/quotations/:id/approve`
///
/// The body is optional; `approvedBy` defaults to the caller.
pub async fn approve(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    body: Option<Json<ApprovalRequest>>,
) -> ApiResult<Json<Quotation>> {
    current.require(Permission::ApproveQuotations)?;
    let approved_by = body
        .and_then(|Json(request)| request.approved_by)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(current.username);
    let quotation = state.storage.approve_quotation(id, &approved_by).await?;
    info!(quotation = %quotation.quotation_number, %approved_by, "Quotation approved");
    Ok(Json(quotation))
}

pub async fn reject(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Quotation>> {
    current.require(Permission::ApproveQuotations)?;
    Ok(Json(state.storage.reject_quotation(id, &current.username).await?))
}

/// `POST /api/quotations/:id/generate-invoice`
pub async fn generate_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    current.require(Permission::ManageInvoices)?;
    let invoice = state.storage.generate_invoice(id).await?;
    info!(
        quotation_id = id,
        invoice = %invoice.invoice_number,
        by = %current.username,
        "Invoice generated"
    );
    Ok((StatusCode::CREATED, Json(invoice)))
}
