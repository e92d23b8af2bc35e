use axum::{extract::State, response::Json};
use tracing::info;

use crate::auth::{CurrentUser, Permission};
use crate::error::ApiResult;
use crate::models::{Invoice, PaymentInput};
use crate::routes::extract::{filter_by_client, ClientIdFilter, EntityId, ValidatedJson};
use crate::AppState;

/// `GET /api/invoices[?clientId=N]`
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIdFilter(client_id): ClientIdFilter,
) -> ApiResult<Json<Vec<Invoice>>> {
    current.require(Permission::ViewInvoices)?;
    let invoices = state.storage.list_invoices().await?;
    Ok(Json(filter_by_client(invoices, client_id, |i| i.client_id)))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Invoice>> {
    current.require(Permission::ViewInvoices)?;
    Ok(Json(state.storage.get_invoice(id).await?))
}

/// `POST /api/invoices/:id/record-payment`
pub async fn record_payment(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
    ValidatedJson(payment): ValidatedJson<PaymentInput>,
) -> ApiResult<Json<Invoice>> {
    current.require(Permission::ManageInvoices)?;
    let amount = payment.payment_amount;
    let invoice = state.storage.record_payment(id, payment).await?;
    info!(
        invoice = %invoice.invoice_number,
        %amount,
        status = %invoice.status,
        by = %current.username,
        "Payment recorded"
    );
    Ok(Json(invoice))
}

pub async fn mark_sent(
    State(state): State<AppState>,
    current: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Json<Invoice>> {
    current.require(Permission::ManageInvoices)?;
    Ok(Json(state.storage.mark_invoice_as_sent(id).await?))
}
