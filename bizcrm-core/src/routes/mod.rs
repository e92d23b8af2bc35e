//! HTTP routes under `/api`.
//!
//! Handlers check the caller's permission, validate the body, call
//! [`Storage`](crate::storage::Storage) and shape the response.

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod extract;
pub mod invoices;
pub mod leads;
pub mod quotations;
pub mod tickets;

#[cfg(test)]
mod tests;

use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::require_auth;
use crate::AppState;

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "bizcrm",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/check", get(auth::check));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users", get(auth::list_users))
        // Leads
        .route("/leads", get(leads::list).post(leads::create))
        .route("/leads/:id", get(leads::get).patch(leads::update).delete(leads::delete))
        .route("/leads/:id/notes", post(leads::add_note))
        .route("/leads/:id/convert", post(leads::convert))
        // Clients
        .route("/clients", get(clients::list).post(clients::create))
        .route(
            "/clients/:id",
            get(clients::get).patch(clients::update).delete(clients::delete),
        )
        // Quotations
        .route("/quotations", get(quotations::list).post(quotations::create))
        .route("/quotations/:id", get(quotations::get).patch(quotations::update))
        .route("/quotations/:id/approve", post(quotations::approve))
        .route("/quotations/:id/reject", post(quotations::reject))
        .route("/quotations/:id/submit", post(quotations::submit))
        .route("/quotations/:id/generate-invoice", post(quotations::generate_invoice))
        // Invoices
        .route("/invoices", get(invoices::list))
        .route("/invoices/:id", get(invoices::get))
        .route("/invoices/:id/record-payment", post(invoices::record_payment))
        .route("/invoices/:id/mark-sent", post(invoices::mark_sent))
        // Tickets
        .route("/tickets", get(tickets::list).post(tickets::create))
        .route("/tickets/:id", get(tickets::get).patch(tickets::update))
        .route("/tickets/:id/notes", post(tickets::add_note))
        .route("/tickets/:id/update-status", post(tickets::update_status))
        // Dashboard
        .route("/dashboard/metrics", get(dashboard::metrics))
        .route("/dashboard/activities", get(dashboard::activities))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
