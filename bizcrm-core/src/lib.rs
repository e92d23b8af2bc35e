//! BizCRM core: leads, clients, quotations, invoices, tickets and the
//! dashboard behind a role-guarded JSON API.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod seed;
pub mod storage;
pub mod worker;

use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::storage::Storage;

pub use routes::create_router;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, jwt: JwtKeys) -> Self {
        Self {
            storage,
            jwt: Arc::new(jwt),
        }
    }
}
