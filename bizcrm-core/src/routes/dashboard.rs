use axum::{extract::State, response::Json};

use crate::auth::{CurrentUser, Permission};
use crate::error::ApiResult;
use crate::models::{Activity, DashboardMetrics};
use crate::AppState;

/// `GET /api/dashboard/metrics`
pub async fn metrics(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<DashboardMetrics>> {
    current.require(Permission::ViewDashboard)?;
    Ok(Json(state.storage.dashboard_metrics().await?))
}

/// `GET /api/dashboard/activities` - the most recent activities, newest first.
pub async fn activities(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Vec<Activity>>> {
    current.require(Permission::ViewDashboard)?;
    Ok(Json(state.storage.list_activities().await?))
}
