//! Dashboard stat cards.

use axum::extract::State;
use axum::response::Json;

use super::context::RequestContext;
use crate::error::ApiResult;
use crate::services::dashboard::{self, DashboardStats};
use crate::state::AppState;

/// `GET /api/dashboard/stats`
pub async fn stats(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(dashboard::dashboard_stats(&state.pool, ctx.organization_id).await?))
}
