//! Leave request routes: filing, approval, and withdrawal.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::leave::{self, Decision, LeaveFilter, LeaveRequestRow, LeaveStatus, NewLeaveRequest};
use crate::state::AppState;
use crate::validate::{Validated, date, optional_text, required};

#[derive(Debug, Default, Deserialize)]
pub struct LeaveQuery {
    pub status: Option<String>,
    pub caregiver_id: Option<Uuid>,
}

impl LeaveQuery {
    fn validate(self) -> Validated<LeaveFilter> {
        Ok(LeaveFilter {
            status: LeaveStatus::parse_optional("status", self.status.as_deref())?,
            caregiver_id: self.caregiver_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaveBody {
    #[serde(alias = "caregiverId")]
    pub caregiver_id: Uuid,
    #[serde(default, alias = "startDate")]
    pub start_date: String,
    #[serde(default, alias = "endDate")]
    pub end_date: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CreateLeaveBody {
    fn validate(self) -> Validated<NewLeaveRequest> {
        let start_date = date("start_date", &required("start_date", &self.start_date)?)?;
        let end_date = date("end_date", &required("end_date", &self.end_date)?)?;
        leave::leave_days(start_date, end_date)?;
        Ok(NewLeaveRequest { caregiver_id: self.caregiver_id, start_date, end_date, reason: optional_text(self.reason) })
    }
}

/// `GET /api/leave-requests`
pub async fn list_leave_requests(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<LeaveQuery>,
) -> ApiResult<Json<Vec<LeaveRequestRow>>> {
    let filter = query.validate()?;
    Ok(Json(leave::list_leave_requests(&state.pool, ctx.organization_id, &filter).await?))
}

/// `POST /api/leave-requests`
pub async fn create_leave_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateLeaveBody>,
) -> ApiResult<(StatusCode, Json<LeaveRequestRow>)> {
    let new = body.validate()?;
    let row = leave::create_leave_request(&state.pool, ctx.organization_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/leave-requests/{id}`
pub async fn get_leave_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(leave_id): PathParam<Uuid>,
) -> ApiResult<Json<LeaveRequestRow>> {
    Ok(Json(leave::get_leave_request(&state.pool, ctx.organization_id, leave_id).await?))
}

/// `POST /api/leave-requests/{id}/approve`
pub async fn approve_leave_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(leave_id): PathParam<Uuid>,
) -> ApiResult<Json<LeaveRequestRow>> {
    decide(&state, ctx, leave_id, Decision::Approve).await
}

/// `POST /api/leave-requests/{id}/deny`
pub async fn deny_leave_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(leave_id): PathParam<Uuid>,
) -> ApiResult<Json<LeaveRequestRow>> {
    decide(&state, ctx, leave_id, Decision::Deny).await
}

async fn decide(
    state: &AppState,
    ctx: RequestContext,
    leave_id: Uuid,
    decision: Decision,
) -> ApiResult<Json<LeaveRequestRow>> {
    let row = leave::decide_leave_request(&state.pool, ctx.organization_id, leave_id, decision, ctx.user_id).await?;
    Ok(Json(row))
}

/// `DELETE /api/leave-requests/{id}`
pub async fn delete_leave_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(leave_id): PathParam<Uuid>,
) -> ApiResult<StatusCode> {
    leave::delete_leave_request(&state.pool, ctx.organization_id, leave_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
