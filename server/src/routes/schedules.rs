//! Schedule (visit) routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::schedule::{
    self, NewSchedule, ScheduleChanges, ScheduleFilter, ScheduleRow, ScheduleStatus, ServiceType, Transition,
};
use crate::state::AppState;
use crate::validate::{Validated, optional_text, optional_timestamp, required, timestamp};

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    pub upcoming: bool,
    pub patient_id: Option<Uuid>,
    pub caregiver_id: Option<Uuid>,
    pub status: Option<String>,
}

impl ScheduleQuery {
    fn validate(self) -> Validated<ScheduleFilter> {
        Ok(ScheduleFilter {
            upcoming: self.upcoming,
            patient_id: self.patient_id,
            caregiver_id: self.caregiver_id,
            status: ScheduleStatus::parse_optional("status", self.status.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleBody {
    #[serde(alias = "patientId")]
    pub patient_id: Uuid,
    #[serde(default, alias = "caregiverId")]
    pub caregiver_id: Option<Uuid>,
    #[serde(default, alias = "serviceType")]
    pub service_type: String,
    #[serde(default, alias = "scheduledStart", alias = "start")]
    pub scheduled_start: String,
    #[serde(default, alias = "scheduledEnd", alias = "end")]
    pub scheduled_end: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "recurrenceRule")]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateScheduleBody {
    fn validate(self) -> Validated<NewSchedule> {
        let service_type = ServiceType::parse("service_type", &required("service_type", &self.service_type)?)?;
        let scheduled_start = timestamp("scheduled_start", &self.scheduled_start)?;
        let scheduled_end = timestamp("scheduled_end", &self.scheduled_end)?;
        schedule::check_window(scheduled_start, scheduled_end)?;
        Ok(NewSchedule {
            patient_id: self.patient_id,
            caregiver_id: self.caregiver_id,
            service_type,
            scheduled_start,
            scheduled_end,
            timezone: optional_text(self.timezone),
            location: optional_text(self.location),
            recurrence_rule: optional_text(self.recurrence_rule),
            notes: optional_text(self.notes),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateScheduleBody {
    #[serde(default, alias = "caregiverId")]
    pub caregiver_id: Option<Uuid>,
    #[serde(default, alias = "serviceType")]
    pub service_type: Option<String>,
    #[serde(default, alias = "scheduledStart", alias = "start")]
    pub scheduled_start: Option<String>,
    #[serde(default, alias = "scheduledEnd", alias = "end")]
    pub scheduled_end: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "recurrenceRule")]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateScheduleBody {
    fn validate(self) -> Validated<ScheduleChanges> {
        Ok(ScheduleChanges {
            caregiver_id: self.caregiver_id,
            service_type: ServiceType::parse_optional("service_type", self.service_type.as_deref())?,
            scheduled_start: optional_timestamp("scheduled_start", self.scheduled_start)?,
            scheduled_end: optional_timestamp("scheduled_end", self.scheduled_end)?,
            timezone: optional_text(self.timezone),
            location: optional_text(self.location),
            recurrence_rule: optional_text(self.recurrence_rule),
            notes: optional_text(self.notes),
        })
    }
}

/// `GET /api/schedules`
pub async fn list_schedules(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<ScheduleQuery>,
) -> ApiResult<Json<Vec<ScheduleRow>>> {
    let filter = query.validate()?;
    Ok(Json(schedule::list_schedules(&state.pool, ctx.organization_id, &filter).await?))
}

/// `POST /api/schedules`
pub async fn create_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateScheduleBody>,
) -> ApiResult<(StatusCode, Json<ScheduleRow>)> {
    let new = body.validate()?;
    let row = schedule::create_schedule(&state.pool, ctx.organization_id, ctx.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/schedules/{id}`
pub async fn get_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(schedule_id): PathParam<Uuid>,
) -> ApiResult<Json<ScheduleRow>> {
    Ok(Json(schedule::get_schedule(&state.pool, ctx.organization_id, schedule_id).await?))
}

/// `PATCH /api/schedules/{id}`
pub async fn update_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(schedule_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateScheduleBody>,
) -> ApiResult<Json<ScheduleRow>> {
    let changes = body.validate()?;
    let row = schedule::update_schedule(&state.pool, ctx.organization_id, schedule_id, changes).await?;
    Ok(Json(row))
}

/// `DELETE /api/schedules/{id}` cancels rather than deletes.
pub async fn cancel_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(schedule_id): PathParam<Uuid>,
) -> ApiResult<Json<ScheduleRow>> {
    transition(&state, ctx, schedule_id, Transition::Cancel).await
}

/// `POST /api/schedules/{id}/start`
pub async fn start_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(schedule_id): PathParam<Uuid>,
) -> ApiResult<Json<ScheduleRow>> {
    transition(&state, ctx, schedule_id, Transition::Start).await
}

/// `POST /api/schedules/{id}/end`
pub async fn end_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(schedule_id): PathParam<Uuid>,
) -> ApiResult<Json<ScheduleRow>> {
    transition(&state, ctx, schedule_id, Transition::End).await
}

async fn transition(
    state: &AppState,
    ctx: RequestContext,
    schedule_id: Uuid,
    transition: Transition,
) -> ApiResult<Json<ScheduleRow>> {
    let row = schedule::transition_schedule(&state.pool, ctx.organization_id, schedule_id, transition).await?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    fn body(start: &str, end: &str) -> CreateScheduleBody {
        serde_json::from_value(serde_json::json!({
            "patientId": Uuid::nil(),
            "serviceType": "nursing",
            "scheduledStart": start,
            "scheduledEnd": end,
            "location": " ",
        }))
        .unwrap()
    }

    #[test]
    fn create_body_parses_times_and_type() {
        let new = body("2025-03-10T09:00:00Z", "2025-03-10T11:00:00Z").validate().unwrap();
        assert_eq!(new.service_type, ServiceType::Nursing);
        assert_eq!((new.scheduled_end - new.scheduled_start).whole_hours(), 2);
        assert_eq!(new.location, None);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = body("2025-03-10T11:00:00Z", "2025-03-10T09:00:00Z").validate().unwrap_err();
        assert_eq!(err.to_string(), "scheduled_end must be after scheduled_start");
    }

    #[test]
    fn unknown_service_type_is_rejected() {
        let mut body = body("2025-03-10T09:00:00Z", "2025-03-10T11:00:00Z");
        body.service_type = "gardening".into();
        assert!(matches!(body.validate(), Err(ValidationError::Choice { field: "service_type", .. })));
    }

    #[test]
    fn query_parses_status_filter() {
        let query = ScheduleQuery { upcoming: true, status: Some("in_progress".into()), ..Default::default() };
        let filter = query.validate().unwrap();
        assert!(filter.upcoming);
        assert_eq!(filter.status, Some(ScheduleStatus::InProgress));
    }
}
