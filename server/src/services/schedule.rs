//! Scheduled care visits.
//!
//! DESIGN
//! ======
//! Status moves through a small table of transitions:
//!
//! - `start`: scheduled | in_progress -> in_progress (first call stamps check-in)
//! - `end`: scheduled | in_progress -> completed (back-fills check-in)
//! - `cancel`: anything but completed -> cancelled
//!
//! Each transition re-checks the status it read inside the `UPDATE`, so a
//! concurrent transition surfaces as a conflict instead of a lost write.

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::caregiver::ensure_caregiver;
use super::patient::ensure_patient;
use super::{ServiceError, ServiceResult};
use crate::validate::{ValidationError, Validated, text_enum};

text_enum! {
    pub enum ServiceType {
        PersonalCare => "personal_care",
        Nursing => "nursing",
        Companionship => "companionship",
        Respite => "respite",
        Other => "other",
    }
}

text_enum! {
    pub enum ScheduleStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

impl ScheduleStatus {
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    #[must_use]
    pub fn can_end(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    #[must_use]
    pub fn can_cancel(self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Still on the calendar: not finished, cancelled, or missed.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    End,
    Cancel,
}

impl Transition {
    fn verb(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::End => "ended",
            Self::Cancel => "cancelled",
        }
    }

    fn allowed_from(self, status: ScheduleStatus) -> bool {
        match self {
            Self::Start => status.can_start(),
            Self::End => status.can_end(),
            Self::Cancel => status.can_cancel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchedule {
    pub patient_id: Uuid,
    pub caregiver_id: Option<Uuid>,
    pub service_type: ServiceType,
    pub scheduled_start: OffsetDateTime,
    pub scheduled_end: OffsetDateTime,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub recurrence_rule: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleChanges {
    pub caregiver_id: Option<Uuid>,
    pub service_type: Option<ServiceType>,
    pub scheduled_start: Option<OffsetDateTime>,
    pub scheduled_end: Option<OffsetDateTime>,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub recurrence_rule: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub upcoming: bool,
    pub patient_id: Option<Uuid>,
    pub caregiver_id: Option<Uuid>,
    pub status: Option<ScheduleStatus>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub caregiver_id: Option<Uuid>,
    pub caregiver_name: Option<String>,
    pub service_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_end: OffsetDateTime,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub recurrence_rule: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub checked_in_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub checked_out_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub created_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ScheduleRow {
    /// Typed status; rows written by this service always hold a known value.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stored text is outside the set.
    pub fn status(&self) -> Validated<ScheduleStatus> {
        ScheduleStatus::parse("status", &self.status)
    }
}

/// `scheduled_end` must be strictly after `scheduled_start`.
///
/// # Errors
///
/// Returns a validation error otherwise.
pub fn check_window(start: OffsetDateTime, end: OffsetDateTime) -> Validated<()> {
    if end <= start {
        return Err(ValidationError::Rule("scheduled_end must be after scheduled_start".into()));
    }
    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT s.id, s.organization_id, s.patient_id,
            concat_ws(' ', p.first_name, p.last_name) AS patient_name,
            s.caregiver_id,
            CASE WHEN c.id IS NULL THEN NULL ELSE concat_ws(' ', c.first_name, c.last_name) END AS caregiver_name,
            s.service_type, s.scheduled_start, s.scheduled_end, s.timezone, s.location,
            s.recurrence_rule, s.status, s.checked_in_at, s.checked_out_at, s.notes,
            s.created_by_id, s.created_at, s.updated_at
     FROM schedules s
     JOIN patients p ON p.id = s.patient_id
     LEFT JOIN caregivers c ON c.id = s.caregiver_id";

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, organization_id: Uuid, filter: &ScheduleFilter) {
    builder.push(" WHERE s.organization_id = ");
    builder.push_bind(organization_id);
    if filter.upcoming {
        push_upcoming(builder);
    }
    if let Some(patient_id) = filter.patient_id {
        builder.push(" AND s.patient_id = ");
        builder.push_bind(patient_id);
    }
    if let Some(caregiver_id) = filter.caregiver_id {
        builder.push(" AND s.caregiver_id = ");
        builder.push_bind(caregiver_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND s.status = ");
        builder.push_bind(status.as_str());
    }
}

/// Open schedules that have not yet ended. Shared with the dashboard counts.
pub(crate) fn push_upcoming(builder: &mut QueryBuilder<'_, Postgres>) {
    builder.push(" AND s.scheduled_end > now() AND s.status IN (");
    let mut open = builder.separated(", ");
    for status in ScheduleStatus::ALL.iter().filter(|s| s.is_open()) {
        open.push_bind(status.as_str());
    }
    builder.push(")");
}

/// List schedules in start order.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_schedules(
    pool: &PgPool,
    organization_id: Uuid,
    filter: &ScheduleFilter,
) -> ServiceResult<Vec<ScheduleRow>> {
    let mut query = QueryBuilder::new(SELECT_COLUMNS);
    push_filters(&mut query, organization_id, filter);
    query.push(" ORDER BY s.scheduled_start ASC, s.id");
    Ok(query.build_query_as::<ScheduleRow>().fetch_all(pool).await?)
}

/// # Errors
///
/// Returns `NotFound` if the schedule does not exist in this organization.
pub async fn get_schedule(pool: &PgPool, organization_id: Uuid, schedule_id: Uuid) -> ServiceResult<ScheduleRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE s.id = $1 AND s.organization_id = $2");
    sqlx::query_as::<_, ScheduleRow>(&sql)
        .bind(schedule_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("schedule", schedule_id))
}

/// Book a visit.
///
/// # Errors
///
/// Returns a validation error for an empty window and `NotFound` for an
/// unknown patient or caregiver.
pub async fn create_schedule(
    pool: &PgPool,
    organization_id: Uuid,
    created_by: Uuid,
    new: NewSchedule,
) -> ServiceResult<ScheduleRow> {
    check_window(new.scheduled_start, new.scheduled_end)?;
    ensure_patient(pool, organization_id, new.patient_id).await?;
    if let Some(caregiver_id) = new.caregiver_id {
        ensure_caregiver(pool, organization_id, caregiver_id).await?;
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO schedules (
            id, organization_id, patient_id, caregiver_id, service_type, scheduled_start, scheduled_end,
            timezone, location, recurrence_rule, status, notes, created_by_id
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(new.patient_id)
    .bind(new.caregiver_id)
    .bind(new.service_type.as_str())
    .bind(new.scheduled_start)
    .bind(new.scheduled_end)
    .bind(&new.timezone)
    .bind(&new.location)
    .bind(&new.recurrence_rule)
    .bind(ScheduleStatus::Scheduled.as_str())
    .bind(&new.notes)
    .bind(created_by)
    .execute(pool)
    .await?;

    info!(%id, patient_id = %new.patient_id, "schedule created");
    get_schedule(pool, organization_id, id).await
}

/// Partial update. The window rule is checked against the merged record.
///
/// # Errors
///
/// Returns `NotFound` for an unknown schedule or caregiver and a validation
/// error if the merged window is empty.
pub async fn update_schedule(
    pool: &PgPool,
    organization_id: Uuid,
    schedule_id: Uuid,
    changes: ScheduleChanges,
) -> ServiceResult<ScheduleRow> {
    let current = get_schedule(pool, organization_id, schedule_id).await?;
    let start = changes.scheduled_start.unwrap_or(current.scheduled_start);
    let end = changes.scheduled_end.unwrap_or(current.scheduled_end);
    check_window(start, end)?;
    if let Some(caregiver_id) = changes.caregiver_id {
        ensure_caregiver(pool, organization_id, caregiver_id).await?;
    }

    sqlx::query(
        "UPDATE schedules SET
            caregiver_id = COALESCE($3, caregiver_id),
            service_type = COALESCE($4, service_type),
            scheduled_start = $5,
            scheduled_end = $6,
            timezone = COALESCE($7, timezone),
            location = COALESCE($8, location),
            recurrence_rule = COALESCE($9, recurrence_rule),
            notes = COALESCE($10, notes),
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(schedule_id)
    .bind(organization_id)
    .bind(changes.caregiver_id)
    .bind(changes.service_type.map(ServiceType::as_str))
    .bind(start)
    .bind(end)
    .bind(changes.timezone)
    .bind(changes.location)
    .bind(changes.recurrence_rule)
    .bind(changes.notes)
    .execute(pool)
    .await?;

    get_schedule(pool, organization_id, schedule_id).await
}

/// Apply a lifecycle transition.
///
/// # Errors
///
/// Returns `Conflict` when the current status does not allow the transition
/// (or changed underneath us) and `NotFound` for an unknown schedule.
pub async fn transition_schedule(
    pool: &PgPool,
    organization_id: Uuid,
    schedule_id: Uuid,
    transition: Transition,
) -> ServiceResult<ScheduleRow> {
    let current = get_schedule(pool, organization_id, schedule_id).await?;
    let status = current.status()?;
    if !transition.allowed_from(status) {
        warn!(%schedule_id, %status, ?transition, "rejected schedule transition");
        return Err(ServiceError::Conflict(format!(
            "schedule cannot be {} from status {status}",
            transition.verb()
        )));
    }

    let sql = match transition {
        Transition::Start => {
            "UPDATE schedules SET status = $4, checked_in_at = COALESCE(checked_in_at, now()), updated_at = now()
             WHERE id = $1 AND organization_id = $2 AND status = $3"
        }
        Transition::End => {
            "UPDATE schedules SET status = $4, checked_in_at = COALESCE(checked_in_at, now()),
                checked_out_at = now(), updated_at = now()
             WHERE id = $1 AND organization_id = $2 AND status = $3"
        }
        Transition::Cancel => {
            "UPDATE schedules SET status = $4, updated_at = now()
             WHERE id = $1 AND organization_id = $2 AND status = $3"
        }
    };
    let target = match transition {
        Transition::Start => ScheduleStatus::InProgress,
        Transition::End => ScheduleStatus::Completed,
        Transition::Cancel => ScheduleStatus::Cancelled,
    };

    let result = sqlx::query(sql)
        .bind(schedule_id)
        .bind(organization_id)
        .bind(status.as_str())
        .bind(target.as_str())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::Conflict("schedule status changed concurrently, retry".into()));
    }

    info!(%schedule_id, from = %status, to = %target, "schedule {}", transition.verb());
    get_schedule(pool, organization_id, schedule_id).await
}

#[cfg(test)]
#[path = "schedule_test.rs"]
mod tests;
