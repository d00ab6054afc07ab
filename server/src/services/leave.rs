//! Caregiver leave requests.
//!
//! DESIGN
//! ======
//! A request is decided exactly once. The decision is a single conditional
//! `UPDATE ... WHERE status = 'pending'`, so two supervisors racing on the same
//! request cannot both win; the loser sees a conflict.

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::caregiver::ensure_caregiver;
use super::{ServiceError, ServiceResult};
use crate::validate::{ValidationError, Validated, text_enum};

text_enum! {
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Denied => "denied",
    }
}

/// Outcome a supervisor can record on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    #[must_use]
    pub fn resulting_status(self) -> LeaveStatus {
        match self {
            Self::Approve => LeaveStatus::Approved,
            Self::Deny => LeaveStatus::Denied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaveRequest {
    pub caregiver_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub status: Option<LeaveStatus>,
    pub caregiver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub caregiver_id: Uuid,
    pub caregiver_name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub reason: Option<String>,
    pub days: i32,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub decided_at: Option<OffsetDateTime>,
    pub decided_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Inclusive day count: a request for a single day is one day.
///
/// # Errors
///
/// Returns a range error when `end` precedes `start`.
pub fn leave_days(start: Date, end: Date) -> Validated<i32> {
    if end < start {
        return Err(ValidationError::Range { start: "start_date", end: "end_date" });
    }
    i32::try_from((end - start).whole_days() + 1)
        .map_err(|_| ValidationError::Rule("leave period is too long".into()))
}

const SELECT_COLUMNS: &str = "SELECT l.id, l.organization_id, l.caregiver_id,
            concat_ws(' ', c.first_name, c.last_name) AS caregiver_name,
            l.start_date, l.end_date, l.reason, l.days, l.status,
            l.decided_at, l.decided_by_id, l.created_at, l.updated_at
     FROM leave_requests l
     JOIN caregivers c ON c.id = l.caregiver_id";

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, organization_id: Uuid, filter: &LeaveFilter) {
    builder.push(" WHERE l.organization_id = ");
    builder.push_bind(organization_id);
    if let Some(status) = filter.status {
        builder.push(" AND l.status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(caregiver_id) = filter.caregiver_id {
        builder.push(" AND l.caregiver_id = ");
        builder.push_bind(caregiver_id);
    }
}

/// List requests, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_leave_requests(
    pool: &PgPool,
    organization_id: Uuid,
    filter: &LeaveFilter,
) -> ServiceResult<Vec<LeaveRequestRow>> {
    let mut query = QueryBuilder::new(SELECT_COLUMNS);
    push_filters(&mut query, organization_id, filter);
    query.push(" ORDER BY l.created_at DESC, l.id");
    Ok(query
        .build_query_as::<LeaveRequestRow>()
        .fetch_all(pool)
        .await?)
}

/// # Errors
///
/// Returns `NotFound` if the request does not exist in this organization.
pub async fn get_leave_request(pool: &PgPool, organization_id: Uuid, leave_id: Uuid) -> ServiceResult<LeaveRequestRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE l.id = $1 AND l.organization_id = $2");
    sqlx::query_as::<_, LeaveRequestRow>(&sql)
        .bind(leave_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("leave request", leave_id))
}

/// File a new pending request.
///
/// # Errors
///
/// Returns a validation error for a reversed range and `NotFound` for an
/// unknown caregiver.
pub async fn create_leave_request(
    pool: &PgPool,
    organization_id: Uuid,
    new: NewLeaveRequest,
) -> ServiceResult<LeaveRequestRow> {
    let days = leave_days(new.start_date, new.end_date)?;
    ensure_caregiver(pool, organization_id, new.caregiver_id).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO leave_requests (id, organization_id, caregiver_id, start_date, end_date, reason, days, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(new.caregiver_id)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(&new.reason)
    .bind(days)
    .bind(LeaveStatus::Pending.as_str())
    .execute(pool)
    .await?;

    info!(%id, caregiver_id = %new.caregiver_id, days, "leave request filed");
    get_leave_request(pool, organization_id, id).await
}

/// Approve or deny a pending request.
///
/// # Errors
///
/// Returns `Conflict` if the request was already decided and `NotFound` if it
/// does not exist.
pub async fn decide_leave_request(
    pool: &PgPool,
    organization_id: Uuid,
    leave_id: Uuid,
    decision: Decision,
    decided_by: Uuid,
) -> ServiceResult<LeaveRequestRow> {
    let status = decision.resulting_status();
    let result = sqlx::query(
        "UPDATE leave_requests
         SET status = $3, decided_at = now(), decided_by_id = $4, updated_at = now()
         WHERE id = $1 AND organization_id = $2 AND status = $5",
    )
    .bind(leave_id)
    .bind(organization_id)
    .bind(status.as_str())
    .bind(decided_by)
    .bind(LeaveStatus::Pending.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let existing = get_leave_request(pool, organization_id, leave_id).await?;
        warn!(%leave_id, current = %existing.status, "leave request already decided");
        return Err(ServiceError::Conflict(format!("leave request is already {}", existing.status)));
    }

    info!(%leave_id, status = %status, %decided_by, "leave request decided");
    get_leave_request(pool, organization_id, leave_id).await
}

/// Withdraw a request regardless of status.
///
/// # Errors
///
/// Returns `NotFound` if nothing was deleted.
pub async fn delete_leave_request(pool: &PgPool, organization_id: Uuid, leave_id: Uuid) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM leave_requests WHERE id = $1 AND organization_id = $2")
        .bind(leave_id)
        .bind(organization_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("leave request", leave_id));
    }
    info!(%leave_id, "leave request withdrawn");
    Ok(())
}

#[cfg(test)]
#[path = "leave_test.rs"]
mod tests;
