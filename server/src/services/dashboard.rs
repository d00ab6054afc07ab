//! Counts behind the dashboard stat cards.

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::ServiceResult;
use super::leave::LeaveStatus;
use super::schedule::push_upcoming;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub patients: i64,
    pub caregivers: i64,
    pub pending_leave_requests: i64,
    pub upcoming_schedules: i64,
}

fn stats_query(organization_id: Uuid) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT (SELECT COUNT(*) FROM patients WHERE organization_id = ");
    builder.push_bind(organization_id);
    builder.push(") AS patients, (SELECT COUNT(*) FROM caregivers WHERE organization_id = ");
    builder.push_bind(organization_id);
    builder.push(") AS caregivers, (SELECT COUNT(*) FROM leave_requests WHERE organization_id = ");
    builder.push_bind(organization_id);
    builder.push(" AND status = ");
    builder.push_bind(LeaveStatus::Pending.as_str());
    builder.push(") AS pending_leave_requests, (SELECT COUNT(*) FROM schedules s WHERE s.organization_id = ");
    builder.push_bind(organization_id);
    push_upcoming(&mut builder);
    builder.push(") AS upcoming_schedules");
    builder
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn dashboard_stats(pool: &PgPool, organization_id: Uuid) -> ServiceResult<DashboardStats> {
    let (patients, caregivers, pending_leave_requests, upcoming_schedules): (i64, i64, i64, i64) =
        stats_query(organization_id)
            .build_query_as()
            .fetch_one(pool)
            .await?;
    Ok(DashboardStats { patients, caregivers, pending_leave_requests, upcoming_schedules })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upcoming_count_reuses_schedule_filter() {
        let builder = stats_query(Uuid::nil());
        let sql = builder.sql();
        assert!(sql.contains("status = $4"));
        assert!(sql.contains("s.organization_id = $5 AND s.scheduled_end > now() AND s.status IN ($6, $7)"));
        assert!(sql.ends_with(") AS upcoming_schedules"));
    }
}
