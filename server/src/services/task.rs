//! Care tasks.
//!
//! A task belongs to exactly one scope: a single visit (`schedule_id`) or a
//! day of 24/7 care (`care_relationship_id` + `task_date`). Updates merge onto
//! the stored row and re-check the scope rule on the result.

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::care_relationship::care_relationship_patient;
use super::patient::ensure_patient;
use super::schedule::get_schedule;
use super::{ServiceError, ServiceResult};
use crate::validate::{ValidationError, Validated, text_enum};

pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;
pub const NOTES_MAX: usize = 500;

text_enum! {
    pub enum TaskCategory {
        Adl => "adl",
        Medication => "medication",
        Exercise => "exercise",
        Household => "household",
        Other => "other",
    }
}

text_enum! {
    pub enum TaskStatus {
        Pending => "pending",
        Completed => "completed",
        Skipped => "skipped",
        Declined => "declined",
    }
}

/// Exactly one of the two scopes must be set.
///
/// # Errors
///
/// Returns a validation error when both or neither are present.
pub fn check_scope(schedule_id: Option<Uuid>, care_relationship_id: Option<Uuid>) -> Validated<()> {
    match (schedule_id, care_relationship_id) {
        (Some(_), Some(_)) => Err(ValidationError::Rule(
            "task cannot be scoped to both a schedule and a care relationship".into(),
        )),
        (None, None) => Err(ValidationError::Rule(
            "task must be scoped to a schedule or a care relationship".into(),
        )),
        _ => Ok(()),
    }
}

/// Completion stamp after a status change. Moving to `completed` fills the
/// stamp if it is missing; existing stamps are never cleared.
#[must_use]
pub fn completion_stamp(
    status: TaskStatus,
    completed_at: Option<OffsetDateTime>,
    completed_by_id: Option<Uuid>,
    actor: Uuid,
    now: OffsetDateTime,
) -> (Option<OffsetDateTime>, Option<Uuid>) {
    if status != TaskStatus::Completed {
        return (completed_at, completed_by_id);
    }
    (completed_at.or(Some(now)), completed_by_id.or(Some(actor)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub patient_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub care_relationship_id: Option<Uuid>,
    pub task_date: Date,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<TaskCategory>,
    pub frequency: Option<String>,
    pub status: TaskStatus,
    pub notes: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub schedule_id: Option<Uuid>,
    pub care_relationship_id: Option<Uuid>,
    pub task_date: Option<Date>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TaskCategory>,
    pub frequency: Option<String>,
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub patient_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
    pub care_relationship_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub patient_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub care_relationship_id: Option<Uuid>,
    pub task_date: Date,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub sort_order: Option<i32>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub completed_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT t.id, t.organization_id, t.patient_id, t.schedule_id, t.care_relationship_id,
            t.task_date, t.title, t.description, t.category, t.frequency, t.status, t.notes,
            t.sort_order, t.completed_at, t.completed_by_id, t.created_at, t.updated_at
     FROM tasks t";

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, organization_id: Uuid, filter: &TaskFilter) {
    builder.push(" WHERE t.organization_id = ");
    builder.push_bind(organization_id);
    if let Some(patient_id) = filter.patient_id {
        builder.push(" AND t.patient_id = ");
        builder.push_bind(patient_id);
    }
    if let Some(schedule_id) = filter.schedule_id {
        builder.push(" AND t.schedule_id = ");
        builder.push_bind(schedule_id);
    }
    if let Some(care_relationship_id) = filter.care_relationship_id {
        builder.push(" AND t.care_relationship_id = ");
        builder.push_bind(care_relationship_id);
    }
}

/// List tasks by day, then by manual order.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_tasks(pool: &PgPool, organization_id: Uuid, filter: &TaskFilter) -> ServiceResult<Vec<TaskRow>> {
    let mut query = QueryBuilder::new(SELECT_COLUMNS);
    push_filters(&mut query, organization_id, filter);
    query.push(" ORDER BY t.task_date ASC, t.sort_order ASC NULLS LAST, t.created_at");
    Ok(query.build_query_as::<TaskRow>().fetch_all(pool).await?)
}

/// # Errors
///
/// Returns `NotFound` if the task does not exist in this organization.
pub async fn get_task(pool: &PgPool, organization_id: Uuid, task_id: Uuid) -> ServiceResult<TaskRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE t.id = $1 AND t.organization_id = $2");
    sqlx::query_as::<_, TaskRow>(&sql)
        .bind(task_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("task", task_id))
}

/// The schedule or relationship a task hangs off must belong to the task's patient.
///
/// # Errors
///
/// Returns a validation error when `owner` is a different patient.
pub fn check_scope_patient(field: &'static str, task_patient: Uuid, owner: Uuid) -> Validated<()> {
    if task_patient != owner {
        return Err(ValidationError::Rule(format!("{field} belongs to a different patient")));
    }
    Ok(())
}

async fn ensure_scope_targets(
    pool: &PgPool,
    organization_id: Uuid,
    patient_id: Uuid,
    schedule_id: Option<Uuid>,
    care_relationship_id: Option<Uuid>,
) -> ServiceResult<()> {
    if let Some(schedule_id) = schedule_id {
        let schedule = get_schedule(pool, organization_id, schedule_id).await?;
        check_scope_patient("schedule_id", patient_id, schedule.patient_id)?;
    }
    if let Some(care_relationship_id) = care_relationship_id {
        let owner = care_relationship_patient(pool, organization_id, care_relationship_id).await?;
        check_scope_patient("care_relationship_id", patient_id, owner)?;
    }
    Ok(())
}

/// # Errors
///
/// Returns a validation error for a bad scope or a scope owned by another
/// patient, and `NotFound` for unknown patient, schedule, or relationship
/// references.
pub async fn create_task(pool: &PgPool, organization_id: Uuid, actor: Uuid, new: NewTask) -> ServiceResult<TaskRow> {
    check_scope(new.schedule_id, new.care_relationship_id)?;
    ensure_patient(pool, organization_id, new.patient_id).await?;
    ensure_scope_targets(pool, organization_id, new.patient_id, new.schedule_id, new.care_relationship_id).await?;

    let (completed_at, completed_by_id) =
        completion_stamp(new.status, None, None, actor, OffsetDateTime::now_utc());
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO tasks (
            id, organization_id, patient_id, schedule_id, care_relationship_id, task_date, title,
            description, category, frequency, status, notes, sort_order, completed_at, completed_by_id
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(new.patient_id)
    .bind(new.schedule_id)
    .bind(new.care_relationship_id)
    .bind(new.task_date)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.category.map(TaskCategory::as_str))
    .bind(&new.frequency)
    .bind(new.status.as_str())
    .bind(&new.notes)
    .bind(new.sort_order)
    .bind(completed_at)
    .bind(completed_by_id)
    .execute(pool)
    .await?;

    info!(%id, patient_id = %new.patient_id, "task created");
    get_task(pool, organization_id, id).await
}

/// Merge `changes` onto the stored task.
///
/// # Errors
///
/// Returns a validation error if the merged scope is invalid and `NotFound`
/// for an unknown task or scope reference.
pub async fn update_task(
    pool: &PgPool,
    organization_id: Uuid,
    task_id: Uuid,
    actor: Uuid,
    changes: TaskChanges,
) -> ServiceResult<TaskRow> {
    let current = get_task(pool, organization_id, task_id).await?;
    let schedule_id = changes.schedule_id.or(current.schedule_id);
    let care_relationship_id = changes.care_relationship_id.or(current.care_relationship_id);
    check_scope(schedule_id, care_relationship_id)?;
    ensure_scope_targets(
        pool,
        organization_id,
        current.patient_id,
        changes.schedule_id,
        changes.care_relationship_id,
    )
    .await?;

    let status = match changes.status {
        Some(status) => status,
        None => TaskStatus::parse("status", &current.status)?,
    };
    let (completed_at, completed_by_id) = completion_stamp(
        status,
        current.completed_at,
        current.completed_by_id,
        actor,
        OffsetDateTime::now_utc(),
    );

    sqlx::query(
        "UPDATE tasks SET
            schedule_id = $3,
            care_relationship_id = $4,
            task_date = COALESCE($5, task_date),
            title = COALESCE($6, title),
            description = COALESCE($7, description),
            category = COALESCE($8, category),
            frequency = COALESCE($9, frequency),
            status = $10,
            notes = COALESCE($11, notes),
            sort_order = COALESCE($12, sort_order),
            completed_at = $13,
            completed_by_id = $14,
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(task_id)
    .bind(organization_id)
    .bind(schedule_id)
    .bind(care_relationship_id)
    .bind(changes.task_date)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.category.map(TaskCategory::as_str))
    .bind(changes.frequency)
    .bind(status.as_str())
    .bind(changes.notes)
    .bind(changes.sort_order)
    .bind(completed_at)
    .bind(completed_by_id)
    .execute(pool)
    .await?;

    if status == TaskStatus::Completed && current.completed_at.is_none() {
        info!(%task_id, %actor, "task completed");
    }
    get_task(pool, organization_id, task_id).await
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
