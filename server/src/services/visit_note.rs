//! Visit notes: one caregiver write-up per schedule.

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::schedule::get_schedule;
use super::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFields {
    pub summary: Option<String>,
    pub mood: Option<String>,
    pub incidents: Option<String>,
    pub next_steps: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VisitNoteRow {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub author_id: Uuid,
    pub summary: Option<String>,
    pub mood: Option<String>,
    pub incidents: Option<String>,
    pub next_steps: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT n.id, n.schedule_id, n.author_id, n.summary, n.mood, n.incidents,
            n.next_steps, n.created_at, n.updated_at
     FROM visit_notes n
     JOIN schedules s ON s.id = n.schedule_id";

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_visit_notes(
    pool: &PgPool,
    organization_id: Uuid,
    schedule_id: Option<Uuid>,
) -> ServiceResult<Vec<VisitNoteRow>> {
    let mut query = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    query.push(" WHERE s.organization_id = ");
    query.push_bind(organization_id);
    if let Some(schedule_id) = schedule_id {
        query.push(" AND n.schedule_id = ");
        query.push_bind(schedule_id);
    }
    query.push(" ORDER BY n.created_at DESC");
    Ok(query.build_query_as::<VisitNoteRow>().fetch_all(pool).await?)
}

/// # Errors
///
/// Returns `NotFound` if the note does not exist in this organization.
pub async fn get_visit_note(pool: &PgPool, organization_id: Uuid, note_id: Uuid) -> ServiceResult<VisitNoteRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE n.id = $1 AND s.organization_id = $2");
    sqlx::query_as::<_, VisitNoteRow>(&sql)
        .bind(note_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("visit note", note_id))
}

/// Attach the note for a schedule.
///
/// # Errors
///
/// Returns `NotFound` for an unknown schedule and `Conflict` when the schedule
/// already has a note.
pub async fn create_visit_note(
    pool: &PgPool,
    organization_id: Uuid,
    schedule_id: Uuid,
    author_id: Uuid,
    fields: NoteFields,
) -> ServiceResult<VisitNoteRow> {
    get_schedule(pool, organization_id, schedule_id).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO visit_notes (id, schedule_id, author_id, summary, mood, incidents, next_steps)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(schedule_id)
    .bind(author_id)
    .bind(fields.summary)
    .bind(fields.mood)
    .bind(fields.incidents)
    .bind(fields.next_steps)
    .execute(pool)
    .await?;

    info!(%id, %schedule_id, %author_id, "visit note recorded");
    get_visit_note(pool, organization_id, id).await
}

/// # Errors
///
/// Returns `NotFound` if the note does not exist in this organization.
pub async fn update_visit_note(
    pool: &PgPool,
    organization_id: Uuid,
    note_id: Uuid,
    fields: NoteFields,
) -> ServiceResult<VisitNoteRow> {
    let result = sqlx::query(
        "UPDATE visit_notes n SET
            summary = COALESCE($3, n.summary),
            mood = COALESCE($4, n.mood),
            incidents = COALESCE($5, n.incidents),
            next_steps = COALESCE($6, n.next_steps),
            updated_at = now()
         FROM schedules s
         WHERE n.id = $1 AND s.id = n.schedule_id AND s.organization_id = $2",
    )
    .bind(note_id)
    .bind(organization_id)
    .bind(fields.summary)
    .bind(fields.mood)
    .bind(fields.incidents)
    .bind(fields.next_steps)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("visit note", note_id));
    }
    get_visit_note(pool, organization_id, note_id).await
}
