//! Conversation threads and messages.
//!
//! DESIGN
//! ======
//! Access is by participation: a conversation the caller is not part of is
//! reported as not found rather than forbidden, so thread IDs do not leak.
//! The creator always joins as `owner`; everyone else joins as `member`.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::patient::ensure_patient;
use super::{ServiceError, ServiceResult};
use crate::validate::{ValidationError, Validated, text_enum};

pub const BODY_MAX: usize = 5000;
pub const PREVIEW_CHARS: i32 = 140;

text_enum! {
    pub enum ConversationKind {
        Direct => "direct",
        CareCircle => "care_circle",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub title: Option<String>,
    pub kind: ConversationKind,
    pub patient_id: Option<Uuid>,
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConversationRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub title: Option<String>,
    pub kind: String,
    pub participant_ids: Vec<Uuid>,
    pub last_message: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    pub message_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Participants other than the creator, deduplicated in first-seen order.
///
/// # Errors
///
/// Returns a validation error when nobody besides the creator remains.
pub fn other_participants(creator: Uuid, requested: &[Uuid]) -> Validated<Vec<Uuid>> {
    let mut others: Vec<Uuid> = Vec::with_capacity(requested.len());
    for id in requested {
        if *id != creator && !others.contains(id) {
            others.push(*id);
        }
    }
    if others.is_empty() {
        return Err(ValidationError::Rule(
            "conversation needs at least one participant besides the creator".into(),
        ));
    }
    Ok(others)
}

fn conversation_select() -> String {
    format!(
        "SELECT c.id, c.organization_id, c.patient_id, c.title, c.kind,
                ARRAY(SELECT cp.person_id FROM conversation_participants cp
                       WHERE cp.conversation_id = c.id ORDER BY cp.joined_at, cp.person_id) AS participant_ids,
                (SELECT left(m.body, {PREVIEW_CHARS}) FROM messages m
                  WHERE m.conversation_id = c.id ORDER BY m.created_at DESC LIMIT 1) AS last_message,
                (SELECT max(m.created_at) FROM messages m WHERE m.conversation_id = c.id) AS last_message_at,
                (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS message_count,
                c.created_at, c.updated_at
         FROM conversations c
         JOIN conversation_participants me ON me.conversation_id = c.id"
    )
}

/// Threads `person_id` takes part in, most recently active first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_conversations(
    pool: &PgPool,
    organization_id: Uuid,
    person_id: Uuid,
) -> ServiceResult<Vec<ConversationRow>> {
    let sql = format!(
        "{} WHERE c.organization_id = $1 AND me.person_id = $2
         ORDER BY COALESCE(
             (SELECT max(m.created_at) FROM messages m WHERE m.conversation_id = c.id),
             c.created_at
         ) DESC",
        conversation_select()
    );
    Ok(sqlx::query_as::<_, ConversationRow>(&sql)
        .bind(organization_id)
        .bind(person_id)
        .fetch_all(pool)
        .await?)
}

/// # Errors
///
/// Returns `NotFound` when the conversation does not exist or `person_id` is
/// not a participant.
pub async fn get_conversation(
    pool: &PgPool,
    organization_id: Uuid,
    conversation_id: Uuid,
    person_id: Uuid,
) -> ServiceResult<ConversationRow> {
    let sql = format!(
        "{} WHERE c.id = $1 AND c.organization_id = $2 AND me.person_id = $3",
        conversation_select()
    );
    sqlx::query_as::<_, ConversationRow>(&sql)
        .bind(conversation_id)
        .bind(organization_id)
        .bind(person_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("conversation", conversation_id))
}

/// Open a thread. The creator joins as owner.
///
/// # Errors
///
/// Returns a validation error without other participants and `NotFound` for
/// an unknown patient.
pub async fn create_conversation(
    pool: &PgPool,
    organization_id: Uuid,
    creator: Uuid,
    new: NewConversation,
) -> ServiceResult<ConversationRow> {
    let others = other_participants(creator, &new.participant_ids)?;
    if let Some(patient_id) = new.patient_id {
        ensure_patient(pool, organization_id, patient_id).await?;
    }

    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO conversations (id, organization_id, patient_id, title, kind) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(organization_id)
        .bind(new.patient_id)
        .bind(&new.title)
        .bind(new.kind.as_str())
        .execute(&mut *tx)
        .await?;

    let members = std::iter::once((creator, "owner")).chain(others.iter().map(|p| (*p, "member")));
    for (person_id, role) in members {
        sqlx::query(
            "INSERT INTO conversation_participants (id, conversation_id, person_id, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(person_id)
        .bind(role)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(%id, %creator, participants = others.len() + 1, kind = %new.kind, "conversation opened");
    get_conversation(pool, organization_id, id, creator).await
}

/// Messages in a thread, oldest first.
///
/// # Errors
///
/// Returns `NotFound` when `person_id` cannot see the conversation.
pub async fn list_messages(
    pool: &PgPool,
    organization_id: Uuid,
    conversation_id: Uuid,
    person_id: Uuid,
) -> ServiceResult<Vec<MessageRow>> {
    ensure_participant(pool, organization_id, conversation_id, person_id).await?;
    Ok(sqlx::query_as::<_, MessageRow>(
        "SELECT id, conversation_id, sender_id, body, status, created_at
         FROM messages WHERE conversation_id = $1
         ORDER BY created_at ASC, id",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?)
}

/// Post a message as `sender_id`.
///
/// # Errors
///
/// Returns `NotFound` when the sender is not a participant.
pub async fn post_message(
    pool: &PgPool,
    organization_id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    body: String,
) -> ServiceResult<MessageRow> {
    ensure_participant(pool, organization_id, conversation_id, sender_id).await?;

    let mut tx = pool.begin().await?;
    let message = sqlx::query_as::<_, MessageRow>(
        "INSERT INTO messages (id, conversation_id, sender_id, body)
         VALUES ($1, $2, $3, $4)
         RETURNING id, conversation_id, sender_id, body, status, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(sender_id)
    .bind(body)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(message_id = %message.id, %conversation_id, %sender_id, "message posted");
    Ok(message)
}

async fn ensure_participant(
    pool: &PgPool,
    organization_id: Uuid,
    conversation_id: Uuid,
    person_id: Uuid,
) -> ServiceResult<()> {
    let visible: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM conversations c
            JOIN conversation_participants cp ON cp.conversation_id = c.id
            WHERE c.id = $1 AND c.organization_id = $2 AND cp.person_id = $3
         )",
    )
    .bind(conversation_id)
    .bind(organization_id)
    .bind(person_id)
    .fetch_one(pool)
    .await?;
    if !visible {
        return Err(ServiceError::not_found("conversation", conversation_id));
    }
    Ok(())
}
