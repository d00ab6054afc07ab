//! People who use the dashboard: staff, caregivers, and family members.
//!
//! DESIGN
//! ======
//! Creating a person is an invite. A random token is generated, only its
//! SHA-256 digest is stored, and the raw token is returned exactly once to
//! the caller. Accepting the invite looks the digest up, activates the
//! person, and clears the digest so the token cannot be replayed.

use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::listing::{Page, PageWindow};
use super::profile::display_name;
use super::{ServiceError, ServiceResult};
use crate::validate::text_enum;

text_enum! {
    pub enum PersonStatus {
        Active => "active",
        Suspended => "suspended",
        Invited => "invited",
        Archived => "archived",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<PersonStatus>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PersonRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub invited_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A freshly invited person plus the one-time raw token.
#[derive(Debug, Clone, Serialize)]
pub struct InvitedPerson {
    #[serde(flatten)]
    pub person: PersonRow,
    pub invite_token: String,
}

/// Random hex token of `bytes` bytes of entropy.
#[must_use]
pub fn generate_invite_token(bytes: usize) -> String {
    let mut buf = vec![0_u8; bytes];
    rand::rng().fill(buf.as_mut_slice());
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

#[must_use]
pub fn hash_invite_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

const SELECT_COLUMNS: &str = "SELECT id, email, first_name, last_name, display_name, phone, status, invited_at,
            created_at, updated_at
     FROM persons";

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, pattern: Option<&str>) {
    builder.push(" WHERE TRUE");
    if let Some(pattern) = pattern {
        builder.push(" AND (concat_ws(' ', first_name, last_name) ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR display_name ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(")");
    }
}

/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_persons(pool: &PgPool, pattern: Option<&str>, window: PageWindow) -> ServiceResult<Page<PersonRow>> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM persons");
    push_filters(&mut count, pattern);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::new(SELECT_COLUMNS);
    push_filters(&mut query, pattern);
    query.push(" ORDER BY created_at DESC, id LIMIT ");
    query.push_bind(window.limit());
    query.push(" OFFSET ");
    query.push_bind(window.offset());
    let items = query.build_query_as::<PersonRow>().fetch_all(pool).await?;

    Ok(Page::new(items, total, window))
}

/// # Errors
///
/// Returns `NotFound` if the person does not exist.
pub async fn get_person(pool: &PgPool, person_id: Uuid) -> ServiceResult<PersonRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    sqlx::query_as::<_, PersonRow>(&sql)
        .bind(person_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("person", person_id))
}

/// Create an invited person and hand back the raw invite token.
///
/// # Errors
///
/// Returns `Conflict` when the email is already registered.
pub async fn invite_person(pool: &PgPool, new: NewPerson, token_bytes: usize) -> ServiceResult<InvitedPerson> {
    let id = Uuid::new_v4();
    let token = generate_invite_token(token_bytes);
    let shown_name = new
        .display_name
        .clone()
        .unwrap_or_else(|| display_name(&new.first_name, None, &new.last_name));

    sqlx::query(
        "INSERT INTO persons (id, email, first_name, last_name, display_name, phone, status, invite_token_hash, invited_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())",
    )
    .bind(id)
    .bind(&new.email)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&shown_name)
    .bind(&new.phone)
    .bind(PersonStatus::Invited.as_str())
    .bind(hash_invite_token(&token))
    .execute(pool)
    .await?;

    info!(%id, email = %new.email, "person invited");
    let person = get_person(pool, id).await?;
    Ok(InvitedPerson { person, invite_token: token })
}

/// Redeem an invite token.
///
/// # Errors
///
/// Returns `InviteNotFound` if no pending invite matches the token.
pub async fn accept_invite(pool: &PgPool, token: &str) -> ServiceResult<PersonRow> {
    let person_id: Option<Uuid> = sqlx::query_scalar(
        "UPDATE persons SET status = $2, invite_token_hash = NULL, updated_at = now()
         WHERE invite_token_hash = $1 AND status = $3
         RETURNING id",
    )
    .bind(hash_invite_token(token))
    .bind(PersonStatus::Active.as_str())
    .bind(PersonStatus::Invited.as_str())
    .fetch_optional(pool)
    .await?;

    let Some(person_id) = person_id else {
        return Err(ServiceError::InviteNotFound);
    };
    info!(%person_id, "invite accepted");
    get_person(pool, person_id).await
}

/// # Errors
///
/// Returns `NotFound` if the person does not exist.
pub async fn update_person(pool: &PgPool, person_id: Uuid, changes: PersonChanges) -> ServiceResult<PersonRow> {
    let result = sqlx::query(
        "UPDATE persons SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            display_name = COALESCE($4, display_name),
            phone = COALESCE($5, phone),
            status = COALESCE($6, status),
            updated_at = now()
         WHERE id = $1",
    )
    .bind(person_id)
    .bind(changes.first_name)
    .bind(changes.last_name)
    .bind(changes.display_name)
    .bind(changes.phone)
    .bind(changes.status.map(PersonStatus::as_str))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("person", person_id));
    }
    get_person(pool, person_id).await
}

/// # Errors
///
/// Returns `NotFound` if the person does not exist.
pub async fn ensure_person(pool: &PgPool, person_id: Uuid) -> ServiceResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM persons WHERE id = $1)")
        .bind(person_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ServiceError::not_found("person", person_id));
    }
    Ok(())
}

#[cfg(test)]
#[path = "person_test.rs"]
mod tests;
