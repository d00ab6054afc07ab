//! Tenants: agencies and households.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::validate::text_enum;

text_enum! {
    pub enum OrganizationKind {
        Household => "household",
        Agency => "agency",
    }
}

/// Settings-page edits. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub kind: Option<OrganizationKind>,
    pub slug: Option<String>,
    pub timezone: Option<String>,
    pub primary_phone: Option<String>,
    pub primary_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrganizationRow {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub slug: Option<String>,
    pub timezone: String,
    pub primary_phone: Option<String>,
    pub primary_email: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT id, name, kind, slug, timezone, primary_phone, primary_email, status,
            created_at, updated_at
     FROM organizations";

/// Lowercase, hyphen-separated slug. Runs of other characters collapse to
/// one hyphen; leading and trailing hyphens are dropped.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_organizations(pool: &PgPool) -> ServiceResult<Vec<OrganizationRow>> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id");
    Ok(sqlx::query_as::<_, OrganizationRow>(&sql).fetch_all(pool).await?)
}

/// # Errors
///
/// Returns `NotFound` if the organization does not exist.
pub async fn get_organization(pool: &PgPool, organization_id: Uuid) -> ServiceResult<OrganizationRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    sqlx::query_as::<_, OrganizationRow>(&sql)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("organization", organization_id))
}

/// # Errors
///
/// Returns `NotFound` for an unknown organization and `Conflict` when the
/// slug is taken.
pub async fn update_organization(
    pool: &PgPool,
    organization_id: Uuid,
    changes: OrganizationChanges,
) -> ServiceResult<OrganizationRow> {
    let result = sqlx::query(
        "UPDATE organizations SET
            name = COALESCE($2, name),
            kind = COALESCE($3, kind),
            slug = COALESCE($4, slug),
            timezone = COALESCE($5, timezone),
            primary_phone = COALESCE($6, primary_phone),
            primary_email = COALESCE($7, primary_email),
            updated_at = now()
         WHERE id = $1",
    )
    .bind(organization_id)
    .bind(changes.name)
    .bind(changes.kind.map(OrganizationKind::as_str))
    .bind(changes.slug)
    .bind(changes.timezone)
    .bind(changes.primary_phone)
    .bind(changes.primary_email)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("organization", organization_id));
    }
    info!(%organization_id, "organization settings updated");
    get_organization(pool, organization_id).await
}

/// # Errors
///
/// Returns `NotFound` if the organization does not exist.
pub async fn ensure_organization(pool: &PgPool, organization_id: Uuid) -> ServiceResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations WHERE id = $1)")
        .bind(organization_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ServiceError::not_found("organization", organization_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Sunrise Home Care, LLC "), "sunrise-home-care-llc");
        assert_eq!(slugify("--Acme__Agency--"), "acme-agency");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn kind_serializes_as_type() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let row = OrganizationRow {
            id: Uuid::nil(),
            name: "Default Organization".into(),
            kind: "agency".into(),
            slug: Some("default".into()),
            timezone: "UTC".into(),
            primary_phone: None,
            primary_email: None,
            status: "active".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "agency");
        assert!(json.get("kind").is_none());
    }
}
