//! Person-to-organization memberships and their roles.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::organization::ensure_organization;
use super::person::ensure_person;
use super::{ServiceError, ServiceResult};
use crate::validate::text_enum;

text_enum! {
    pub enum MembershipRole {
        FamilyViewer => "family_viewer",
        FamilyEditor => "family_editor",
        Caregiver => "caregiver",
        Supervisor => "supervisor",
        AgencyAdmin => "agency_admin",
        SystemAdmin => "system_admin",
    }
}

text_enum! {
    pub enum MembershipStatus {
        Active => "active",
        Inactive => "inactive",
        Invited => "invited",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub person_id: Uuid,
    pub role: MembershipRole,
    pub title: Option<String>,
    pub status: MembershipStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChanges {
    pub role: Option<MembershipRole>,
    pub title: Option<String>,
    pub status: Option<MembershipStatus>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub person_id: Uuid,
    pub organization_id: Uuid,
    pub person_name: String,
    pub email: String,
    pub role: String,
    pub title: Option<String>,
    pub status: String,
    pub invited_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub invited_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT m.id, m.person_id, m.organization_id,
            COALESCE(p.display_name, concat_ws(' ', p.first_name, p.last_name)) AS person_name,
            p.email, m.role, m.title, m.status, m.invited_by_id, m.invited_at, m.created_at, m.updated_at
     FROM memberships m
     JOIN persons p ON p.id = m.person_id";

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_memberships(pool: &PgPool, organization_id: Uuid) -> ServiceResult<Vec<MembershipRow>> {
    let sql = format!("{SELECT_COLUMNS} WHERE m.organization_id = $1 ORDER BY m.created_at DESC");
    Ok(sqlx::query_as::<_, MembershipRow>(&sql)
        .bind(organization_id)
        .fetch_all(pool)
        .await?)
}

/// # Errors
///
/// Returns `NotFound` if the membership does not exist in this organization.
pub async fn get_membership(pool: &PgPool, organization_id: Uuid, membership_id: Uuid) -> ServiceResult<MembershipRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE m.id = $1 AND m.organization_id = $2");
    sqlx::query_as::<_, MembershipRow>(&sql)
        .bind(membership_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("membership", membership_id))
}

/// Add a person to the organization.
///
/// # Errors
///
/// Returns `NotFound` for an unknown person or organization and `Conflict`
/// if the person is already a member.
pub async fn create_membership(
    pool: &PgPool,
    organization_id: Uuid,
    invited_by: Uuid,
    new: NewMembership,
) -> ServiceResult<MembershipRow> {
    ensure_organization(pool, organization_id).await?;
    ensure_person(pool, new.person_id).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO memberships (id, person_id, organization_id, role, title, status, invited_by_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(new.person_id)
    .bind(organization_id)
    .bind(new.role.as_str())
    .bind(&new.title)
    .bind(new.status.as_str())
    .bind(invited_by)
    .execute(pool)
    .await?;

    info!(%id, person_id = %new.person_id, role = %new.role, "membership created");
    get_membership(pool, organization_id, id).await
}

/// # Errors
///
/// Returns `NotFound` if the membership does not exist in this organization.
pub async fn update_membership(
    pool: &PgPool,
    organization_id: Uuid,
    membership_id: Uuid,
    changes: MembershipChanges,
) -> ServiceResult<MembershipRow> {
    let result = sqlx::query(
        "UPDATE memberships SET
            role = COALESCE($3, role),
            title = COALESCE($4, title),
            status = COALESCE($5, status),
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(membership_id)
    .bind(organization_id)
    .bind(changes.role.map(MembershipRole::as_str))
    .bind(changes.title)
    .bind(changes.status.map(MembershipStatus::as_str))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("membership", membership_id));
    }
    get_membership(pool, organization_id, membership_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_cover_family_staff_and_admins() {
        let names: Vec<_> = MembershipRole::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            names,
            ["family_viewer", "family_editor", "caregiver", "supervisor", "agency_admin", "system_admin"]
        );
    }

    #[test]
    fn status_defaults_are_parseable() {
        assert_eq!(MembershipStatus::parse("status", "invited").unwrap(), MembershipStatus::Invited);
        assert!(MembershipStatus::parse("status", "archived").is_err());
    }
}
