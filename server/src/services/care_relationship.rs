//! Patient-caregiver relationships.
//!
//! DESIGN
//! ======
//! A patient has at most one active 24/7 caregiver per organization. Marking
//! a relationship as 24/7 first clears the flag on the patient's other active
//! relationships, inside the same transaction as the write. The partial
//! unique index `care_relationships_single_24x7_idx` backs this up: if two
//! writers still collide, the loser gets a conflict.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::caregiver::ensure_caregiver;
use super::patient::ensure_patient;
use super::{ServiceError, ServiceResult};
use crate::validate::{date_range, text_enum};

text_enum! {
    pub enum RelationshipRole {
        PrimaryContact => "primary_contact",
        BackupContact => "backup_contact",
        FamilyViewer => "family_viewer",
        Nurse => "nurse",
        Aide => "aide",
        Companion => "companion",
        Other => "other",
    }
}

text_enum! {
    pub enum RelationshipStatus {
        Active => "active",
        Inactive => "inactive",
        Ended => "ended",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCareRelationship {
    pub patient_id: Uuid,
    pub caregiver_id: Uuid,
    pub role: RelationshipRole,
    pub is_24x7_caregiver: bool,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub notes: Option<String>,
    pub status: RelationshipStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CareRelationshipChanges {
    pub role: Option<RelationshipRole>,
    pub is_24x7_caregiver: Option<bool>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub notes: Option<String>,
    pub status: Option<RelationshipStatus>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CareRelationshipRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub patient_id: Uuid,
    pub caregiver_id: Uuid,
    pub caregiver_name: String,
    pub role: String,
    pub is_24x7_caregiver: bool,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub notes: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT r.id, r.organization_id, r.patient_id, r.caregiver_id,
            concat_ws(' ', c.first_name, c.last_name) AS caregiver_name,
            r.role, r.is_24x7_caregiver, r.start_date, r.end_date, r.notes, r.status,
            r.created_at, r.updated_at
     FROM care_relationships r
     JOIN caregivers c ON c.id = r.caregiver_id";

/// Whether a relationship in this state holds the patient's 24/7 slot.
#[must_use]
pub fn holds_24x7_slot(is_24x7_caregiver: bool, status: RelationshipStatus) -> bool {
    is_24x7_caregiver && status == RelationshipStatus::Active
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_care_relationships(
    pool: &PgPool,
    organization_id: Uuid,
    patient_id: Option<Uuid>,
) -> ServiceResult<Vec<CareRelationshipRow>> {
    let sql = format!(
        "{SELECT_COLUMNS} WHERE r.organization_id = $1 AND ($2::uuid IS NULL OR r.patient_id = $2)
         ORDER BY r.created_at DESC"
    );
    Ok(sqlx::query_as::<_, CareRelationshipRow>(&sql)
        .bind(organization_id)
        .bind(patient_id)
        .fetch_all(pool)
        .await?)
}

/// # Errors
///
/// Returns `NotFound` if the relationship does not exist in this organization.
pub async fn get_care_relationship(
    pool: &PgPool,
    organization_id: Uuid,
    relationship_id: Uuid,
) -> ServiceResult<CareRelationshipRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE r.id = $1 AND r.organization_id = $2");
    sqlx::query_as::<_, CareRelationshipRow>(&sql)
        .bind(relationship_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("care relationship", relationship_id))
}

/// # Errors
///
/// Returns `NotFound` if the relationship does not exist in this organization.
pub async fn care_relationship_patient(
    pool: &PgPool,
    organization_id: Uuid,
    relationship_id: Uuid,
) -> ServiceResult<Uuid> {
    sqlx::query_scalar("SELECT patient_id FROM care_relationships WHERE id = $1 AND organization_id = $2")
        .bind(relationship_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("care relationship", relationship_id))
}

/// Release the patient's 24/7 slot from every active relationship except `keep`.
async fn clear_other_24x7(
    conn: &mut PgConnection,
    organization_id: Uuid,
    patient_id: Uuid,
    keep: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE care_relationships SET is_24x7_caregiver = FALSE, updated_at = now()
         WHERE patient_id = $1 AND organization_id = $2 AND id <> $3
           AND is_24x7_caregiver AND status = 'active'",
    )
    .bind(patient_id)
    .bind(organization_id)
    .bind(keep)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// # Errors
///
/// Returns a validation error for a reversed date range and `NotFound` for an
/// unknown patient or caregiver.
pub async fn create_care_relationship(
    pool: &PgPool,
    organization_id: Uuid,
    new: NewCareRelationship,
) -> ServiceResult<CareRelationshipRow> {
    date_range("start_date", new.start_date, "end_date", new.end_date)?;
    ensure_patient(pool, organization_id, new.patient_id).await?;
    ensure_caregiver(pool, organization_id, new.caregiver_id).await?;

    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    if holds_24x7_slot(new.is_24x7_caregiver, new.status) {
        let cleared = clear_other_24x7(&mut tx, organization_id, new.patient_id, id).await?;
        if cleared > 0 {
            info!(patient_id = %new.patient_id, cleared, "released previous 24/7 caregiver");
        }
    }
    sqlx::query(
        "INSERT INTO care_relationships (
            id, organization_id, patient_id, caregiver_id, role, is_24x7_caregiver,
            start_date, end_date, notes, status
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(new.patient_id)
    .bind(new.caregiver_id)
    .bind(new.role.as_str())
    .bind(new.is_24x7_caregiver)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(&new.notes)
    .bind(new.status.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(%id, patient_id = %new.patient_id, caregiver_id = %new.caregiver_id, "care relationship created");
    get_care_relationship(pool, organization_id, id).await
}

/// Merge `changes` onto the stored relationship.
///
/// # Errors
///
/// Returns a validation error if the merged date range is reversed and
/// `NotFound` for an unknown relationship.
pub async fn update_care_relationship(
    pool: &PgPool,
    organization_id: Uuid,
    relationship_id: Uuid,
    changes: CareRelationshipChanges,
) -> ServiceResult<CareRelationshipRow> {
    let current = get_care_relationship(pool, organization_id, relationship_id).await?;
    let start_date = changes.start_date.or(current.start_date);
    let end_date = changes.end_date.or(current.end_date);
    date_range("start_date", start_date, "end_date", end_date)?;

    let is_24x7 = changes.is_24x7_caregiver.unwrap_or(current.is_24x7_caregiver);
    let status = match changes.status {
        Some(status) => status,
        None => RelationshipStatus::parse("status", &current.status)?,
    };

    let mut tx = pool.begin().await?;
    if holds_24x7_slot(is_24x7, status) {
        clear_other_24x7(&mut tx, organization_id, current.patient_id, relationship_id).await?;
    }
    sqlx::query(
        "UPDATE care_relationships SET
            role = COALESCE($3, role),
            is_24x7_caregiver = $4,
            start_date = $5,
            end_date = $6,
            notes = COALESCE($7, notes),
            status = $8,
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(relationship_id)
    .bind(organization_id)
    .bind(changes.role.map(RelationshipRole::as_str))
    .bind(is_24x7)
    .bind(start_date)
    .bind(end_date)
    .bind(changes.notes)
    .bind(status.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    get_care_relationship(pool, organization_id, relationship_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_24x7_relationships_hold_the_slot() {
        assert!(holds_24x7_slot(true, RelationshipStatus::Active));
        assert!(!holds_24x7_slot(true, RelationshipStatus::Ended));
        assert!(!holds_24x7_slot(true, RelationshipStatus::Inactive));
        assert!(!holds_24x7_slot(false, RelationshipStatus::Active));
    }

    #[test]
    fn roles_use_snake_case_wire_names() {
        assert_eq!(RelationshipRole::parse("role", "primary_contact").unwrap(), RelationshipRole::PrimaryContact);
        assert_eq!(RelationshipRole::FamilyViewer.as_str(), "family_viewer");
        assert!(RelationshipRole::parse("role", "PrimaryContact").is_err());
    }

    #[cfg(feature = "live-db-tests")]
    mod live {
        use super::*;
        use crate::services::caregiver::{Credentials, NewCaregiver, create_caregiver};
        use crate::services::patient::{CareRequirements, NewPatient, create_patient};
        use crate::services::profile::Profile;
        use crate::state::test_helpers::live_app_state;

        fn profile(first: &str) -> Profile {
            Profile {
                first_name: first.into(),
                middle_name: None,
                last_name: "Live".into(),
                phone: "9876543210".into(),
                email: None,
                address: None,
                date_of_birth: None,
                gender: None,
                height: None,
                weight: None,
                languages: Vec::new(),
            }
        }

        #[tokio::test]
        async fn new_24x7_caregiver_replaces_previous() {
            let state = live_app_state().await;
            let org = Uuid::nil();
            let patient = create_patient(
                &state.pool,
                org,
                NewPatient {
                    profile: profile("Pat"),
                    support_requested: None,
                    work_type: None,
                    requirements: CareRequirements::default(),
                },
            )
            .await
            .unwrap();
            let mut relationships = Vec::new();
            for first in ["Ana", "Ben"] {
                let cg = create_caregiver(
                    &state.pool,
                    org,
                    NewCaregiver { profile: profile(first), credentials: Credentials::default() },
                )
                .await
                .unwrap();
                let rel = create_care_relationship(
                    &state.pool,
                    org,
                    NewCareRelationship {
                        patient_id: patient.id,
                        caregiver_id: cg.id,
                        role: RelationshipRole::Aide,
                        is_24x7_caregiver: true,
                        start_date: None,
                        end_date: None,
                        notes: None,
                        status: RelationshipStatus::Active,
                    },
                )
                .await
                .unwrap();
                relationships.push(rel.id);
            }

            let first = get_care_relationship(&state.pool, org, relationships[0]).await.unwrap();
            let second = get_care_relationship(&state.pool, org, relationships[1]).await.unwrap();
            assert!(!first.is_24x7_caregiver);
            assert!(second.is_24x7_caregiver);
        }
    }
}
