//! Care arrangements: how care is delivered for a patient over time.
//!
//! Arrangements form a timeline. Creating one closes every open-ended
//! arrangement for the patient at the new `effective_from`, in the same
//! transaction, so at most one arrangement is open at a time. The patient row
//! is locked first so concurrent creates queue behind each other, and
//! `care_arrangements_single_open_idx` backs the invariant in the schema.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::patient::lock_patient;
use super::{ServiceError, ServiceResult};
use crate::validate::{date_range, text_enum};

text_enum! {
    pub enum CareMode {
        VisitsOnly => "visits_only",
        Caregiver24x7Only => "caregiver_24x7_only",
        Caregiver24x7PlusVisits => "caregiver_24x7_plus_visits",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCareArrangement {
    pub patient_id: Uuid,
    pub mode: CareMode,
    pub effective_from: Date,
    pub effective_to: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CareArrangementChanges {
    pub mode: Option<CareMode>,
    pub effective_from: Option<Date>,
    pub effective_to: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CareArrangementRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub patient_id: Uuid,
    pub mode: String,
    pub effective_from: Date,
    pub effective_to: Option<Date>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT id, organization_id, patient_id, mode, effective_from, effective_to, notes,
            created_at, updated_at
     FROM care_arrangements";

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_care_arrangements(
    pool: &PgPool,
    organization_id: Uuid,
    patient_id: Option<Uuid>,
) -> ServiceResult<Vec<CareArrangementRow>> {
    let sql = format!(
        "{SELECT_COLUMNS} WHERE organization_id = $1 AND ($2::uuid IS NULL OR patient_id = $2)
         ORDER BY effective_from DESC, created_at DESC"
    );
    Ok(sqlx::query_as::<_, CareArrangementRow>(&sql)
        .bind(organization_id)
        .bind(patient_id)
        .fetch_all(pool)
        .await?)
}

/// # Errors
///
/// Returns `NotFound` if the arrangement does not exist in this organization.
pub async fn get_care_arrangement(
    pool: &PgPool,
    organization_id: Uuid,
    arrangement_id: Uuid,
) -> ServiceResult<CareArrangementRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1 AND organization_id = $2");
    sqlx::query_as::<_, CareArrangementRow>(&sql)
        .bind(arrangement_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("care arrangement", arrangement_id))
}

/// Close every open-ended arrangement for the patient at `closing_date`.
async fn close_open_arrangements(
    conn: &mut PgConnection,
    organization_id: Uuid,
    patient_id: Uuid,
    closing_date: Date,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE care_arrangements SET effective_to = GREATEST($3, effective_from), updated_at = now()
         WHERE patient_id = $1 AND organization_id = $2 AND effective_to IS NULL",
    )
    .bind(patient_id)
    .bind(organization_id)
    .bind(closing_date)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// # Errors
///
/// Returns a validation error for a reversed range and `NotFound` for an
/// unknown patient.
pub async fn create_care_arrangement(
    pool: &PgPool,
    organization_id: Uuid,
    new: NewCareArrangement,
) -> ServiceResult<CareArrangementRow> {
    date_range("effective_from", Some(new.effective_from), "effective_to", new.effective_to)?;

    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    lock_patient(&mut tx, organization_id, new.patient_id).await?;
    let closed = close_open_arrangements(&mut tx, organization_id, new.patient_id, new.effective_from).await?;
    sqlx::query(
        "INSERT INTO care_arrangements (id, organization_id, patient_id, mode, effective_from, effective_to, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(new.patient_id)
    .bind(new.mode.as_str())
    .bind(new.effective_from)
    .bind(new.effective_to)
    .bind(&new.notes)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(%id, patient_id = %new.patient_id, mode = %new.mode, closed, "care arrangement created");
    get_care_arrangement(pool, organization_id, id).await
}

/// Merge `changes` onto the stored arrangement.
///
/// # Errors
///
/// Returns a validation error if the merged range is reversed and `NotFound`
/// for an unknown arrangement.
pub async fn update_care_arrangement(
    pool: &PgPool,
    organization_id: Uuid,
    arrangement_id: Uuid,
    changes: CareArrangementChanges,
) -> ServiceResult<CareArrangementRow> {
    let current = get_care_arrangement(pool, organization_id, arrangement_id).await?;
    let effective_from = changes.effective_from.unwrap_or(current.effective_from);
    let effective_to = changes.effective_to.or(current.effective_to);
    date_range("effective_from", Some(effective_from), "effective_to", effective_to)?;

    sqlx::query(
        "UPDATE care_arrangements SET
            mode = COALESCE($3, mode),
            effective_from = $4,
            effective_to = $5,
            notes = COALESCE($6, notes),
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(arrangement_id)
    .bind(organization_id)
    .bind(changes.mode.map(CareMode::as_str))
    .bind(effective_from)
    .bind(effective_to)
    .bind(changes.notes)
    .execute(pool)
    .await?;

    get_care_arrangement(pool, organization_id, arrangement_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_round_trip_wire_names() {
        for mode in CareMode::ALL {
            assert_eq!(CareMode::parse("mode", mode.as_str()).unwrap(), *mode);
        }
        assert_eq!(CareMode::Caregiver24x7PlusVisits.as_str(), "caregiver_24x7_plus_visits");
    }

    #[test]
    fn unknown_mode_lists_choices() {
        let err = CareMode::parse("mode", "hospice").unwrap_err();
        assert_eq!(
            err.to_string(),
            "mode must be one of: visits_only, caregiver_24x7_only, caregiver_24x7_plus_visits"
        );
    }

    #[cfg(feature = "live-db-tests")]
    mod live {
        use super::*;
        use crate::services::patient::{CareRequirements, NewPatient, create_patient};
        use crate::services::profile::Profile;
        use crate::state::test_helpers::live_app_state;
        use time::macros::date;

        async fn live_patient(pool: &PgPool, org: Uuid) -> Uuid {
            let profile = Profile {
                first_name: "Arr".into(),
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
            };
            let new = NewPatient {
                profile,
                support_requested: None,
                work_type: None,
                requirements: CareRequirements::default(),
            };
            create_patient(pool, org, new).await.unwrap().id
        }

        fn open_from(patient_id: Uuid, mode: CareMode, effective_from: Date) -> NewCareArrangement {
            NewCareArrangement { patient_id, mode, effective_from, effective_to: None, notes: None }
        }

        async fn open_count(pool: &PgPool, patient_id: Uuid) -> i64 {
            sqlx::query_scalar("SELECT COUNT(*) FROM care_arrangements WHERE patient_id = $1 AND effective_to IS NULL")
                .bind(patient_id)
                .fetch_one(pool)
                .await
                .unwrap()
        }

        #[tokio::test]
        async fn new_arrangement_closes_open_one() {
            let state = live_app_state().await;
            let org = Uuid::nil();
            let patient = live_patient(&state.pool, org).await;

            let first = create_care_arrangement(
                &state.pool,
                org,
                open_from(patient, CareMode::VisitsOnly, date!(2025 - 03 - 01)),
            )
            .await
            .unwrap();
            let second = create_care_arrangement(
                &state.pool,
                org,
                open_from(patient, CareMode::Caregiver24x7Only, date!(2025 - 04 - 01)),
            )
            .await
            .unwrap();

            let first = get_care_arrangement(&state.pool, org, first.id).await.unwrap();
            assert_eq!(first.effective_to, Some(date!(2025 - 04 - 01)));
            assert_eq!(second.effective_to, None);
            assert_eq!(open_count(&state.pool, patient).await, 1);
        }

        #[tokio::test]
        async fn backdated_arrangement_clamps_closing_date() {
            let state = live_app_state().await;
            let org = Uuid::nil();
            let patient = live_patient(&state.pool, org).await;

            let first = create_care_arrangement(
                &state.pool,
                org,
                open_from(patient, CareMode::VisitsOnly, date!(2025 - 06 - 01)),
            )
            .await
            .unwrap();
            create_care_arrangement(
                &state.pool,
                org,
                open_from(patient, CareMode::Caregiver24x7PlusVisits, date!(2025 - 05 - 01)),
            )
            .await
            .unwrap();

            let first = get_care_arrangement(&state.pool, org, first.id).await.unwrap();
            assert_eq!(first.effective_to, Some(date!(2025 - 06 - 01)));
        }

        #[tokio::test]
        async fn second_open_row_violates_index() {
            let state = live_app_state().await;
            let org = Uuid::nil();
            let patient = live_patient(&state.pool, org).await;
            create_care_arrangement(&state.pool, org, open_from(patient, CareMode::VisitsOnly, date!(2025 - 01 - 01)))
                .await
                .unwrap();

            let err: ServiceError = sqlx::query(
                "INSERT INTO care_arrangements (id, organization_id, patient_id, mode, effective_from)
                 VALUES ($1, $2, $3, 'visits_only', '2025-02-01')",
            )
            .bind(Uuid::new_v4())
            .bind(org)
            .bind(patient)
            .execute(&state.pool)
            .await
            .unwrap_err()
            .into();
            assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("open-ended")));
        }

        #[tokio::test]
        async fn concurrent_creates_leave_one_open() {
            let state = live_app_state().await;
            let org = Uuid::nil();
            let patient = live_patient(&state.pool, org).await;

            let (a, b) = tokio::join!(
                create_care_arrangement(
                    &state.pool,
                    org,
                    open_from(patient, CareMode::VisitsOnly, date!(2025 - 03 - 01)),
                ),
                create_care_arrangement(
                    &state.pool,
                    org,
                    open_from(patient, CareMode::Caregiver24x7Only, date!(2025 - 04 - 01)),
                ),
            );
            a.unwrap();
            b.unwrap();
            assert_eq!(open_count(&state.pool, patient).await, 1);
        }
    }
}
