//! Patient (care recipient) service.
//!
//! DESIGN
//! ======
//! Patients are tenant-scoped: every query filters on the caller's
//! organization, so a patient ID from another tenant reads as not found.
//! List rows carry two computed columns the dashboard renders directly:
//! `name` and `assigned_caregiver` (the active 24/7 caregiver, if any).

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::listing::{Page, PageWindow};
use super::profile::{Profile, ProfileChanges, display_name_sql};
use super::{ServiceError, ServiceResult};

/// Mobility and self-care answers from the intake form. Each is tri-state:
/// `null` means the question was not answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareRequirements {
    #[serde(default, alias = "bedRidden")]
    pub bed_ridden: Option<bool>,
    #[serde(default, alias = "canWalk")]
    pub can_walk: Option<bool>,
    #[serde(default)]
    pub wheelchair: Option<bool>,
    #[serde(default, alias = "canUseLavatory")]
    pub can_use_lavatory: Option<bool>,
    #[serde(default, alias = "canEat")]
    pub can_eat: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub profile: Profile,
    pub support_requested: Option<String>,
    pub work_type: Option<String>,
    pub requirements: CareRequirements,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientChanges {
    pub profile: ProfileChanges,
    pub support_requested: Option<String>,
    pub work_type: Option<String>,
    pub requirements: Option<CareRequirements>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PatientRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub languages: Vec<String>,
    pub support_requested: Option<String>,
    pub work_type: Option<String>,
    pub requirements: Json<CareRequirements>,
    pub assigned_caregiver: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn select_columns() -> String {
    format!(
        "SELECT p.id, p.organization_id, {name} AS name,
                p.first_name, p.middle_name, p.last_name, p.phone, p.email, p.address,
                p.date_of_birth, p.gender, p.height, p.weight, p.languages,
                p.support_requested, p.work_type, p.requirements,
                (SELECT concat_ws(' ', c.first_name, c.last_name)
                   FROM care_relationships r
                   JOIN caregivers c ON c.id = r.caregiver_id
                  WHERE r.patient_id = p.id AND r.is_24x7_caregiver AND r.status = 'active'
                  LIMIT 1) AS assigned_caregiver,
                p.created_at, p.updated_at
         FROM patients p",
        name = display_name_sql("p"),
    )
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, organization_id: Uuid, pattern: Option<&str>) {
    builder.push(" WHERE p.organization_id = ");
    builder.push_bind(organization_id);
    if let Some(pattern) = pattern {
        builder.push(" AND (");
        builder.push(display_name_sql("p"));
        builder.push(" ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR p.phone ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR p.email ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(")");
    }
}

/// List patients, newest first, optionally filtered by an `ILIKE` pattern.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_patients(
    pool: &PgPool,
    organization_id: Uuid,
    pattern: Option<&str>,
    window: PageWindow,
) -> ServiceResult<Page<PatientRow>> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM patients p");
    push_filters(&mut count, organization_id, pattern);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::new(select_columns());
    push_filters(&mut query, organization_id, pattern);
    query.push(" ORDER BY p.created_at DESC, p.id LIMIT ");
    query.push_bind(window.limit());
    query.push(" OFFSET ");
    query.push_bind(window.offset());
    let items = query
        .build_query_as::<PatientRow>()
        .fetch_all(pool)
        .await?;

    Ok(Page::new(items, total, window))
}

/// Fetch one patient within the organization.
///
/// # Errors
///
/// Returns `NotFound` if the patient does not exist in this organization.
pub async fn get_patient(pool: &PgPool, organization_id: Uuid, patient_id: Uuid) -> ServiceResult<PatientRow> {
    let sql = format!("{} WHERE p.id = $1 AND p.organization_id = $2", select_columns());
    sqlx::query_as::<_, PatientRow>(&sql)
        .bind(patient_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("patient", patient_id))
}

/// Register a patient.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_patient(pool: &PgPool, organization_id: Uuid, new: NewPatient) -> ServiceResult<PatientRow> {
    let id = Uuid::new_v4();
    let profile = new.profile;
    sqlx::query(
        "INSERT INTO patients (
            id, organization_id, first_name, middle_name, last_name, phone, email, address,
            date_of_birth, gender, height, weight, languages, support_requested, work_type, requirements
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(&profile.first_name)
    .bind(&profile.middle_name)
    .bind(&profile.last_name)
    .bind(&profile.phone)
    .bind(&profile.email)
    .bind(&profile.address)
    .bind(profile.date_of_birth)
    .bind(&profile.gender)
    .bind(profile.height)
    .bind(profile.weight)
    .bind(&profile.languages)
    .bind(&new.support_requested)
    .bind(&new.work_type)
    .bind(Json(new.requirements))
    .execute(pool)
    .await?;

    info!(%id, %organization_id, "registered patient");
    get_patient(pool, organization_id, id).await
}

/// Apply a partial update; absent fields keep their stored value.
///
/// # Errors
///
/// Returns `NotFound` if the patient does not exist in this organization.
pub async fn update_patient(
    pool: &PgPool,
    organization_id: Uuid,
    patient_id: Uuid,
    changes: PatientChanges,
) -> ServiceResult<PatientRow> {
    let profile = changes.profile;
    let result = sqlx::query(
        "UPDATE patients SET
            first_name = COALESCE($3, first_name),
            middle_name = COALESCE($4, middle_name),
            last_name = COALESCE($5, last_name),
            phone = COALESCE($6, phone),
            email = COALESCE($7, email),
            address = COALESCE($8, address),
            date_of_birth = COALESCE($9, date_of_birth),
            gender = COALESCE($10, gender),
            height = COALESCE($11, height),
            weight = COALESCE($12, weight),
            languages = COALESCE($13, languages),
            support_requested = COALESCE($14, support_requested),
            work_type = COALESCE($15, work_type),
            requirements = COALESCE($16, requirements),
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(patient_id)
    .bind(organization_id)
    .bind(profile.first_name)
    .bind(profile.middle_name)
    .bind(profile.last_name)
    .bind(profile.phone)
    .bind(profile.email)
    .bind(profile.address)
    .bind(profile.date_of_birth)
    .bind(profile.gender)
    .bind(profile.height)
    .bind(profile.weight)
    .bind(profile.languages)
    .bind(changes.support_requested)
    .bind(changes.work_type)
    .bind(changes.requirements.map(Json))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("patient", patient_id));
    }
    get_patient(pool, organization_id, patient_id).await
}

/// Delete a patient. Schedules, relationships, and tasks cascade.
///
/// # Errors
///
/// Returns `NotFound` if nothing was deleted.
pub async fn delete_patient(pool: &PgPool, organization_id: Uuid, patient_id: Uuid) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM patients WHERE id = $1 AND organization_id = $2")
        .bind(patient_id)
        .bind(organization_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("patient", patient_id));
    }
    info!(%patient_id, %organization_id, "deleted patient");
    Ok(())
}

/// Confirm a patient exists in the organization before linking to it.
///
/// # Errors
///
/// Returns `NotFound` if it does not.
pub async fn ensure_patient(pool: &PgPool, organization_id: Uuid, patient_id: Uuid) -> ServiceResult<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM patients WHERE id = $1 AND organization_id = $2)")
            .bind(patient_id)
            .bind(organization_id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(ServiceError::not_found("patient", patient_id));
    }
    Ok(())
}

/// Lock the patient row for the rest of the transaction.
///
/// Serializes writers that maintain per-patient invariants across rows.
///
/// # Errors
///
/// Returns `NotFound` if the patient does not exist in this organization.
pub async fn lock_patient(conn: &mut PgConnection, organization_id: Uuid, patient_id: Uuid) -> ServiceResult<()> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM patients WHERE id = $1 AND organization_id = $2 FOR UPDATE")
        .bind(patient_id)
        .bind(organization_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("patient", patient_id))?;
    Ok(())
}
