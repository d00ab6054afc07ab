//! Caregiver (care provider) service.

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::listing::{Page, PageWindow};
use super::profile::{Profile, ProfileChanges, display_name_sql};
use super::{ServiceError, ServiceResult};

/// Onboarding paperwork and payout details collected at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub address_proof: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub prior_experience: Option<String>,
    pub qualification: Option<String>,
    pub qualification_proof: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCaregiver {
    pub profile: Profile,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaregiverChanges {
    pub profile: ProfileChanges,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CaregiverRow {
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
    pub address_proof: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub prior_experience: Option<String>,
    pub qualification: Option<String>,
    pub qualification_proof: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn select_columns() -> String {
    format!(
        "SELECT c.id, c.organization_id, {name} AS name,
                c.first_name, c.middle_name, c.last_name, c.phone, c.email, c.address,
                c.date_of_birth, c.gender, c.height, c.weight, c.languages,
                c.address_proof, c.bank_name, c.account_number, c.ifsc_code,
                c.prior_experience, c.qualification, c.qualification_proof,
                c.created_at, c.updated_at
         FROM caregivers c",
        name = display_name_sql("c"),
    )
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, organization_id: Uuid, pattern: Option<&str>) {
    builder.push(" WHERE c.organization_id = ");
    builder.push_bind(organization_id);
    if let Some(pattern) = pattern {
        builder.push(" AND (");
        builder.push(display_name_sql("c"));
        builder.push(" ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR c.phone ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR c.email ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR array_to_string(c.languages, ' ') ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(")");
    }
}

/// List caregivers, newest first.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_caregivers(
    pool: &PgPool,
    organization_id: Uuid,
    pattern: Option<&str>,
    window: PageWindow,
) -> ServiceResult<Page<CaregiverRow>> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM caregivers c");
    push_filters(&mut count, organization_id, pattern);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::new(select_columns());
    push_filters(&mut query, organization_id, pattern);
    query.push(" ORDER BY c.created_at DESC, c.id LIMIT ");
    query.push_bind(window.limit());
    query.push(" OFFSET ");
    query.push_bind(window.offset());
    let items = query
        .build_query_as::<CaregiverRow>()
        .fetch_all(pool)
        .await?;

    Ok(Page::new(items, total, window))
}

/// Fetch one caregiver within the organization.
///
/// # Errors
///
/// Returns `NotFound` if the caregiver does not exist in this organization.
pub async fn get_caregiver(pool: &PgPool, organization_id: Uuid, caregiver_id: Uuid) -> ServiceResult<CaregiverRow> {
    let sql = format!("{} WHERE c.id = $1 AND c.organization_id = $2", select_columns());
    sqlx::query_as::<_, CaregiverRow>(&sql)
        .bind(caregiver_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("caregiver", caregiver_id))
}

/// Register a caregiver.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_caregiver(
    pool: &PgPool,
    organization_id: Uuid,
    new: NewCaregiver,
) -> ServiceResult<CaregiverRow> {
    let id = Uuid::new_v4();
    let NewCaregiver { profile, credentials } = new;
    sqlx::query(
        "INSERT INTO caregivers (
            id, organization_id, first_name, middle_name, last_name, phone, email, address,
            date_of_birth, gender, height, weight, languages,
            address_proof, bank_name, account_number, ifsc_code,
            prior_experience, qualification, qualification_proof
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
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
    .bind(credentials.address_proof)
    .bind(credentials.bank_name)
    .bind(credentials.account_number)
    .bind(credentials.ifsc_code)
    .bind(credentials.prior_experience)
    .bind(credentials.qualification)
    .bind(credentials.qualification_proof)
    .execute(pool)
    .await?;

    info!(%id, %organization_id, "registered caregiver");
    get_caregiver(pool, organization_id, id).await
}

/// Apply a partial update; absent fields keep their stored value.
///
/// # Errors
///
/// Returns `NotFound` if the caregiver does not exist in this organization.
pub async fn update_caregiver(
    pool: &PgPool,
    organization_id: Uuid,
    caregiver_id: Uuid,
    changes: CaregiverChanges,
) -> ServiceResult<CaregiverRow> {
    let CaregiverChanges { profile, credentials } = changes;
    let result = sqlx::query(
        "UPDATE caregivers SET
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
            address_proof = COALESCE($14, address_proof),
            bank_name = COALESCE($15, bank_name),
            account_number = COALESCE($16, account_number),
            ifsc_code = COALESCE($17, ifsc_code),
            prior_experience = COALESCE($18, prior_experience),
            qualification = COALESCE($19, qualification),
            qualification_proof = COALESCE($20, qualification_proof),
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(caregiver_id)
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
    .bind(credentials.address_proof)
    .bind(credentials.bank_name)
    .bind(credentials.account_number)
    .bind(credentials.ifsc_code)
    .bind(credentials.prior_experience)
    .bind(credentials.qualification)
    .bind(credentials.qualification_proof)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("caregiver", caregiver_id));
    }
    get_caregiver(pool, organization_id, caregiver_id).await
}

/// Delete a caregiver. Their schedules become unassigned; leave requests and
/// care relationships cascade.
///
/// # Errors
///
/// Returns `NotFound` if nothing was deleted.
pub async fn delete_caregiver(pool: &PgPool, organization_id: Uuid, caregiver_id: Uuid) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM caregivers WHERE id = $1 AND organization_id = $2")
        .bind(caregiver_id)
        .bind(organization_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("caregiver", caregiver_id));
    }
    info!(%caregiver_id, %organization_id, "deleted caregiver");
    Ok(())
}

/// Confirm a caregiver exists in the organization before linking to it.
///
/// # Errors
///
/// Returns `NotFound` if it does not.
pub async fn ensure_caregiver(pool: &PgPool, organization_id: Uuid, caregiver_id: Uuid) -> ServiceResult<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM caregivers WHERE id = $1 AND organization_id = $2)")
            .bind(caregiver_id)
            .bind(organization_id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(ServiceError::not_found("caregiver", caregiver_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_also_matches_languages() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM caregivers c");
        push_filters(&mut builder, Uuid::nil(), Some("%tamil%"));
        let sql = builder.sql();
        assert!(sql.contains("array_to_string(c.languages, ' ') ILIKE $5"));
    }

    #[test]
    fn select_exposes_display_name() {
        assert!(select_columns().contains("concat_ws(' ', c.first_name, c.middle_name, c.last_name) AS name"));
    }
}
