//! Care relationship routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::care_relationship::{
    self, CareRelationshipChanges, CareRelationshipRow, NewCareRelationship, RelationshipRole, RelationshipStatus,
};
use crate::state::AppState;
use crate::validate::{Validated, date_range, optional_date, optional_text, required};

#[derive(Debug, Default, Deserialize)]
pub struct PatientScopedQuery {
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCareRelationshipBody {
    #[serde(alias = "patientId")]
    pub patient_id: Uuid,
    #[serde(alias = "caregiverId")]
    pub caregiver_id: Uuid,
    #[serde(default)]
    pub role: String,
    #[serde(default, alias = "is24x7Caregiver", alias = "is_24x7")]
    pub is_24x7_caregiver: bool,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateCareRelationshipBody {
    fn validate(self) -> Validated<NewCareRelationship> {
        let start_date = optional_date("start_date", self.start_date)?;
        let end_date = optional_date("end_date", self.end_date)?;
        date_range("start_date", start_date, "end_date", end_date)?;
        Ok(NewCareRelationship {
            patient_id: self.patient_id,
            caregiver_id: self.caregiver_id,
            role: RelationshipRole::parse("role", &required("role", &self.role)?)?,
            is_24x7_caregiver: self.is_24x7_caregiver,
            start_date,
            end_date,
            notes: optional_text(self.notes),
            status: RelationshipStatus::parse_optional("status", self.status.as_deref())?
                .unwrap_or(RelationshipStatus::Active),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCareRelationshipBody {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "is24x7Caregiver", alias = "is_24x7")]
    pub is_24x7_caregiver: Option<bool>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateCareRelationshipBody {
    fn validate(self) -> Validated<CareRelationshipChanges> {
        Ok(CareRelationshipChanges {
            role: RelationshipRole::parse_optional("role", self.role.as_deref())?,
            is_24x7_caregiver: self.is_24x7_caregiver,
            start_date: optional_date("start_date", self.start_date)?,
            end_date: optional_date("end_date", self.end_date)?,
            notes: optional_text(self.notes),
            status: RelationshipStatus::parse_optional("status", self.status.as_deref())?,
        })
    }
}

/// `GET /api/care-relationships`
pub async fn list_care_relationships(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<PatientScopedQuery>,
) -> ApiResult<Json<Vec<CareRelationshipRow>>> {
    let rows =
        care_relationship::list_care_relationships(&state.pool, ctx.organization_id, query.patient_id).await?;
    Ok(Json(rows))
}

/// `POST /api/care-relationships`
pub async fn create_care_relationship(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateCareRelationshipBody>,
) -> ApiResult<(StatusCode, Json<CareRelationshipRow>)> {
    let new = body.validate()?;
    let row = care_relationship::create_care_relationship(&state.pool, ctx.organization_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/care-relationships/{id}`
pub async fn get_care_relationship(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(relationship_id): PathParam<Uuid>,
) -> ApiResult<Json<CareRelationshipRow>> {
    let row = care_relationship::get_care_relationship(&state.pool, ctx.organization_id, relationship_id).await?;
    Ok(Json(row))
}

/// `PATCH /api/care-relationships/{id}`
pub async fn update_care_relationship(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(relationship_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateCareRelationshipBody>,
) -> ApiResult<Json<CareRelationshipRow>> {
    let changes = body.validate()?;
    let row =
        care_relationship::update_care_relationship(&state.pool, ctx.organization_id, relationship_id, changes)
            .await?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    #[test]
    fn create_defaults_to_active() {
        let body: CreateCareRelationshipBody = serde_json::from_value(serde_json::json!({
            "patientId": Uuid::nil(),
            "caregiverId": Uuid::nil(),
            "role": "aide",
            "is24x7Caregiver": true
        }))
        .unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.status, RelationshipStatus::Active);
        assert!(new.is_24x7_caregiver);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let body: CreateCareRelationshipBody = serde_json::from_value(serde_json::json!({
            "patient_id": Uuid::nil(),
            "caregiver_id": Uuid::nil(),
            "role": "nurse",
            "start_date": "2025-02-01",
            "end_date": "2025-01-01"
        }))
        .unwrap();
        assert_eq!(body.validate().unwrap_err(), ValidationError::Range { start: "start_date", end: "end_date" });
    }

    #[test]
    fn role_is_required() {
        let body: CreateCareRelationshipBody =
            serde_json::from_value(serde_json::json!({"patient_id": Uuid::nil(), "caregiver_id": Uuid::nil()}))
                .unwrap();
        assert_eq!(body.validate().unwrap_err(), ValidationError::Required("role"));
    }
}
