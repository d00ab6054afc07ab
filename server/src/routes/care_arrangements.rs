//! Care arrangement routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::care_relationships::PatientScopedQuery;
use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::care_arrangement::{
    self, CareArrangementChanges, CareArrangementRow, CareMode, NewCareArrangement,
};
use crate::state::AppState;
use crate::validate::{Validated, date, date_range, optional_date, optional_text, required};

#[derive(Debug, Deserialize)]
pub struct CreateCareArrangementBody {
    #[serde(alias = "patientId")]
    pub patient_id: Uuid,
    #[serde(default)]
    pub mode: String,
    #[serde(default, alias = "effectiveFrom")]
    pub effective_from: String,
    #[serde(default, alias = "effectiveTo")]
    pub effective_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateCareArrangementBody {
    fn validate(self) -> Validated<NewCareArrangement> {
        let effective_from = date("effective_from", &required("effective_from", &self.effective_from)?)?;
        let effective_to = optional_date("effective_to", self.effective_to)?;
        date_range("effective_from", Some(effective_from), "effective_to", effective_to)?;
        Ok(NewCareArrangement {
            patient_id: self.patient_id,
            mode: CareMode::parse("mode", &required("mode", &self.mode)?)?,
            effective_from,
            effective_to,
            notes: optional_text(self.notes),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCareArrangementBody {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, alias = "effectiveFrom")]
    pub effective_from: Option<String>,
    #[serde(default, alias = "effectiveTo")]
    pub effective_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateCareArrangementBody {
    fn validate(self) -> Validated<CareArrangementChanges> {
        Ok(CareArrangementChanges {
            mode: CareMode::parse_optional("mode", self.mode.as_deref())?,
            effective_from: optional_date("effective_from", self.effective_from)?,
            effective_to: optional_date("effective_to", self.effective_to)?,
            notes: optional_text(self.notes),
        })
    }
}

/// `GET /api/care-arrangements`
pub async fn list_care_arrangements(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<PatientScopedQuery>,
) -> ApiResult<Json<Vec<CareArrangementRow>>> {
    let rows = care_arrangement::list_care_arrangements(&state.pool, ctx.organization_id, query.patient_id).await?;
    Ok(Json(rows))
}

/// `POST /api/care-arrangements`: closes the patient's open arrangement.
pub async fn create_care_arrangement(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateCareArrangementBody>,
) -> ApiResult<(StatusCode, Json<CareArrangementRow>)> {
    let new = body.validate()?;
    let row = care_arrangement::create_care_arrangement(&state.pool, ctx.organization_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/care-arrangements/{id}`
pub async fn get_care_arrangement(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(arrangement_id): PathParam<Uuid>,
) -> ApiResult<Json<CareArrangementRow>> {
    let row = care_arrangement::get_care_arrangement(&state.pool, ctx.organization_id, arrangement_id).await?;
    Ok(Json(row))
}

/// `PATCH /api/care-arrangements/{id}`
pub async fn update_care_arrangement(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(arrangement_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateCareArrangementBody>,
) -> ApiResult<Json<CareArrangementRow>> {
    let changes = body.validate()?;
    let row =
        care_arrangement::update_care_arrangement(&state.pool, ctx.organization_id, arrangement_id, changes).await?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    #[test]
    fn open_ended_arrangement_is_valid() {
        let body: CreateCareArrangementBody = serde_json::from_value(serde_json::json!({
            "patientId": Uuid::nil(),
            "mode": "visits_only",
            "effectiveFrom": "2025-01-01"
        }))
        .unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.mode, CareMode::VisitsOnly);
        assert_eq!(new.effective_to, None);
    }

    #[test]
    fn effective_to_before_from_is_rejected() {
        let body: CreateCareArrangementBody = serde_json::from_value(serde_json::json!({
            "patient_id": Uuid::nil(),
            "mode": "caregiver_24x7_only",
            "effective_from": "2025-02-01",
            "effective_to": "2025-01-31"
        }))
        .unwrap();
        assert_eq!(
            body.validate().unwrap_err(),
            ValidationError::Range { start: "effective_from", end: "effective_to" }
        );
    }
}
