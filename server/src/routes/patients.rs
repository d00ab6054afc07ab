//! Patient registration and directory routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use super::profile::{ProfileBody, ProfileChangesBody};
use crate::error::ApiResult;
use crate::services::listing::{ListQuery, Page, PageWindow, like_pattern};
use crate::services::patient::{self, CareRequirements, NewPatient, PatientChanges, PatientRow};
use crate::state::AppState;
use crate::validate::{Validated, optional_text};

#[derive(Debug, Deserialize)]
pub struct CreatePatientBody {
    #[serde(flatten)]
    pub profile: ProfileBody,
    #[serde(default, alias = "supportRequested")]
    pub support_requested: Option<String>,
    #[serde(default, alias = "workType")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub requirements: CareRequirements,
}

impl CreatePatientBody {
    fn validate(self) -> Validated<NewPatient> {
        Ok(NewPatient {
            profile: self.profile.validate()?,
            support_requested: optional_text(self.support_requested),
            work_type: optional_text(self.work_type),
            requirements: self.requirements,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientBody {
    #[serde(flatten)]
    pub profile: ProfileChangesBody,
    #[serde(default, alias = "supportRequested")]
    pub support_requested: Option<String>,
    #[serde(default, alias = "workType")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub requirements: Option<CareRequirements>,
}

impl UpdatePatientBody {
    fn validate(self) -> Validated<PatientChanges> {
        Ok(PatientChanges {
            profile: self.profile.validate()?,
            support_requested: optional_text(self.support_requested),
            work_type: optional_text(self.work_type),
            requirements: self.requirements,
        })
    }
}

/// `GET /api/patients`: paged directory with optional search.
pub async fn list_patients(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<ListQuery>,
) -> ApiResult<Json<Page<PatientRow>>> {
    let window = PageWindow::resolve(query.page, query.per_page, state.default_page_size());
    let pattern = like_pattern(query.search.as_deref());
    let page = patient::list_patients(&state.pool, ctx.organization_id, pattern.as_deref(), window).await?;
    Ok(Json(page))
}

/// `POST /api/patients`
pub async fn create_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreatePatientBody>,
) -> ApiResult<(StatusCode, Json<PatientRow>)> {
    let new = body.validate()?;
    let row = patient::create_patient(&state.pool, ctx.organization_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/patients/{id}`
pub async fn get_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(patient_id): PathParam<Uuid>,
) -> ApiResult<Json<PatientRow>> {
    Ok(Json(patient::get_patient(&state.pool, ctx.organization_id, patient_id).await?))
}

/// `PATCH /api/patients/{id}`
pub async fn update_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(patient_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdatePatientBody>,
) -> ApiResult<Json<PatientRow>> {
    let changes = body.validate()?;
    let row = patient::update_patient(&state.pool, ctx.organization_id, patient_id, changes).await?;
    Ok(Json(row))
}

/// `DELETE /api/patients/{id}`
pub async fn delete_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(patient_id): PathParam<Uuid>,
) -> ApiResult<StatusCode> {
    patient::delete_patient(&state.pool, ctx.organization_id, patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_reads_dashboard_form() {
        let body: CreatePatientBody = serde_json::from_value(serde_json::json!({
            "firstName": "Mary",
            "lastName": "Smith",
            "phone": "9876543210",
            "supportRequested": "Elderly care",
            "workType": "",
            "requirements": {"bedRidden": false, "canWalk": true}
        }))
        .unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.profile.first_name, "Mary");
        assert_eq!(new.support_requested.as_deref(), Some("Elderly care"));
        assert_eq!(new.work_type, None);
        assert_eq!(new.requirements.can_walk, Some(true));
    }

    #[test]
    fn update_body_leaves_requirements_alone_when_absent() {
        let body: UpdatePatientBody = serde_json::from_value(serde_json::json!({"address": "12 Lake Rd"})).unwrap();
        let changes = body.validate().unwrap();
        assert_eq!(changes.requirements, None);
        assert_eq!(changes.profile.address.as_deref(), Some("12 Lake Rd"));
    }
}
