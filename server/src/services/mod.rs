//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own SQL and business rules so route handlers can stay
//! focused on request parsing, validation, and response shaping. Every
//! service returns `ServiceError`; handlers lift it into `ApiError`.

pub mod care_arrangement;
pub mod care_relationship;
pub mod caregiver;
pub mod dashboard;
pub mod leave;
pub mod listing;
pub mod location;
pub mod membership;
pub mod message;
pub mod organization;
pub mod patient;
pub mod person;
pub mod profile;
pub mod schedule;
pub mod task;
pub mod visit_note;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invite token is invalid or already used")]
    InviteNotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err
            && db.is_unique_violation()
        {
            return Self::Conflict(unique_violation_message(db.constraint()));
        }
        Self::Database(err)
    }
}

impl crate::error::ErrorCode for ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::InviteNotFound => "E_NOT_FOUND",
            Self::Validation(_) => "E_VALIDATION",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::InviteNotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServiceError {
    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Human message for a unique-constraint violation, keyed by constraint name.
pub(crate) fn unique_violation_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("persons_email_key") => "a person with this email already exists".into(),
        Some("persons_invite_token_hash_key") => "invite token collision, retry the request".into(),
        Some("memberships_person_id_organization_id_key") => {
            "membership for this person and organization already exists".into()
        }
        Some("visit_notes_schedule_id_key") => "a visit note already exists for this schedule".into(),
        Some("organizations_slug_key") => "an organization with this slug already exists".into(),
        Some("care_relationships_single_24x7_idx") => {
            "patient already has an active 24/7 caregiver".into()
        }
        Some("locations_single_default_idx") => "organization already has a default location".into(),
        Some("care_arrangements_single_open_idx") => {
            "patient already has an open-ended care arrangement".into()
        }
        Some(other) => format!("duplicate value violates {other}"),
        None => "duplicate value".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn unique_violation_messages_are_specific() {
        assert_eq!(
            unique_violation_message(Some("persons_email_key")),
            "a person with this email already exists"
        );
        assert_eq!(
            unique_violation_message(Some("visit_notes_schedule_id_key")),
            "a visit note already exists for this schedule"
        );
        assert_eq!(
            unique_violation_message(Some("care_arrangements_single_open_idx")),
            "patient already has an open-ended care arrangement"
        );
        assert_eq!(unique_violation_message(Some("other_key")), "duplicate value violates other_key");
        assert_eq!(unique_violation_message(None), "duplicate value");
    }

    #[test]
    fn validation_errors_lift_into_service_errors() {
        let err: ServiceError = ValidationError::Phone("phone").into();
        assert_eq!(err.error_code(), "E_VALIDATION");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "phone must be 7-15 digits");
    }

    #[test]
    fn row_not_found_is_a_database_error() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
