//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One module per resource under `/api`, plus the `/health` and `/ready`
//! probes. Every handler resolves the caller through `RequestContext` and
//! delegates to the matching service module. CORS is permissive so the
//! dashboard can call from its own origin.

pub mod care_arrangements;
pub mod care_relationships;
pub mod caregivers;
pub mod context;
pub mod conversations;
pub mod dashboard;
pub mod extract;
pub mod health;
pub mod leave_requests;
pub mod locations;
pub mod memberships;
pub mod organizations;
pub mod patients;
pub mod persons;
pub mod profile;
pub mod schedules;
pub mod tasks;
pub mod visit_notes;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(patients::list_patients).post(patients::create_patient))
        .route(
            "/patients/{id}",
            get(patients::get_patient)
                .patch(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route("/caregivers", get(caregivers::list_caregivers).post(caregivers::create_caregiver))
        .route(
            "/caregivers/{id}",
            get(caregivers::get_caregiver)
                .patch(caregivers::update_caregiver)
                .delete(caregivers::delete_caregiver),
        )
        .route(
            "/leave-requests",
            get(leave_requests::list_leave_requests).post(leave_requests::create_leave_request),
        )
        .route(
            "/leave-requests/{id}",
            get(leave_requests::get_leave_request).delete(leave_requests::delete_leave_request),
        )
        .route("/leave-requests/{id}/approve", post(leave_requests::approve_leave_request))
        .route("/leave-requests/{id}/deny", post(leave_requests::deny_leave_request))
        .route("/schedules", get(schedules::list_schedules).post(schedules::create_schedule))
        .route(
            "/schedules/{id}",
            get(schedules::get_schedule)
                .patch(schedules::update_schedule)
                .delete(schedules::cancel_schedule),
        )
        .route("/schedules/{id}/start", post(schedules::start_schedule))
        .route("/schedules/{id}/end", post(schedules::end_schedule))
        .route("/visit-notes", get(visit_notes::list_visit_notes).post(visit_notes::create_visit_note))
        .route("/visit-notes/{id}", get(visit_notes::get_visit_note).patch(visit_notes::update_visit_note))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/{id}", get(tasks::get_task).patch(tasks::update_task))
        .route(
            "/care-relationships",
            get(care_relationships::list_care_relationships).post(care_relationships::create_care_relationship),
        )
        .route(
            "/care-relationships/{id}",
            get(care_relationships::get_care_relationship).patch(care_relationships::update_care_relationship),
        )
        .route(
            "/care-arrangements",
            get(care_arrangements::list_care_arrangements).post(care_arrangements::create_care_arrangement),
        )
        .route(
            "/care-arrangements/{id}",
            get(care_arrangements::get_care_arrangement).patch(care_arrangements::update_care_arrangement),
        )
        .route("/locations", get(locations::list_locations).post(locations::create_location))
        .route(
            "/locations/{id}",
            get(locations::get_location)
                .patch(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/persons", get(persons::list_persons).post(persons::invite_person))
        .route("/persons/{id}", get(persons::get_person).patch(persons::update_person))
        .route("/invites/accept", post(persons::accept_invite))
        .route("/organizations", get(organizations::list_organizations))
        .route(
            "/organizations/{id}",
            get(organizations::get_organization).patch(organizations::update_organization),
        )
        .route("/memberships", get(memberships::list_memberships).post(memberships::create_membership))
        .route("/memberships/{id}", get(memberships::get_membership).patch(memberships::update_membership))
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route("/conversations/{id}", get(conversations::get_conversation))
        .route(
            "/conversations/{id}/messages",
            get(conversations::list_messages).post(conversations::post_message),
        )
        .route("/dashboard/stats", get(dashboard::stats))
}

/// Full application router with shared state applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
