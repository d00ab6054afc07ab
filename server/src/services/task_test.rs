use super::*;
use time::macros::datetime;

#[test]
fn scope_requires_exactly_one_owner() {
    let id = Some(Uuid::new_v4());
    assert!(check_scope(id, None).is_ok());
    assert!(check_scope(None, id).is_ok());
    assert!(check_scope(id, id).is_err());
    assert!(check_scope(None, None).is_err());
}

#[test]
fn scope_must_belong_to_task_patient() {
    let patient = Uuid::new_v4();
    assert!(check_scope_patient("schedule_id", patient, patient).is_ok());
    let err = check_scope_patient("schedule_id", patient, Uuid::new_v4()).unwrap_err();
    assert_eq!(err.to_string(), "schedule_id belongs to a different patient");
}

#[test]
fn completing_stamps_time_and_actor() {
    let now = datetime!(2025-03-10 12:00 UTC);
    let actor = Uuid::new_v4();
    let (at, by) = completion_stamp(TaskStatus::Completed, None, None, actor, now);
    assert_eq!(at, Some(now));
    assert_eq!(by, Some(actor));
}

#[test]
fn completing_again_keeps_original_stamp() {
    let first = datetime!(2025-03-09 08:00 UTC);
    let original_actor = Uuid::new_v4();
    let (at, by) = completion_stamp(
        TaskStatus::Completed,
        Some(first),
        Some(original_actor),
        Uuid::new_v4(),
        datetime!(2025-03-10 12:00 UTC),
    );
    assert_eq!(at, Some(first));
    assert_eq!(by, Some(original_actor));
}

#[test]
fn leaving_completed_does_not_clear_stamp() {
    let first = datetime!(2025-03-09 08:00 UTC);
    let actor = Uuid::new_v4();
    let (at, by) = completion_stamp(TaskStatus::Pending, Some(first), Some(actor), Uuid::new_v4(), first);
    assert_eq!(at, Some(first));
    assert_eq!(by, Some(actor));
}

#[test]
fn pending_tasks_stay_unstamped() {
    let (at, by) = completion_stamp(TaskStatus::Skipped, None, None, Uuid::new_v4(), datetime!(2025-03-10 12:00 UTC));
    assert_eq!(at, None);
    assert_eq!(by, None);
}

#[test]
fn filters_bind_each_reference() {
    let mut builder = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    let filter = TaskFilter { patient_id: Some(Uuid::nil()), schedule_id: None, care_relationship_id: Some(Uuid::nil()) };
    push_filters(&mut builder, Uuid::nil(), &filter);
    let sql = builder.sql();
    assert!(sql.contains("t.patient_id = $2"));
    assert!(sql.contains("t.care_relationship_id = $3"));
    assert!(!sql.contains("t.schedule_id ="));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::patient::{CareRequirements, NewPatient, create_patient};
    use crate::services::profile::Profile;
    use crate::services::schedule::{NewSchedule, ServiceType, create_schedule};
    use crate::state::test_helpers::live_app_state;
    use time::macros::date;

    async fn live_patient(pool: &PgPool, first: &str) -> Uuid {
        let profile = Profile {
            first_name: first.into(),
            middle_name: None,
            last_name: "Task".into(),
            phone: "9876543210".into(),
            email: None,
            address: None,
            date_of_birth: None,
            gender: None,
            height: None,
            weight: None,
            languages: Vec::new(),
        };
        let new = NewPatient { profile, support_requested: None, work_type: None, requirements: CareRequirements::default() };
        create_patient(pool, Uuid::nil(), new).await.unwrap().id
    }

    #[tokio::test]
    async fn task_cannot_borrow_another_patients_visit() {
        let state = live_app_state().await;
        let org = Uuid::nil();
        let owner = live_patient(&state.pool, "Owner").await;
        let other = live_patient(&state.pool, "Other").await;

        let start = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let schedule = create_schedule(
            &state.pool,
            org,
            Uuid::nil(),
            NewSchedule {
                patient_id: owner,
                caregiver_id: None,
                service_type: ServiceType::PersonalCare,
                scheduled_start: start,
                scheduled_end: start + time::Duration::hours(1),
                timezone: None,
                location: None,
                recurrence_rule: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        let task = |patient_id| NewTask {
            patient_id,
            schedule_id: Some(schedule.id),
            care_relationship_id: None,
            task_date: date!(2025 - 03 - 10),
            title: "Medication reminder".into(),
            description: None,
            category: Some(TaskCategory::Medication),
            frequency: None,
            status: TaskStatus::Pending,
            notes: None,
            sort_order: None,
        };

        let err = create_task(&state.pool, org, Uuid::nil(), task(other)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let created = create_task(&state.pool, org, Uuid::nil(), task(owner)).await.unwrap();
        assert_eq!(created.schedule_id, Some(schedule.id));
    }
}
