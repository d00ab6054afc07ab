use super::*;
use time::macros::datetime;

#[test]
fn start_and_end_allowed_only_from_open_statuses() {
    for status in ScheduleStatus::ALL {
        let open = matches!(status, ScheduleStatus::Scheduled | ScheduleStatus::InProgress);
        assert_eq!(status.can_start(), open, "start from {status}");
        assert_eq!(status.can_end(), open, "end from {status}");
    }
}

#[test]
fn completed_schedules_cannot_be_cancelled() {
    assert!(!ScheduleStatus::Completed.can_cancel());
    assert!(ScheduleStatus::Scheduled.can_cancel());
    assert!(ScheduleStatus::InProgress.can_cancel());
    assert!(ScheduleStatus::NoShow.can_cancel());
    assert!(ScheduleStatus::Cancelled.can_cancel());
}

#[test]
fn transitions_dispatch_to_status_rules() {
    assert!(Transition::Start.allowed_from(ScheduleStatus::InProgress));
    assert!(!Transition::End.allowed_from(ScheduleStatus::Cancelled));
    assert!(!Transition::Cancel.allowed_from(ScheduleStatus::Completed));
}

#[test]
fn window_must_have_positive_length() {
    let start = datetime!(2025-03-10 09:00 UTC);
    assert!(check_window(start, datetime!(2025-03-10 10:00 UTC)).is_ok());
    assert!(check_window(start, start).is_err());
    assert!(check_window(start, datetime!(2025-03-10 08:00 UTC)).is_err());
}

#[test]
fn service_type_rejects_unknown_values() {
    assert_eq!(ServiceType::parse("service_type", "nursing").unwrap(), ServiceType::Nursing);
    let err = ServiceType::parse("service_type", "cleaning").unwrap_err();
    assert!(err.to_string().starts_with("service_type must be one of"));
}

#[test]
fn upcoming_filter_binds_open_statuses() {
    let mut builder = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    let filter = ScheduleFilter { upcoming: true, caregiver_id: Some(Uuid::nil()), ..Default::default() };
    push_filters(&mut builder, Uuid::nil(), &filter);
    let sql = builder.sql();
    assert!(sql.contains("s.scheduled_end > now() AND s.status IN ($2, $3)"));
    assert!(sql.contains("s.caregiver_id = $4"));
    assert!(!sql.contains("s.patient_id ="));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::patient::{CareRequirements, NewPatient, create_patient};
    use crate::services::profile::Profile;
    use crate::state::test_helpers::live_app_state;

    #[tokio::test]
    async fn end_backfills_check_in_and_blocks_cancel() {
        let state = live_app_state().await;
        let org = Uuid::nil();
        let patient = create_patient(
            &state.pool,
            org,
            NewPatient {
                profile: Profile {
                    first_name: "Visit".into(),
                    middle_name: None,
                    last_name: "Patient".into(),
                    phone: "9876543210".into(),
                    email: None,
                    address: None,
                    date_of_birth: None,
                    gender: None,
                    height: None,
                    weight: None,
                    languages: Vec::new(),
                },
                support_requested: None,
                work_type: None,
                requirements: CareRequirements::default(),
            },
        )
        .await
        .unwrap();

        let start = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let schedule = create_schedule(
            &state.pool,
            org,
            Uuid::nil(),
            NewSchedule {
                patient_id: patient.id,
                caregiver_id: None,
                service_type: ServiceType::Companionship,
                scheduled_start: start,
                scheduled_end: start + time::Duration::hours(2),
                timezone: None,
                location: None,
                recurrence_rule: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(schedule.status, "scheduled");

        let ended = transition_schedule(&state.pool, org, schedule.id, Transition::End).await.unwrap();
        assert_eq!(ended.status, "completed");
        assert!(ended.checked_in_at.is_some());
        assert!(ended.checked_out_at.is_some());

        let err = transition_schedule(&state.pool, org, schedule.id, Transition::Cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
