use super::*;
use time::macros::date;

#[test]
fn single_day_leave_counts_one_day() {
    assert_eq!(leave_days(date!(2025 - 03 - 10), date!(2025 - 03 - 10)).unwrap(), 1);
}

#[test]
fn leave_days_are_inclusive_across_months() {
    assert_eq!(leave_days(date!(2025 - 01 - 30), date!(2025 - 02 - 02)).unwrap(), 4);
}

#[test]
fn reversed_range_is_rejected() {
    let err = leave_days(date!(2025 - 03 - 10), date!(2025 - 03 - 09)).unwrap_err();
    assert_eq!(err.to_string(), "end_date cannot be before start_date");
}

#[test]
fn decisions_map_to_terminal_statuses() {
    assert_eq!(Decision::Approve.resulting_status(), LeaveStatus::Approved);
    assert_eq!(Decision::Deny.resulting_status(), LeaveStatus::Denied);
}

#[test]
fn status_filter_rejects_unknown_values() {
    assert!(LeaveStatus::parse("status", "cancelled").is_err());
    assert_eq!(LeaveStatus::parse("status", "pending").unwrap(), LeaveStatus::Pending);
}

#[test]
fn filters_bind_in_order() {
    let mut builder = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    let filter = LeaveFilter { status: Some(LeaveStatus::Pending), caregiver_id: Some(Uuid::nil()) };
    push_filters(&mut builder, Uuid::nil(), &filter);
    let sql = builder.sql();
    assert!(sql.contains("l.organization_id = $1"));
    assert!(sql.contains("l.status = $2"));
    assert!(sql.contains("l.caregiver_id = $3"));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::caregiver::{Credentials, NewCaregiver, create_caregiver};
    use crate::services::profile::Profile;
    use crate::state::test_helpers::live_app_state;

    fn caregiver() -> NewCaregiver {
        NewCaregiver {
            profile: Profile {
                first_name: "Leave".into(),
                middle_name: None,
                last_name: "Tester".into(),
                phone: "9876543210".into(),
                email: None,
                address: None,
                date_of_birth: None,
                gender: None,
                height: None,
                weight: None,
                languages: Vec::new(),
            },
            credentials: Credentials::default(),
        }
    }

    #[tokio::test]
    async fn second_decision_conflicts() {
        let state = live_app_state().await;
        let org = Uuid::nil();
        let cg = create_caregiver(&state.pool, org, caregiver()).await.unwrap();
        let filed = create_leave_request(
            &state.pool,
            org,
            NewLeaveRequest {
                caregiver_id: cg.id,
                start_date: date!(2025 - 05 - 01),
                end_date: date!(2025 - 05 - 03),
                reason: Some("family".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(filed.days, 3);
        assert_eq!(filed.status, "pending");

        let approved = decide_leave_request(&state.pool, org, filed.id, Decision::Approve, Uuid::nil())
            .await
            .unwrap();
        assert_eq!(approved.status, "approved");
        assert!(approved.decided_at.is_some());

        let err = decide_leave_request(&state.pool, org, filed.id, Decision::Deny, Uuid::nil())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
