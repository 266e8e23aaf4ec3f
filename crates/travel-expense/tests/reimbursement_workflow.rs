use std::sync::Arc;

use chrono::NaiveDate;
use travel_expense::config::StoreConfig;
use travel_expense::workflows::reimbursement::{
    ApplicationRef, ApplicationStatus, ExpenseCategory, ExpenseItemDraft, MemoryStores,
    ReimbursementError, ReimbursementService, Role, TransitionError, TripDraft, UserId,
    UserProfile, ValidationError,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn user(id: &str, role: Role) -> UserProfile {
    UserProfile {
        id: UserId(id.to_string()),
        full_name: None,
        company_name: Some("Integration Co.".to_string()),
        position: None,
        department: None,
        role,
    }
}

fn service() -> ReimbursementService<MemoryStores> {
    ReimbursementService::new(Arc::new(MemoryStores::default()), StoreConfig::default())
}

#[tokio::test]
async fn trip_and_expense_flow_through_approval_into_monthly_totals() {
    let service = service();
    let traveler = user("traveler", Role::User);
    let approver = user("approver", Role::Approver);

    let trip = service
        .create_business_trip(
            &traveler,
            TripDraft {
                title: "Fukuoka trade fair".to_string(),
                destination: "Fukuoka".to_string(),
                start_date: Some(date(2024, 6, 10)),
                end_date: Some(date(2024, 6, 12)),
                ..TripDraft::default()
            },
        )
        .await
        .expect("create trip");
    assert_eq!(trip.estimate.total, 37_000);

    let expense = service
        .create_expense_application(
            &traveler,
            "Fair supplies",
            vec![ExpenseItemDraft {
                category: ExpenseCategory::Miscellaneous,
                date: date(2024, 6, 11),
                amount: 2_500,
                description: "Booth tape".to_string(),
                receipt_url: None,
                ocr_data: None,
            }],
        )
        .await
        .expect("create expense");

    for target in [
        ApplicationRef::BusinessTrip(trip.id),
        ApplicationRef::Expense(expense.id),
    ] {
        service.submit(&traveler, target).await.expect("submit");
    }

    let queue = service.pending_approvals(&approver).await.expect("queue");
    assert_eq!(queue.business_trips.len(), 1);
    assert_eq!(queue.expenses.len(), 1);

    service
        .approve(&approver, ApplicationRef::BusinessTrip(trip.id), None)
        .await
        .expect("approve trip");
    let rejected = service
        .reject(
            &approver,
            ApplicationRef::Expense(expense.id),
            Some("not reimbursable".to_string()),
        )
        .await
        .expect("reject expense");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);

    // Expenses are dated by filing day (today under the system clock).
    let june = service
        .monthly_totals(&traveler.id, 2024, 6)
        .await
        .expect("monthly totals");
    assert_eq!(june.business_trip_total, 37_000);
    assert_eq!(june.business_trip_count, 1);
    assert_eq!(june.expense_count, 0);
}

#[tokio::test]
async fn traveler_cannot_approve_own_trip() {
    let service = service();
    let traveler = user("traveler", Role::User);

    let trip = service
        .create_business_trip(
            &traveler,
            TripDraft {
                title: "Day trip".to_string(),
                start_date: Some(date(2024, 7, 1)),
                end_date: Some(date(2024, 7, 1)),
                ..TripDraft::default()
            },
        )
        .await
        .expect("create trip");
    assert_eq!(trip.estimate.accommodation, 0);

    let target = ApplicationRef::BusinessTrip(trip.id);
    service.submit(&traveler, target).await.expect("submit");

    match service.approve(&traveler, target, None).await {
        Err(ReimbursementError::Transition(TransitionError::RoleNotPermitted { .. })) => {}
        other => panic!("expected role refusal, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_expense_is_rejected_before_any_write() {
    let service = service();
    let traveler = user("traveler", Role::User);

    match service
        .create_expense_application(&traveler, "Nothing", Vec::new())
        .await
    {
        Err(ReimbursementError::Validation(ValidationError::NoItems)) => {}
        other => panic!("expected no items error, got {other:?}"),
    }
    let listed = service
        .expense_applications(&traveler.id)
        .await
        .expect("list expenses");
    assert!(listed.is_empty());
}
