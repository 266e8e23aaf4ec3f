use super::common::*;
use crate::workflows::reimbursement::allowance::estimate;
use crate::workflows::reimbursement::domain::{
    ApplicationStatus, ApprovalTrail, BusinessTripApplication, BusinessTripId, ExpenseApplication,
    ExpenseApplicationId, ItemsState,
};
use crate::workflows::reimbursement::error::ValidationError;
use crate::workflows::reimbursement::statistics::{summarize, MonthlyPeriod, MonthlyTotals};

fn trip(status: ApplicationStatus, start: (u32, u32), end: (u32, u32)) -> BusinessTripApplication {
    let start_date = date(2024, start.0, start.1);
    let end_date = date(2024, end.0, end.1);
    BusinessTripApplication {
        id: BusinessTripId::generate(),
        user_id: employee().id,
        title: "trip".to_string(),
        purpose: String::new(),
        destination: "Sendai".to_string(),
        start_date,
        end_date,
        estimate: estimate(start_date, end_date, 5_000).expect("valid range"),
        approval: ApprovalTrail {
            status,
            ..ApprovalTrail::draft()
        },
        created_at: at(2024, 5, 1),
        updated_at: at(2024, 5, 1),
    }
}

fn expense(status: ApplicationStatus, filed: (u32, u32), total: i64) -> ExpenseApplication {
    ExpenseApplication {
        id: ExpenseApplicationId::generate(),
        user_id: employee().id,
        title: "receipts".to_string(),
        total_amount: total,
        approval: ApprovalTrail {
            status,
            ..ApprovalTrail::draft()
        },
        items_state: ItemsState::Attached,
        created_at: at(2024, filed.0, filed.1),
        updated_at: at(2024, filed.0, filed.1),
    }
}

#[test]
fn month_boundaries_are_real_calendar_ends() {
    let february = MonthlyPeriod::new(2024, 2).expect("valid month");
    assert_eq!(february.range.end, date(2024, 2, 29));
    assert_eq!(february.days(), 29);

    let december = MonthlyPeriod::new(2023, 12).expect("valid month");
    assert_eq!(december.range.start, date(2023, 12, 1));
    assert_eq!(december.range.end, date(2023, 12, 31));

    assert_eq!(MonthlyPeriod::new(2024, 4).expect("valid").days(), 30);
}

#[test]
fn month_outside_calendar_is_rejected() {
    assert_eq!(
        MonthlyPeriod::new(2024, 13),
        Err(ValidationError::InvalidMonth { month: 13 })
    );
    assert_eq!(
        MonthlyPeriod::new(2024, 0),
        Err(ValidationError::InvalidMonth { month: 0 })
    );
}

#[test]
fn only_approved_rows_in_period_are_counted() {
    let period = MonthlyPeriod::new(2024, 6).expect("valid month");
    let trips = vec![
        trip(ApplicationStatus::Approved, (6, 10), (6, 12)),
        trip(ApplicationStatus::Pending, (6, 3), (6, 4)),
        trip(ApplicationStatus::Approved, (7, 1), (7, 2)),
    ];
    let expenses = vec![
        expense(ApplicationStatus::Approved, (6, 30), 4_200),
        expense(ApplicationStatus::Rejected, (6, 15), 9_999),
        expense(ApplicationStatus::Approved, (5, 31), 1_000),
    ];

    let totals = summarize(&period, &trips, &expenses).expect("sums fit");

    assert_eq!(
        totals,
        MonthlyTotals {
            business_trip_total: 37_000,
            expense_total: 4_200,
            grand_total: 41_200,
            business_trip_count: 1,
            expense_count: 1,
        }
    );
}

#[test]
fn trip_spanning_month_end_counts_in_both_months() {
    let trips = vec![trip(ApplicationStatus::Approved, (6, 29), (7, 2))];

    let june = summarize(&MonthlyPeriod::new(2024, 6).expect("valid"), &trips, &[]).expect("sums fit");
    let july = summarize(&MonthlyPeriod::new(2024, 7).expect("valid"), &trips, &[]).expect("sums fit");

    assert_eq!(june.business_trip_count, 1);
    assert_eq!(july.business_trip_count, 1);
}

#[test]
fn empty_month_is_all_zero() {
    let totals = summarize(&MonthlyPeriod::new(2024, 6).expect("valid"), &[], &[]).expect("sums fit");

    assert_eq!(totals, MonthlyTotals::default());
}

#[test]
fn totals_beyond_amount_range_are_refused() {
    let period = MonthlyPeriod::new(2024, 6).expect("valid month");
    let mut large = trip(ApplicationStatus::Approved, (6, 3), (6, 3));
    large.estimate.total = i64::MAX / 4;
    let trips = vec![large; 5];

    assert_eq!(
        summarize(&period, &trips, &[]),
        Err(ValidationError::AmountOutOfRange)
    );
}

#[test]
fn trip_and_expense_sums_overflowing_together_are_refused() {
    let period = MonthlyPeriod::new(2024, 6).expect("valid month");
    let mut large_trip = trip(ApplicationStatus::Approved, (6, 3), (6, 3));
    large_trip.estimate.total = i64::MAX - 1;
    let expenses = vec![expense(ApplicationStatus::Approved, (6, 5), 10)];

    assert_eq!(
        summarize(&period, &[large_trip], &expenses),
        Err(ValidationError::AmountOutOfRange)
    );
}
