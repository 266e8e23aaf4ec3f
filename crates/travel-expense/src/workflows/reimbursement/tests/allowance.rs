use super::common::*;
use crate::workflows::reimbursement::allowance::{
    estimate, estimate_when_complete, trip_days, ACCOMMODATION_PER_NIGHT, TRANSPORTATION_PER_DAY,
};
use crate::workflows::reimbursement::error::ValidationError;
use crate::workflows::reimbursement::regulation::DEFAULT_DOMESTIC_ALLOWANCE;

#[test]
fn three_day_trip_at_default_rate_totals_37000() {
    let estimate = estimate(date(2024, 6, 10), date(2024, 6, 12), DEFAULT_DOMESTIC_ALLOWANCE)
        .expect("valid range");

    assert_eq!(estimate.daily_allowance, 15_000);
    assert_eq!(estimate.transportation, 6_000);
    assert_eq!(estimate.accommodation, 16_000);
    assert_eq!(estimate.total, 37_000);
}

#[test]
fn same_day_trip_has_no_accommodation() {
    let day = date(2024, 6, 10);
    let estimate = estimate(day, day, 6_000).expect("valid range");

    assert_eq!(trip_days(day, day), Ok(1));
    assert_eq!(estimate.accommodation, 0);
    assert_eq!(estimate.total, 6_000 + TRANSPORTATION_PER_DAY);
}

#[test]
fn total_is_sum_of_components_for_every_duration() {
    let start = date(2024, 2, 26);
    for offset in 0..10 {
        let end = start + chrono::Duration::days(offset);
        let days = offset + 1;
        let estimate = estimate(start, end, 9_000).expect("valid range");

        assert_eq!(estimate.daily_allowance, days * 9_000);
        assert_eq!(estimate.transportation, days * TRANSPORTATION_PER_DAY);
        assert_eq!(estimate.accommodation, (days - 1) * ACCOMMODATION_PER_NIGHT);
        assert_eq!(
            estimate.total,
            estimate.daily_allowance + estimate.transportation + estimate.accommodation
        );
    }
}

#[test]
fn end_before_start_is_rejected() {
    let start = date(2024, 6, 12);
    let end = date(2024, 6, 10);

    match estimate(start, end, 5_000) {
        Err(ValidationError::EndBeforeStart { start: s, end: e }) => {
            assert_eq!((s, e), (start, end));
        }
        other => panic!("expected end-before-start error, got {other:?}"),
    }
}

#[test]
fn estimate_is_idempotent() {
    let first = estimate(date(2024, 6, 10), date(2024, 6, 14), 12_000).expect("valid");
    let second = estimate(date(2024, 6, 10), date(2024, 6, 14), 12_000).expect("valid");

    assert_eq!(first, second);
}

#[test]
fn incomplete_dates_yield_no_estimate() {
    assert_eq!(
        estimate_when_complete(Some(date(2024, 6, 10)), None, 5_000),
        Ok(None)
    );
    assert_eq!(estimate_when_complete(None, None, 5_000), Ok(None));
    assert!(matches!(
        estimate_when_complete(Some(date(2024, 6, 10)), Some(date(2024, 6, 10)), 5_000),
        Ok(Some(_))
    ));
}

#[test]
fn overflowing_rate_is_reported_instead_of_wrapping() {
    let result = estimate(date(2024, 6, 10), date(2024, 6, 12), i64::MAX);

    assert_eq!(result, Err(ValidationError::AmountOutOfRange));
}

#[test]
fn estimate_serializes_with_estimated_prefix() {
    let estimate = estimate(date(2024, 6, 10), date(2024, 6, 12), 5_000).expect("valid");
    let value = serde_json::to_value(estimate).expect("serialize");

    assert_eq!(value["estimated_total"], 37_000);
    assert_eq!(value["estimated_daily_allowance"], 15_000);
    assert_eq!(value["estimated_transportation"], 6_000);
    assert_eq!(value["estimated_accommodation"], 16_000);
}

#[test]
fn negative_daily_rate_is_rejected() {
    assert_eq!(
        estimate(date(2024, 6, 10), date(2024, 6, 12), -10_000),
        Err(ValidationError::NegativeDailyRate(-10_000))
    );
    assert_eq!(
        estimate_when_complete(Some(date(2024, 6, 10)), Some(date(2024, 6, 10)), -1),
        Err(ValidationError::NegativeDailyRate(-1))
    );
}
