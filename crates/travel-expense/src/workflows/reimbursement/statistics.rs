//! Monthly totals over approved applications.
//!
//! Trips are dated by their travel period (any overlap with the month counts);
//! expenses are dated by the day the application was filed.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{Amount, ApplicationStatus, BusinessTripApplication, ExpenseApplication};
use super::error::ValidationError;
use super::store::DateRange;

/// A calendar month with real boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyPeriod {
    pub year: i32,
    pub month: u32,
    pub range: DateRange,
}

impl MonthlyPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth { month });
        }
        let start =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(ValidationError::InvalidYear { year })?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(ValidationError::InvalidYear { year })?;

        Ok(Self {
            year,
            month,
            range: DateRange { start, end },
        })
    }

    pub fn days(&self) -> u32 {
        self.range.end.day()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub business_trip_total: Amount,
    pub expense_total: Amount,
    pub grand_total: Amount,
    pub business_trip_count: usize,
    pub expense_count: usize,
}

/// Aggregate approved rows that fall in `period`. Other rows are ignored, so
/// callers may pass a superset. Sums that leave the `Amount` range are refused.
pub fn summarize(
    period: &MonthlyPeriod,
    trips: &[BusinessTripApplication],
    expenses: &[ExpenseApplication],
) -> Result<MonthlyTotals, ValidationError> {
    let (business_trip_count, business_trip_total) = sum_amounts(
        trips
            .iter()
            .filter(|trip| trip.approval.status == ApplicationStatus::Approved)
            .filter(|trip| period.range.overlaps(trip.start_date, trip.end_date))
            .map(|trip| trip.estimate.total),
    )?;

    let (expense_count, expense_total) = sum_amounts(
        expenses
            .iter()
            .filter(|expense| expense.approval.status == ApplicationStatus::Approved)
            .filter(|expense| period.range.contains(expense.created_at.date_naive()))
            .map(|expense| expense.total_amount),
    )?;

    let grand_total = business_trip_total
        .checked_add(expense_total)
        .ok_or(ValidationError::AmountOutOfRange)?;

    Ok(MonthlyTotals {
        business_trip_total,
        expense_total,
        grand_total,
        business_trip_count,
        expense_count,
    })
}

fn sum_amounts(mut amounts: impl Iterator<Item = Amount>) -> Result<(usize, Amount), ValidationError> {
    amounts.try_fold((0, 0), |(count, total): (usize, Amount), amount| {
        total
            .checked_add(amount)
            .map(|total| (count + 1, total))
            .ok_or(ValidationError::AmountOutOfRange)
    })
}
