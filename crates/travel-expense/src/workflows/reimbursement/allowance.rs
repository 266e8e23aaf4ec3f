//! Estimated trip expenses derived from travel dates and a per-diem rate.
//!
//! `estimate` is a pure function. Callers recompute it whenever the dates or
//! the traveler's rate change instead of storing a derived value separately.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::Amount;
use super::error::ValidationError;

/// Flat transportation allowance per travel day.
pub const TRANSPORTATION_PER_DAY: Amount = 2_000;
/// Lodging allowance per night; a same-day trip bills no nights.
pub const ACCOMMODATION_PER_NIGHT: Amount = 8_000;

/// Estimated breakdown persisted alongside a business-trip application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EstimatedExpenses {
    #[serde(rename = "estimated_daily_allowance")]
    pub daily_allowance: Amount,
    #[serde(rename = "estimated_transportation")]
    pub transportation: Amount,
    #[serde(rename = "estimated_accommodation")]
    pub accommodation: Amount,
    #[serde(rename = "estimated_total")]
    pub total: Amount,
}

/// Inclusive number of travel days. A same-day trip is one day.
pub fn trip_days(start: NaiveDate, end: NaiveDate) -> Result<i64, ValidationError> {
    if end < start {
        return Err(ValidationError::EndBeforeStart { start, end });
    }
    Ok((end - start).num_days() + 1)
}

pub fn estimate(
    start: NaiveDate,
    end: NaiveDate,
    daily_rate: Amount,
) -> Result<EstimatedExpenses, ValidationError> {
    let days = trip_days(start, end)?;
    if daily_rate < 0 {
        return Err(ValidationError::NegativeDailyRate(daily_rate));
    }
    let nights = days - 1;

    let daily_allowance = days
        .checked_mul(daily_rate)
        .ok_or(ValidationError::AmountOutOfRange)?;
    let transportation = days
        .checked_mul(TRANSPORTATION_PER_DAY)
        .ok_or(ValidationError::AmountOutOfRange)?;
    let accommodation = nights
        .checked_mul(ACCOMMODATION_PER_NIGHT)
        .ok_or(ValidationError::AmountOutOfRange)?;
    let total = daily_allowance
        .checked_add(transportation)
        .and_then(|sum| sum.checked_add(accommodation))
        .ok_or(ValidationError::AmountOutOfRange)?;

    Ok(EstimatedExpenses {
        daily_allowance,
        transportation,
        accommodation,
        total,
    })
}

/// Estimate only once both dates are known. `Ok(None)` means "no estimate yet",
/// which is distinct from a zero estimate.
pub fn estimate_when_complete(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    daily_rate: Amount,
) -> Result<Option<EstimatedExpenses>, ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) => estimate(start, end, daily_rate).map(Some),
        _ => Ok(None),
    }
}
