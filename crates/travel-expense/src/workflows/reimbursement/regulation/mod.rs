//! Tier resolution and per-diem lookup against a company's travel regulation.
//!
//! Tier resolution is a substring heuristic over free-text job titles. It is a
//! best-effort mapping, not an authoritative classification: a title such as
//! "executive assistant" resolves to the executive tier.

mod rules;

use serde::{Deserialize, Serialize};

use super::domain::{Amount, RegulationId, RegulationStatus, Tier, TravelRegulation};

/// Domestic per-diem used when no active regulation exists.
pub const DEFAULT_DOMESTIC_ALLOWANCE: Amount = 5_000;
/// Overseas per-diem used when no active regulation exists.
pub const DEFAULT_OVERSEAS_ALLOWANCE: Amount = 7_500;

/// Per-diem pair for a resolved tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceRates {
    pub domestic: Amount,
    pub overseas: Amount,
}

impl AllowanceRates {
    pub const DEFAULT: Self = Self {
        domestic: DEFAULT_DOMESTIC_ALLOWANCE,
        overseas: DEFAULT_OVERSEAS_ALLOWANCE,
    };
}

/// Tier and rates resolved for a requester, with the regulation they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAllowance {
    pub tier: Tier,
    pub rates: AllowanceRates,
    pub regulation_id: Option<RegulationId>,
}

/// Map a free-text position to a tier. Missing positions are general staff.
pub fn resolve_tier(position: &str) -> Tier {
    rules::first_matching_tier(position)
}

/// Per-diem rates for `tier`.
///
/// Only an `active` regulation is consulted. A zero rate in the regulation is
/// treated as unset and falls back to the default for that column.
pub fn allowance_for(tier: Tier, regulation: Option<&TravelRegulation>) -> AllowanceRates {
    let Some(regulation) = regulation.filter(|r| r.status == RegulationStatus::Active) else {
        return AllowanceRates::DEFAULT;
    };

    AllowanceRates {
        domestic: or_default(
            regulation.domestic_allowance.rate(tier),
            DEFAULT_DOMESTIC_ALLOWANCE,
        ),
        overseas: or_default(
            regulation.overseas_allowance.rate(tier),
            DEFAULT_OVERSEAS_ALLOWANCE,
        ),
    }
}

/// Resolve both tier and rates for a position in one step.
pub fn resolve(position: Option<&str>, regulation: Option<&TravelRegulation>) -> ResolvedAllowance {
    let tier = position.map(resolve_tier).unwrap_or(Tier::General);
    let active = regulation.filter(|r| r.status == RegulationStatus::Active);
    ResolvedAllowance {
        tier,
        rates: allowance_for(tier, active),
        regulation_id: active.map(|r| r.id),
    }
}

fn or_default(rate: Amount, default: Amount) -> Amount {
    if rate == 0 {
        default
    } else {
        rate
    }
}
