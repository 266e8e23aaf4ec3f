use super::super::domain::Tier;

/// A tier outcome and the position markers that select it.
pub(crate) struct TierRule {
    pub tier: Tier,
    pub markers: &'static [&'static str],
}

/// Evaluated top to bottom; the first rule with a matching marker wins.
/// Anything unmatched is `Tier::General`.
pub(crate) const TIER_RULES: &[TierRule] = &[
    TierRule {
        tier: Tier::Executive,
        markers: &["役員", "代表", "executive", "officer"],
    },
    TierRule {
        tier: Tier::Manager,
        markers: &["部長", "管理", "manager", "management"],
    },
];

impl TierRule {
    /// `normalized` must already be lowercased.
    fn matches(&self, normalized: &str) -> bool {
        self.markers.iter().any(|marker| normalized.contains(marker))
    }
}

pub(crate) fn first_matching_tier(position: &str) -> Tier {
    let normalized = position.to_lowercase();
    TIER_RULES
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map(|rule| rule.tier)
        .unwrap_or(Tier::General)
}
