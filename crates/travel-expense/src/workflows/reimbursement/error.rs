use chrono::NaiveDate;

use super::domain::{Amount, ApplicationStatus, ExpenseApplicationId, Role, Tier};
use super::lifecycle::Transition;
use super::store::StoreError;

/// Input rejected before any store call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("expense item {index} has negative amount {amount}")]
    NegativeAmount { index: usize, amount: Amount },
    #[error("{scope} allowance for the {} tier is negative ({rate})", .tier.label())]
    NegativeRate {
        scope: &'static str,
        tier: Tier,
        rate: Amount,
    },
    #[error("daily rate {0} is negative")]
    NegativeDailyRate(Amount),
    #[error("an expense application needs at least one item")]
    NoItems,
    #[error("a rejection requires an approval comment")]
    MissingRejectionComment,
    #[error("expense application {0} has no confirmed items and cannot be submitted")]
    ItemsNotAttached(ExpenseApplicationId),
    #[error("month {month} is outside 1..=12")]
    InvalidMonth { month: u32 },
    #[error("year {year} cannot be represented as a calendar date")]
    InvalidYear { year: i32 },
    #[error("computed amount exceeds the representable range")]
    AmountOutOfRange,
}

/// Lifecycle move refused by the state machine or by actor checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {attempted} an application in state '{current}'")]
    InvalidState {
        current: ApplicationStatus,
        attempted: Transition,
    },
    #[error("role '{}' may not {attempted} applications", .role.label())]
    RoleNotPermitted { role: Role, attempted: Transition },
    #[error("only the owner may {attempted} this application")]
    NotOwner { attempted: Transition },
    #[error("cannot edit an application in state '{current}'")]
    NotEditable { current: ApplicationStatus },
    #[error("only the owner may edit this application")]
    NotEditor,
    #[error("role '{}' may not manage travel regulations", .role.label())]
    NotAdmin { role: Role },
}

/// Step of the two-phase expense creation that failed after the application row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPhase {
    InsertItems,
    ConfirmItems,
}

impl CreationPhase {
    pub const fn label(self) -> &'static str {
        match self {
            CreationPhase::InsertItems => "insert items",
            CreationPhase::ConfirmItems => "confirm items",
        }
    }
}

/// Error raised by the reimbursement service.
#[derive(Debug, thiserror::Error)]
pub enum ReimbursementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(
        "expense application {application_id} was created but the '{}' step failed: {source}",
        .phase.label()
    )]
    PartialCreation {
        application_id: ExpenseApplicationId,
        phase: CreationPhase,
        source: StoreError,
    },
}
