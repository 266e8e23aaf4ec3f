//! Business-trip and expense reimbursement workflow.
//!
//! Applications are drafted by their owner, submitted for approval, and then
//! approved, rejected, or returned for revision by an approver. Trip estimates
//! come from the traveler's position tier and the company's active travel
//! regulation.

pub mod allowance;
pub mod domain;
pub mod error;
pub mod expenses;
pub mod lifecycle;
pub mod regulation;
pub mod router;
pub mod service;
pub mod statistics;
pub mod store;

pub use allowance::EstimatedExpenses;
pub use domain::{
    Amount, ApplicationStatus, ApprovalTrail, BusinessTripApplication, BusinessTripId,
    ExpenseApplication, ExpenseApplicationId, ExpenseCategory, ExpenseItem, ExpenseItemDraft,
    RegulationDraft, RegulationId, RegulationStatus, Role, Tier, TierRates, TravelRegulation,
    TripDraft, UserId, UserProfile,
};
pub use error::{ReimbursementError, TransitionError, ValidationError};
pub use lifecycle::Transition;
pub use router::reimbursement_router;
pub use service::{ApplicationRef, ApprovalQueue, Clock, ReimbursementService, SystemClock};
pub use statistics::MonthlyTotals;
pub use store::{
    IdentityProvider, MemoryDirectory, MemoryStores, RecordStore, ReimbursementStore, StoreError,
};

#[cfg(test)]
mod tests;
