//! Persistence and identity collaborators.
//!
//! The engine talks to a generic record store over calls that may fail or
//! stall. Each entity supplies its own patch type and filter semantics via
//! [`Record`], so one store implementation serves every table.

mod memory;
mod records;

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    ApplicationStatus, BusinessTripApplication, ExpenseApplication, ExpenseApplicationId,
    ExpenseItem, ItemsState, RegulationStatus, TravelRegulation, UserId, UserProfile,
};

pub use memory::{MemoryDirectory, MemoryStore, MemoryStores};
pub use records::{ExpensePatch, RegulationPatch, TripDetailsUpdate, TripPatch};

/// Error enumeration for store failures. Surfaced to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }
}

/// Filters understood by the core. Criteria that do not apply to an entity are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub user_id: Option<UserId>,
    pub status: Option<ApplicationStatus>,
    pub regulation_status: Option<RegulationStatus>,
    pub company_name: Option<String>,
    pub date_range: Option<DateRange>,
    pub expense_application_id: Option<ExpenseApplicationId>,
    pub items_state: Option<ItemsState>,
}

impl RecordFilter {
    pub fn owned_by(user_id: &UserId) -> Self {
        Self {
            user_id: Some(user_id.clone()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    CreatedDesc,
    CreatedAsc,
    /// Approver queues: oldest submission first, unsubmitted rows last.
    SubmittedAsc,
}

/// A row the store can hold.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Patch: Send + 'static;

    fn id(&self) -> &Self::Id;
    fn created_at(&self) -> DateTime<Utc>;
    fn submitted_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn matches(&self, filter: &RecordFilter) -> bool;
    /// Apply a partial update, refusing with `Conflict` when the patch's
    /// precondition no longer holds.
    fn apply(&mut self, patch: Self::Patch) -> Result<(), StoreError>;
}

/// Storage abstraction so the service can be exercised in isolation.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn list(&self, filter: &RecordFilter, order: RecordOrder) -> Result<Vec<R>, StoreError>;
    async fn get(&self, id: &R::Id) -> Result<Option<R>, StoreError>;
    async fn create(&self, record: R) -> Result<R, StoreError>;
    async fn update(&self, id: &R::Id, patch: R::Patch) -> Result<(), StoreError>;

    /// Multi-row insert. Not atomic unless the implementation says so.
    async fn create_many(&self, records: Vec<R>) -> Result<Vec<R>, StoreError> {
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            created.push(self.create(record).await?);
        }
        Ok(created)
    }
}

/// The four tables the engine reads and writes.
pub trait ReimbursementStore: Send + Sync + 'static {
    type Trips: RecordStore<BusinessTripApplication>;
    type Expenses: RecordStore<ExpenseApplication>;
    type Items: RecordStore<ExpenseItem>;
    type Regulations: RecordStore<TravelRegulation>;

    fn trips(&self) -> &Self::Trips;
    fn expenses(&self) -> &Self::Expenses;
    fn items(&self) -> &Self::Items;
    fn regulations(&self) -> &Self::Regulations;
}

/// Bundle of independent stores, one per table.
#[derive(Debug, Clone, Default)]
pub struct StoreBundle<T, E, I, G> {
    pub trips: T,
    pub expenses: E,
    pub items: I,
    pub regulations: G,
}

impl<T, E, I, G> ReimbursementStore for StoreBundle<T, E, I, G>
where
    T: RecordStore<BusinessTripApplication> + 'static,
    E: RecordStore<ExpenseApplication> + 'static,
    I: RecordStore<ExpenseItem> + 'static,
    G: RecordStore<TravelRegulation> + 'static,
{
    type Trips = T;
    type Expenses = E;
    type Items = I;
    type Regulations = G;

    fn trips(&self) -> &T {
        &self.trips
    }

    fn expenses(&self) -> &E {
        &self.expenses
    }

    fn items(&self) -> &I {
        &self.items
    }

    fn regulations(&self) -> &G {
        &self.regulations
    }
}

/// Identity collaborator: resolves the profile behind a user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;
}
