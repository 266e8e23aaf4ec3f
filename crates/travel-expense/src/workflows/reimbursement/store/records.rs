use std::convert::Infallible;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::super::allowance::EstimatedExpenses;
use super::super::domain::{
    ApplicationStatus, BusinessTripApplication, BusinessTripId, ExpenseApplication,
    ExpenseApplicationId, ExpenseItem, ExpenseItemId, ItemsState, RegulationId, RegulationStatus,
    TravelRegulation,
};
use super::super::lifecycle::ApprovalUpdate;
use super::{Record, RecordFilter, StoreError};

/// Owner edit of a trip. Dates and estimate always travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripDetailsUpdate {
    pub expected_status: ApplicationStatus,
    pub title: String,
    pub purpose: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub estimate: EstimatedExpenses,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripPatch {
    Approval(ApprovalUpdate),
    Details(TripDetailsUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpensePatch {
    Approval(ApprovalUpdate),
    ItemsAttached { updated_at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegulationPatch {
    pub expected_status: RegulationStatus,
    pub status: RegulationStatus,
    pub updated_at: DateTime<Utc>,
}

fn ensure_status<S: PartialEq>(current: S, expected: S) -> Result<(), StoreError> {
    if current == expected {
        Ok(())
    } else {
        Err(StoreError::Conflict)
    }
}

impl Record for BusinessTripApplication {
    type Id = BusinessTripId;
    type Patch = TripPatch;

    fn id(&self) -> &BusinessTripId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.approval.submitted_at
    }

    fn matches(&self, filter: &RecordFilter) -> bool {
        filter.user_id.as_ref().map_or(true, |id| *id == self.user_id)
            && filter.status.map_or(true, |s| s == self.approval.status)
            && filter
                .date_range
                .map_or(true, |range| range.overlaps(self.start_date, self.end_date))
    }

    fn apply(&mut self, patch: TripPatch) -> Result<(), StoreError> {
        match patch {
            TripPatch::Approval(update) => {
                ensure_status(self.approval.status, update.expected_status)?;
                self.approval = update.trail;
                self.updated_at = update.updated_at;
            }
            TripPatch::Details(update) => {
                ensure_status(self.approval.status, update.expected_status)?;
                self.title = update.title;
                self.purpose = update.purpose;
                self.destination = update.destination;
                self.start_date = update.start_date;
                self.end_date = update.end_date;
                self.estimate = update.estimate;
                self.updated_at = update.updated_at;
            }
        }
        Ok(())
    }
}

impl Record for ExpenseApplication {
    type Id = ExpenseApplicationId;
    type Patch = ExpensePatch;

    fn id(&self) -> &ExpenseApplicationId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.approval.submitted_at
    }

    fn matches(&self, filter: &RecordFilter) -> bool {
        filter.user_id.as_ref().map_or(true, |id| *id == self.user_id)
            && filter.status.map_or(true, |s| s == self.approval.status)
            && filter.items_state.map_or(true, |s| s == self.items_state)
            && filter
                .date_range
                .map_or(true, |range| range.contains(self.created_at.date_naive()))
    }

    fn apply(&mut self, patch: ExpensePatch) -> Result<(), StoreError> {
        match patch {
            ExpensePatch::Approval(update) => {
                ensure_status(self.approval.status, update.expected_status)?;
                self.approval = update.trail;
                self.updated_at = update.updated_at;
            }
            ExpensePatch::ItemsAttached { updated_at } => {
                self.items_state = ItemsState::Attached;
                self.updated_at = updated_at;
            }
        }
        Ok(())
    }
}

/// Items are immutable once written.
impl Record for ExpenseItem {
    type Id = ExpenseItemId;
    type Patch = Infallible;

    fn id(&self) -> &ExpenseItemId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn matches(&self, filter: &RecordFilter) -> bool {
        filter
            .expense_application_id
            .map_or(true, |id| id == self.expense_application_id)
            && filter
                .date_range
                .map_or(true, |range| range.contains(self.date))
    }

    fn apply(&mut self, patch: Infallible) -> Result<(), StoreError> {
        match patch {}
    }
}

impl Record for TravelRegulation {
    type Id = RegulationId;
    type Patch = RegulationPatch;

    fn id(&self) -> &RegulationId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn matches(&self, filter: &RecordFilter) -> bool {
        filter
            .company_name
            .as_deref()
            .map_or(true, |name| name == self.company_name)
            && filter
                .regulation_status
                .map_or(true, |s| s == self.status)
    }

    fn apply(&mut self, patch: RegulationPatch) -> Result<(), StoreError> {
        ensure_status(self.status, patch.expected_status)?;
        self.status = patch.status;
        self.updated_at = patch.updated_at;
        Ok(())
    }
}
