use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::allowance::{self, EstimatedExpenses};
use super::domain::{
    ApplicationStatus, ApprovalTrail, BusinessTripApplication, BusinessTripId, ExpenseApplication,
    ExpenseApplicationId, ExpenseItem, ExpenseItemDraft, ItemsState, RegulationDraft,
    RegulationId, RegulationStatus, Role, Tier, TierRates, TravelRegulation, TripDraft, UserId,
    UserProfile,
};
use super::error::{CreationPhase, ReimbursementError, TransitionError, ValidationError};
use super::expenses;
use super::lifecycle::{plan_transition, Transition};
use super::regulation::{self, ResolvedAllowance};
use super::statistics::{self, MonthlyPeriod, MonthlyTotals};
use super::store::{
    ExpensePatch, RecordFilter, RecordOrder, RecordStore, RegulationPatch, ReimbursementStore,
    StoreError, TripDetailsUpdate, TripPatch,
};
use crate::config::StoreConfig;

/// Source of "now" for lifecycle timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Application targeted by a lifecycle move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationRef {
    BusinessTrip(BusinessTripId),
    Expense(ExpenseApplicationId),
}

/// Pending applications awaiting a decision, oldest submission first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApprovalQueue {
    pub business_trips: Vec<BusinessTripApplication>,
    pub expenses: Vec<ExpenseApplication>,
}

/// Service composing the regulation resolver, allowance calculator, lifecycle
/// rules, and the record store.
pub struct ReimbursementService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl<S> ReimbursementService<S>
where
    S: ReimbursementStore,
{
    pub fn new(store: Arc<S>, config: StoreConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            store_timeout: config.timeout(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one store call under the configured deadline. Failures are logged
    /// and returned as-is; nothing is retried.
    async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let result = match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout_ms: self.store_timeout.as_millis(),
            }),
        };
        if let Err(error) = &result {
            warn!(operation, %error, "store call failed");
        }
        result
    }

    // --- regulations -------------------------------------------------------

    /// Active regulation for a company, if one exists.
    pub async fn active_regulation(
        &self,
        company_name: Option<&str>,
    ) -> Result<Option<TravelRegulation>, ReimbursementError> {
        let Some(company_name) = company_name.filter(|name| !name.trim().is_empty()) else {
            return Ok(None);
        };
        let filter = RecordFilter {
            company_name: Some(company_name.to_string()),
            regulation_status: Some(RegulationStatus::Active),
            ..RecordFilter::default()
        };
        let mut active = self
            .call(
                "regulations.list_active",
                self.store.regulations().list(&filter, RecordOrder::CreatedDesc),
            )
            .await?;
        if active.len() > 1 {
            warn!(
                company = company_name,
                count = active.len(),
                "more than one active regulation; using the newest"
            );
        }
        Ok(if active.is_empty() {
            None
        } else {
            Some(active.swap_remove(0))
        })
    }

    /// Tier and per-diem rates for the requester.
    pub async fn allowance_for(
        &self,
        profile: &UserProfile,
    ) -> Result<ResolvedAllowance, ReimbursementError> {
        let regulation = self
            .active_regulation(profile.company_name.as_deref())
            .await?;
        Ok(regulation::resolve(
            profile.position.as_deref(),
            regulation.as_ref(),
        ))
    }

    /// A company's regulations, newest first.
    pub async fn regulations(
        &self,
        company_name: &str,
    ) -> Result<Vec<TravelRegulation>, ReimbursementError> {
        let filter = RecordFilter {
            company_name: Some(company_name.to_string()),
            ..RecordFilter::default()
        };
        Ok(self
            .call(
                "regulations.list",
                self.store.regulations().list(&filter, RecordOrder::CreatedDesc),
            )
            .await?)
    }

    /// Record a new regulation version for the admin's company, in `draft`.
    pub async fn create_regulation(
        &self,
        actor: &UserProfile,
        draft: RegulationDraft,
    ) -> Result<TravelRegulation, ReimbursementError> {
        require_admin(actor)?;
        let company_name = actor
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::MissingField("company_name"))?;
        let version = draft.version.trim();
        if version.is_empty() {
            return Err(ValidationError::MissingField("version").into());
        }
        check_rates("domestic", &draft.domestic_allowance)?;
        check_rates("overseas", &draft.overseas_allowance)?;

        let now = self.clock.now();
        let regulation = TravelRegulation {
            id: RegulationId::generate(),
            company_id: actor.id.0.clone(),
            company_name: company_name.to_string(),
            version: version.to_string(),
            status: RegulationStatus::Draft,
            domestic_allowance: draft.domestic_allowance,
            overseas_allowance: draft.overseas_allowance,
            distance_threshold: draft.distance_threshold,
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .call(
                "regulations.create",
                self.store.regulations().create(regulation),
            )
            .await?;
        info!(regulation_id = %stored.id, company = %stored.company_name, version = %stored.version, "regulation drafted");
        Ok(stored)
    }

    /// Make a regulation the active one, archiving whichever was active before.
    pub async fn activate_regulation(
        &self,
        actor: &UserProfile,
        regulation_id: &RegulationId,
    ) -> Result<TravelRegulation, ReimbursementError> {
        require_admin(actor)?;
        let mut regulation = self
            .call(
                "regulations.get",
                self.store.regulations().get(regulation_id),
            )
            .await?
            .ok_or(StoreError::NotFound)?;
        if actor.company_name.as_deref() != Some(regulation.company_name.as_str()) {
            return Err(StoreError::NotFound.into());
        }
        if regulation.status == RegulationStatus::Active {
            return Ok(regulation);
        }

        let now = self.clock.now();
        if let Some(previous) = self
            .active_regulation(Some(&regulation.company_name))
            .await?
        {
            self.call(
                "regulations.archive",
                self.store.regulations().update(
                    &previous.id,
                    RegulationPatch {
                        expected_status: RegulationStatus::Active,
                        status: RegulationStatus::Archived,
                        updated_at: now,
                    },
                ),
            )
            .await?;
            info!(regulation_id = %previous.id, "regulation archived");
        }

        self.call(
            "regulations.activate",
            self.store.regulations().update(
                regulation_id,
                RegulationPatch {
                    expected_status: regulation.status,
                    status: RegulationStatus::Active,
                    updated_at: now,
                },
            ),
        )
        .await?;
        info!(regulation_id = %regulation.id, company = %regulation.company_name, "regulation activated");

        regulation.status = RegulationStatus::Active;
        regulation.updated_at = now;
        Ok(regulation)
    }

    // --- business trips ----------------------------------------------------

    /// Estimate for a trip form in progress. `None` until both dates are set.
    pub async fn preview_estimate(
        &self,
        profile: &UserProfile,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Option<EstimatedExpenses>, ReimbursementError> {
        if start_date.is_none() || end_date.is_none() {
            return Ok(None);
        }
        let allowance = self.allowance_for(profile).await?;
        Ok(allowance::estimate_when_complete(
            start_date,
            end_date,
            allowance.rates.domestic,
        )?)
    }

    pub async fn create_business_trip(
        &self,
        owner: &UserProfile,
        draft: TripDraft,
    ) -> Result<BusinessTripApplication, ReimbursementError> {
        let details = validate_trip(&draft)?;
        let allowance = self.allowance_for(owner).await?;
        let estimate = allowance::estimate(details.start, details.end, allowance.rates.domestic)?;

        let now = self.clock.now();
        let application = BusinessTripApplication {
            id: BusinessTripId::generate(),
            user_id: owner.id.clone(),
            title: details.title,
            purpose: draft.purpose.trim().to_string(),
            destination: draft.destination.trim().to_string(),
            start_date: details.start,
            end_date: details.end,
            estimate,
            approval: ApprovalTrail::draft(),
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .call("trips.create", self.store.trips().create(application))
            .await?;
        info!(
            application_id = %stored.id,
            user_id = %stored.user_id,
            tier = allowance.tier.label(),
            total = stored.estimate.total,
            "business trip drafted"
        );
        Ok(stored)
    }

    /// Owner edit while `draft` or `returned`. The estimate is recomputed from
    /// the new dates and the owner's current rate.
    pub async fn update_business_trip(
        &self,
        owner: &UserProfile,
        id: &BusinessTripId,
        draft: TripDraft,
    ) -> Result<BusinessTripApplication, ReimbursementError> {
        let details = validate_trip(&draft)?;
        let mut application = self.business_trip(id).await?;
        if application.user_id != owner.id {
            return Err(TransitionError::NotEditor.into());
        }
        if !application.approval.status.is_owner_editable() {
            return Err(TransitionError::NotEditable {
                current: application.approval.status,
            }
            .into());
        }

        let allowance = self.allowance_for(owner).await?;
        let estimate = allowance::estimate(details.start, details.end, allowance.rates.domestic)?;
        let update = TripDetailsUpdate {
            expected_status: application.approval.status,
            title: details.title,
            purpose: draft.purpose.trim().to_string(),
            destination: draft.destination.trim().to_string(),
            start_date: details.start,
            end_date: details.end,
            estimate,
            updated_at: self.clock.now(),
        };

        self.call(
            "trips.update_details",
            self.store
                .trips()
                .update(id, TripPatch::Details(update.clone())),
        )
        .await?;

        application.title = update.title;
        application.purpose = update.purpose;
        application.destination = update.destination;
        application.start_date = update.start_date;
        application.end_date = update.end_date;
        application.estimate = update.estimate;
        application.updated_at = update.updated_at;
        info!(application_id = %id, total = estimate.total, "business trip updated");
        Ok(application)
    }

    pub async fn business_trip(
        &self,
        id: &BusinessTripId,
    ) -> Result<BusinessTripApplication, ReimbursementError> {
        Ok(self
            .call("trips.get", self.store.trips().get(id))
            .await?
            .ok_or(StoreError::NotFound)?)
    }

    /// The user's trips, newest first.
    pub async fn business_trips(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<BusinessTripApplication>, ReimbursementError> {
        Ok(self
            .call(
                "trips.list",
                self.store
                    .trips()
                    .list(&RecordFilter::owned_by(user_id), RecordOrder::CreatedDesc),
            )
            .await?)
    }

    // --- expenses ----------------------------------------------------------

    /// Create an expense application and its items.
    ///
    /// The application row is written first with its items marked pending,
    /// then the item rows, then the marker is cleared. A failure after the
    /// first write is reported as `PartialCreation`.
    pub async fn create_expense_application(
        &self,
        owner: &UserProfile,
        title: &str,
        items: Vec<ExpenseItemDraft>,
    ) -> Result<ExpenseApplication, ReimbursementError> {
        let bundle = expenses::assemble(&owner.id, title, items, self.clock.now())?;
        let application_id = bundle.application.id;

        let mut application = self
            .call(
                "expenses.create",
                self.store.expenses().create(bundle.application),
            )
            .await?;

        let item_count = bundle.items.len();
        if let Err(source) = self
            .call(
                "expense_items.create_many",
                self.store.items().create_many(bundle.items),
            )
            .await
        {
            return Err(partial_creation(
                application_id,
                CreationPhase::InsertItems,
                source,
            ));
        }

        let confirmed_at = self.clock.now();
        if let Err(source) = self
            .call(
                "expenses.confirm_items",
                self.store.expenses().update(
                    &application_id,
                    ExpensePatch::ItemsAttached {
                        updated_at: confirmed_at,
                    },
                ),
            )
            .await
        {
            return Err(partial_creation(
                application_id,
                CreationPhase::ConfirmItems,
                source,
            ));
        }

        application.items_state = ItemsState::Attached;
        application.updated_at = confirmed_at;
        info!(
            application_id = %application_id,
            user_id = %application.user_id,
            items = item_count,
            total = application.total_amount,
            "expense application drafted"
        );
        Ok(application)
    }

    pub async fn expense_application(
        &self,
        id: &ExpenseApplicationId,
    ) -> Result<ExpenseApplication, ReimbursementError> {
        Ok(self
            .call("expenses.get", self.store.expenses().get(id))
            .await?
            .ok_or(StoreError::NotFound)?)
    }

    /// The user's expense applications, newest first.
    pub async fn expense_applications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ExpenseApplication>, ReimbursementError> {
        Ok(self
            .call(
                "expenses.list",
                self.store
                    .expenses()
                    .list(&RecordFilter::owned_by(user_id), RecordOrder::CreatedDesc),
            )
            .await?)
    }

    /// Items of one application in the order they were written.
    pub async fn expense_items(
        &self,
        application_id: &ExpenseApplicationId,
    ) -> Result<Vec<ExpenseItem>, ReimbursementError> {
        let filter = RecordFilter {
            expense_application_id: Some(*application_id),
            ..RecordFilter::default()
        };
        Ok(self
            .call(
                "expense_items.list",
                self.store.items().list(&filter, RecordOrder::CreatedAsc),
            )
            .await?)
    }

    /// Applications whose item rows were never confirmed.
    pub async fn incomplete_expense_applications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ExpenseApplication>, ReimbursementError> {
        let filter = RecordFilter {
            items_state: Some(ItemsState::PendingItems),
            ..RecordFilter::owned_by(user_id)
        };
        Ok(self
            .call(
                "expenses.list_incomplete",
                self.store.expenses().list(&filter, RecordOrder::CreatedAsc),
            )
            .await?)
    }

    // --- lifecycle ---------------------------------------------------------

    pub async fn submit(
        &self,
        actor: &UserProfile,
        application: ApplicationRef,
    ) -> Result<ApprovalTrail, ReimbursementError> {
        self.transition(actor, application, Transition::Submit, None)
            .await
    }

    pub async fn approve(
        &self,
        actor: &UserProfile,
        application: ApplicationRef,
        comment: Option<String>,
    ) -> Result<ApprovalTrail, ReimbursementError> {
        self.transition(actor, application, Transition::Approve, comment)
            .await
    }

    pub async fn reject(
        &self,
        actor: &UserProfile,
        application: ApplicationRef,
        comment: Option<String>,
    ) -> Result<ApprovalTrail, ReimbursementError> {
        self.transition(actor, application, Transition::Reject, comment)
            .await
    }

    pub async fn return_for_revision(
        &self,
        actor: &UserProfile,
        application: ApplicationRef,
        comment: Option<String>,
    ) -> Result<ApprovalTrail, ReimbursementError> {
        self.transition(actor, application, Transition::Return, comment)
            .await
    }

    /// Apply a lifecycle move and persist it with a status precondition.
    pub async fn transition(
        &self,
        actor: &UserProfile,
        application: ApplicationRef,
        transition: Transition,
        comment: Option<String>,
    ) -> Result<ApprovalTrail, ReimbursementError> {
        let now = self.clock.now();
        let trail = match application {
            ApplicationRef::BusinessTrip(id) => {
                let record = self.business_trip(&id).await?;
                let update = plan_transition(
                    &record.approval,
                    &record.user_id,
                    actor,
                    transition,
                    comment,
                    now,
                )?;
                let trail = update.trail.clone();
                self.call(
                    "trips.update_approval",
                    self.store.trips().update(&id, TripPatch::Approval(update)),
                )
                .await?;
                info!(application_id = %id, kind = "business_trip", %transition, status = %trail.status, actor = %actor.id, "application transitioned");
                trail
            }
            ApplicationRef::Expense(id) => {
                let record = self.expense_application(&id).await?;
                let update = plan_transition(
                    &record.approval,
                    &record.user_id,
                    actor,
                    transition,
                    comment,
                    now,
                )?;
                if transition == Transition::Submit && record.items_state != ItemsState::Attached {
                    return Err(ValidationError::ItemsNotAttached(id).into());
                }
                let trail = update.trail.clone();
                self.call(
                    "expenses.update_approval",
                    self.store.expenses().update(&id, ExpensePatch::Approval(update)),
                )
                .await?;
                info!(application_id = %id, kind = "expense", %transition, status = %trail.status, actor = %actor.id, "application transitioned");
                trail
            }
        };
        Ok(trail)
    }

    /// Pending work for an approver, oldest submission first.
    pub async fn pending_approvals(
        &self,
        actor: &UserProfile,
    ) -> Result<ApprovalQueue, ReimbursementError> {
        if !actor.role.can_decide() {
            return Err(TransitionError::RoleNotPermitted {
                role: actor.role,
                attempted: Transition::Approve,
            }
            .into());
        }
        let filter = RecordFilter::default().with_status(ApplicationStatus::Pending);
        let business_trips = self
            .call(
                "trips.list_pending",
                self.store.trips().list(&filter, RecordOrder::SubmittedAsc),
            )
            .await?;
        let expenses = self
            .call(
                "expenses.list_pending",
                self.store.expenses().list(&filter, RecordOrder::SubmittedAsc),
            )
            .await?;
        Ok(ApprovalQueue {
            business_trips,
            expenses,
        })
    }

    // --- statistics --------------------------------------------------------

    pub async fn monthly_totals(
        &self,
        user_id: &UserId,
        year: i32,
        month: u32,
    ) -> Result<MonthlyTotals, ReimbursementError> {
        let period = MonthlyPeriod::new(year, month)?;
        let filter = RecordFilter::owned_by(user_id)
            .with_status(ApplicationStatus::Approved)
            .within(period.range);

        let trips = self
            .call(
                "trips.list_approved",
                self.store.trips().list(&filter, RecordOrder::CreatedAsc),
            )
            .await?;
        let expenses = self
            .call(
                "expenses.list_approved",
                self.store.expenses().list(&filter, RecordOrder::CreatedAsc),
            )
            .await?;

        Ok(statistics::summarize(&period, &trips, &expenses)?)
    }
}

struct ValidTrip {
    title: String,
    start: NaiveDate,
    end: NaiveDate,
}

fn validate_trip(draft: &TripDraft) -> Result<ValidTrip, ValidationError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    let start = draft
        .start_date
        .ok_or(ValidationError::MissingField("start_date"))?;
    let end = draft
        .end_date
        .ok_or(ValidationError::MissingField("end_date"))?;
    allowance::trip_days(start, end)?;

    Ok(ValidTrip {
        title: title.to_string(),
        start,
        end,
    })
}

fn require_admin(actor: &UserProfile) -> Result<(), TransitionError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(TransitionError::NotAdmin { role: actor.role })
    }
}

fn check_rates(scope: &'static str, rates: &TierRates) -> Result<(), ValidationError> {
    for tier in [Tier::Executive, Tier::Manager, Tier::General] {
        let rate = rates.rate(tier);
        if rate < 0 {
            return Err(ValidationError::NegativeRate { scope, tier, rate });
        }
    }
    Ok(())
}

fn partial_creation(
    application_id: ExpenseApplicationId,
    phase: CreationPhase,
    source: StoreError,
) -> ReimbursementError {
    warn!(
        application_id = %application_id,
        phase = phase.label(),
        error = %source,
        "expense application left without confirmed items"
    );
    ReimbursementError::PartialCreation {
        application_id,
        phase,
        source,
    }
}
