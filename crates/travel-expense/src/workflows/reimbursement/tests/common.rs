use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::StoreConfig;
use crate::workflows::reimbursement::domain::{
    BusinessTripApplication, ExpenseApplication, ExpenseCategory, ExpenseItem, ExpenseItemDraft,
    ExpenseItemId, RegulationId, RegulationStatus, Role, TierRates, TravelRegulation, TripDraft,
    UserId, UserProfile,
};
use crate::workflows::reimbursement::reimbursement_router;
use crate::workflows::reimbursement::service::{Clock, ReimbursementService};
use crate::workflows::reimbursement::store::{
    MemoryDirectory, MemoryStore, MemoryStores, RecordFilter, RecordOrder, RecordStore,
    RegulationPatch, ReimbursementStore, StoreBundle, StoreError,
};

pub(super) const COMPANY: &str = "Kitakaze Trading";
pub(super) const OTHER_COMPANY: &str = "Minami Logistics";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Clock that starts at a fixed instant and moves one minute per reading, so
/// creation and submission order is deterministic.
pub(super) struct SteppingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl SteppingClock {
    pub(super) fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + chrono::Duration::minutes(tick)
    }
}

/// Member of a second company sharing the same deployment.
pub(super) fn outside_employee() -> UserProfile {
    UserProfile {
        company_name: Some(OTHER_COMPANY.to_string()),
        ..profile("ext-1", Some("Driver"), Role::User)
    }
}

pub(super) fn outside_approver() -> UserProfile {
    UserProfile {
        company_name: Some(OTHER_COMPANY.to_string()),
        ..profile("ext-appr", Some("Controller"), Role::Approver)
    }
}

fn profile(id: &str, position: Option<&str>, role: Role) -> UserProfile {
    UserProfile {
        id: UserId(id.to_string()),
        full_name: Some(format!("{id} test")),
        company_name: Some(COMPANY.to_string()),
        position: position.map(str::to_string),
        department: Some("Sales".to_string()),
        role,
    }
}

pub(super) fn employee() -> UserProfile {
    profile("emp-1", Some("Sales Associate"), Role::User)
}

pub(super) fn colleague() -> UserProfile {
    profile("emp-2", None, Role::User)
}

pub(super) fn department_head() -> UserProfile {
    profile("mgr-1", Some("営業部長"), Role::User)
}

pub(super) fn director() -> UserProfile {
    profile("exec-1", Some("代表取締役"), Role::User)
}

pub(super) fn approver() -> UserProfile {
    profile("appr-1", Some("Finance Manager"), Role::Approver)
}

pub(super) fn admin() -> UserProfile {
    profile("admin-1", Some("Office Administrator"), Role::Admin)
}

pub(super) fn regulation(status: RegulationStatus) -> TravelRegulation {
    TravelRegulation {
        id: RegulationId::generate(),
        company_id: "admin-1".to_string(),
        company_name: COMPANY.to_string(),
        version: "2024.1".to_string(),
        status,
        domestic_allowance: TierRates {
            executive: 12_000,
            manager: 9_000,
            general: 6_000,
        },
        overseas_allowance: TierRates {
            executive: 20_000,
            manager: 15_000,
            general: 10_000,
        },
        distance_threshold: 100,
        created_by: UserId("admin-1".to_string()),
        created_at: at(2024, 1, 1),
        updated_at: at(2024, 1, 1),
    }
}

/// 2024-06-10 to 2024-06-12.
pub(super) fn june_trip() -> TripDraft {
    TripDraft {
        title: "Osaka client visit".to_string(),
        purpose: "Quarterly review".to_string(),
        destination: "Osaka".to_string(),
        start_date: Some(date(2024, 6, 10)),
        end_date: Some(date(2024, 6, 12)),
    }
}

pub(super) fn item(category: ExpenseCategory, day: u32, amount: i64) -> ExpenseItemDraft {
    ExpenseItemDraft {
        category,
        date: date(2024, 6, day),
        amount,
        description: format!("{category:?} on day {day}"),
        receipt_url: None,
        ocr_data: None,
    }
}

pub(super) fn receipt_items() -> Vec<ExpenseItemDraft> {
    vec![
        item(ExpenseCategory::Transportation, 10, 14_720),
        item(ExpenseCategory::Lodging, 10, 9_800),
        item(ExpenseCategory::Miscellaneous, 11, 480),
    ]
}

pub(super) type TestService<S> = Arc<ReimbursementService<S>>;

pub(super) fn build_service() -> (TestService<MemoryStores>, Arc<MemoryStores>) {
    let stores = Arc::new(MemoryStores::default());
    let service = service_over(stores.clone(), StoreConfig::default());
    (service, stores)
}

pub(super) fn service_over<S>(stores: Arc<S>, config: StoreConfig) -> TestService<S>
where
    S: ReimbursementStore,
{
    Arc::new(ReimbursementService::with_clock(
        stores,
        config,
        Arc::new(SteppingClock::starting_at(at(2024, 6, 1))),
    ))
}

pub(super) fn directory() -> Arc<MemoryDirectory> {
    Arc::new(MemoryDirectory::with_profiles([
        employee(),
        colleague(),
        department_head(),
        director(),
        approver(),
        admin(),
        outside_employee(),
        outside_approver(),
    ]))
}

pub(super) fn router_with<S>(service: TestService<S>) -> Router
where
    S: ReimbursementStore,
{
    reimbursement_router(service, directory())
}

/// Item store that is down for every call.
#[derive(Debug, Default, Clone)]
pub(super) struct UnavailableItems;

#[async_trait]
impl RecordStore<ExpenseItem> for UnavailableItems {
    async fn list(
        &self,
        _filter: &RecordFilter,
        _order: RecordOrder,
    ) -> Result<Vec<ExpenseItem>, StoreError> {
        Err(StoreError::Unavailable("items table offline".to_string()))
    }

    async fn get(
        &self,
        _id: &ExpenseItemId,
    ) -> Result<Option<ExpenseItem>, StoreError> {
        Err(StoreError::Unavailable("items table offline".to_string()))
    }

    async fn create(&self, _record: ExpenseItem) -> Result<ExpenseItem, StoreError> {
        Err(StoreError::Unavailable("items table offline".to_string()))
    }

    async fn update(
        &self,
        _id: &ExpenseItemId,
        patch: std::convert::Infallible,
    ) -> Result<(), StoreError> {
        match patch {}
    }
}

pub(super) type ItemsOfflineStores = StoreBundle<
    MemoryStore<BusinessTripApplication>,
    MemoryStore<ExpenseApplication>,
    UnavailableItems,
    MemoryStore<TravelRegulation>,
>;

/// Regulation store that answers only after `delay`.
#[derive(Debug, Clone)]
pub(super) struct SlowRegulations {
    pub(super) delay: Duration,
}

impl Default for SlowRegulations {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(200),
        }
    }
}

#[async_trait]
impl RecordStore<TravelRegulation> for SlowRegulations {
    async fn list(
        &self,
        _filter: &RecordFilter,
        _order: RecordOrder,
    ) -> Result<Vec<TravelRegulation>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn get(&self, _id: &RegulationId) -> Result<Option<TravelRegulation>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn create(&self, record: TravelRegulation) -> Result<TravelRegulation, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(record)
    }

    async fn update(
        &self,
        _id: &RegulationId,
        _patch: RegulationPatch,
    ) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

pub(super) type SlowRegulationStores = StoreBundle<
    MemoryStore<BusinessTripApplication>,
    MemoryStore<ExpenseApplication>,
    MemoryStore<ExpenseItem>,
    SlowRegulations,
>;

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "unexpected status for response"
    );
}
