use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use travel_expense::workflows::reimbursement::{
    MemoryStores, ReimbursementService, Role, UserId, UserProfile,
};

pub(crate) type Service = ReimbursementService<MemoryStores>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) service: Arc<Service>,
}

pub(crate) const DEMO_COMPANY: &str = "Demo Trading Co.";

/// Profiles served by the in-process directory until an identity provider is wired in.
pub(crate) fn demo_profiles() -> Vec<UserProfile> {
    let profile = |id: &str, name: &str, position: &str, role: Role| UserProfile {
        id: UserId(id.to_string()),
        full_name: Some(name.to_string()),
        company_name: Some(DEMO_COMPANY.to_string()),
        position: Some(position.to_string()),
        department: Some("Sales".to_string()),
        role,
    };

    vec![
        profile("u-staff", "Aiko Tanaka", "営業担当", Role::User),
        profile("u-manager", "Kenji Sato", "営業部長", Role::User),
        profile("u-director", "Yumi Kobayashi", "代表取締役", Role::User),
        profile("u-approver", "Hiroshi Ito", "経理 管理職", Role::Approver),
        profile("u-admin", "Mariko Suzuki", "総務", Role::Admin),
    ]
}
