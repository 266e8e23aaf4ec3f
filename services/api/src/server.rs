use crate::cli::ServeArgs;
use crate::infra::{demo_profiles, AppState, Service};
use crate::routes::with_reimbursement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use travel_expense::config::AppConfig;
use travel_expense::error::AppError;
use travel_expense::telemetry;
use travel_expense::workflows::reimbursement::{MemoryDirectory, MemoryStores};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let stores = Arc::new(MemoryStores::default());
    let service = Arc::new(Service::new(stores, config.store));
    let profiles = demo_profiles();
    let profile_count = profiles.len();
    let directory = Arc::new(MemoryDirectory::with_profiles(profiles));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        service: service.clone(),
    };

    let app = with_reimbursement_routes(service, directory)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        store_timeout_ms = config.store.timeout_ms,
        profiles = profile_count,
        "travel expense service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
