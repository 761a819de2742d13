use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryUserDirectory};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use volunteer_match::config::AppConfig;
use volunteer_match::error::AppError;
use volunteer_match::telemetry;
use volunteer_match::workflows::matching::{InMemoryStore, MatchingService};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(path) = args.store_path.take() {
        config.store.snapshot_path = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(InMemoryStore::open(&config.store)?);
    let directory = Arc::new(InMemoryUserDirectory::default());
    let matching = Arc::new(MatchingService::new(store.clone(), directory.clone()));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        directory,
        matching,
    };

    let app = with_matching_routes(&app_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        snapshot = ?store.snapshot_path(),
        max_attempts = config.store.max_attempts,
        "volunteer matching service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
