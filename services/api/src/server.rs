use crate::cli::ServeArgs;
use crate::infra::{ApiContext, AppState, InMemoryDirectory, InMemoryFleetStore};
use crate::routes::api_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cartrack::accounts::AccountService;
use cartrack::config::AppConfig;
use cartrack::error::AppError;
use cartrack::fleet::FleetService;
use cartrack::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = Arc::new(InMemoryDirectory::default());
    let fleet_store = Arc::new(InMemoryFleetStore::default());
    let context = Arc::new(ApiContext {
        accounts: AccountService::new(directory, config.auth.token_ttl_minutes),
        fleet: FleetService::new(fleet_store),
    });

    let app = api_router(context)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vehicle compliance tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
