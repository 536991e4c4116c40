use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryJobBoardRepository};
use crate::routes::{with_operational_routes, JobBoardState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jobwire::config::AppConfig;
use jobwire::error::AppError;
use jobwire::jobs::import::BulkJobImporter;
use jobwire::telemetry;
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

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryJobBoardRepository::default());
    let importer = BulkJobImporter::new(repository.clone(), config.import.temp_dir.clone());
    let board_state = JobBoardState {
        repository,
        importer,
        max_upload_bytes: config.import.max_upload_bytes,
    };

    let app = with_operational_routes(board_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job board service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
