use crate::infra::StatusState;
use crate::routes::status_router;
use axum_prometheus::PrometheusMetricLayer;
use citation_core::config::AppConfig;
use citation_core::error::AppError;
use tracing::info;

/// Binds the status service and serves until the process exits. Telemetry must
/// already be initialized by the caller.
pub async fn serve(config: &AppConfig) -> Result<(), AppError> {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let state = StatusState::from_config(prometheus_handle, config);

    let app = status_router(state.clone()).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    state.mark_ready();

    info!(
        ?config.environment,
        %addr,
        progress = %config.storage.progress_path.display(),
        "citation status service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
