use crate::cli::ServeArgs;
use crate::infra::{build_runtime, load_roster, AppState};
use crate::routes::with_draw_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use room_draw::config::AppConfig;
use room_draw::error::AppError;
use room_draw::telemetry;
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

    let snapshot = load_roster(&config.draw)?;
    let runtime = build_runtime(snapshot, &config.draw.notify_sender)?;

    let app = with_draw_routes(runtime.service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "room draw service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
