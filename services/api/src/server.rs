use crate::cli::ServeArgs;
use crate::infra::{build_scheduler, AppState};
use crate::routes::with_scheduler_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use interview_scheduler::config::AppConfig;
use interview_scheduler::error::AppError;
use interview_scheduler::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let settings = config.scheduler.settings();
    let scheduler = build_scheduler(settings.clone(), args.calendar_csv.as_deref())?;

    let app = with_scheduler_routes(scheduler)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        buffer_minutes = settings.buffer_minutes,
        max_daily_interviews = settings.max_daily_interviews,
        "interview scheduler ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
