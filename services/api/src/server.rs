use crate::cli::ServeArgs;
use crate::infra::{AppState, Platform};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rentwise::config::AppConfig;
use rentwise::error::AppError;
use rentwise::notifications::LogMailer;
use rentwise::telemetry;
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

    let mailer = Arc::new(LogMailer::new(config.leasing.mail_from.clone()));
    let platform = Platform::in_memory(&config, mailer);

    match config.reminders.interval() {
        Some(every) if !args.no_reminders => {
            platform.reminders.clone().spawn(every);
        }
        _ => info!("rent reminder loop disabled"),
    }

    let app = with_platform_routes(&platform)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rentwise api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
