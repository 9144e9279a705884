use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info, warn};
use wallet_console::api::{self, ConsoleState};
use wallet_console::config::AppConfig;
use wallet_console::finance::HttpFinanceBackend;
use wallet_console::health::{HealthChecker, HealthState, HealthStatus};
use wallet_console::logging::{init_tracing, mask_secret};
use wallet_console::middleware::logging::{request_logging_middleware, UuidRequestId};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate().map_err(|e| {
        error!("❌ Invalid configuration: {}", e);
        e
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting wallet console"
    );

    info!(
        base_url = %config.backend.base_url,
        api_token = %config.backend.api_token.as_deref().map(mask_secret).unwrap_or_else(|| "none".to_string()),
        timeout_secs = config.backend.timeout_secs,
        max_retries = config.backend.max_retries,
        "💳 Finance API configuration loaded"
    );

    let backend = HttpFinanceBackend::new(&config.backend).map_err(|e| {
        error!("❌ Failed to initialize finance API client: {}", e);
        e
    })?;
    info!("✅ Finance API client initialized");

    let probe_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.backend.connect_timeout_secs))
        .build()?;
    let health_checker = HealthChecker::new(probe_client, config.backend.base_url.clone());

    info!("🏥 Checking finance API reachability...");
    let startup_health = health_checker.check_health().await;
    if startup_health.is_healthy() {
        info!("✅ Finance API reachable");
    } else {
        warn!("⚠️  Finance API unreachable at startup; serving anyway");
    }

    info!(
        wallet_page = %config.console.wallet_page_path,
        topup_roles = ?config.console.topup_roles,
        "🛣️  Setting up console routes..."
    );
    let console = ConsoleState::new(Arc::new(backend), config.console.clone());

    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
        .with_state(health_checker)
        .merge(api::router(console))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}

async fn health(
    State(checker): State<HealthChecker>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    info!("🏥 Health check requested");
    let health_status = checker.check_health().await;

    if matches!(health_status.status, HealthState::Unhealthy) {
        error!("❌ Health check failed - finance API unreachable");
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    } else {
        Ok(Json(health_status))
    }
}

/// Readiness probe - the console is useless without the finance API
async fn readiness(
    state: State<HealthChecker>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    health(state).await
}

/// Liveness probe - the process is up
async fn liveness() -> &'static str {
    "OK"
}
