//! Balance Engine Binary
//!
//! Starts the booking balance reconciliation engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin balance-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_SERVICE_KEY`: Service-role key for the hosted database API
//! - `ADMIN_API_TOKEN`: Bearer token required on `/api/admin/*` routes
//!
//! ## Optional
//! - `BALANCE_ENGINE_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `DATABASE_API_URL`: Hosted database API base URL (default: <http://localhost:54321>)
//! - `HTTP_PORT`: HTTP server port (default: 8090)
//! - `METRICS_PORT`: Prometheus metrics port (default: 9090)
//! - `OTEL_ENABLED`: Set to `false` to disable OTEL tracing
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use balance_engine::config::{Config, load_config};
use balance_engine::observability::{MetricsConfig, init_metrics};
use balance_engine::server::{AppState, create_router};
use balance_engine::telemetry::init_telemetry;
use balance_engine::{RestBackend, RestBackendConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let _telemetry_guard = init_telemetry();

    tracing::info!("Starting balance engine");

    let config = resolve_config()?;
    log_config(&config);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = format!("0.0.0.0:{}", config.observability.metrics_port)
            .parse()
            .context("invalid metrics listen address")?;
        init_metrics(&MetricsConfig::with_addr(addr)).context("failed to start metrics")?;
    }

    let backend = Arc::new(
        RestBackend::new(RestBackendConfig {
            base_url: config.backend.base_url.clone(),
            service_key: config.backend.service_key.clone(),
            timeout: Duration::from_secs(config.backend.timeout_secs),
            max_retries: config.backend.max_retries,
            retry_base_delay: Duration::from_millis(config.backend.retry_base_delay_ms),
        })
        .map_err(|e| anyhow::anyhow!("failed to create backend: {e}"))?,
    );

    let state = AppState::new(backend, &config);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.http_port)
        .parse()
        .context("invalid HTTP listen address")?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/health/payments");
    tracing::info!("  POST /api/admin/payments/validate-balances");
    tracing::info!("  GET  /api/admin/payments/validate-balances");
    tracing::info!("  POST /api/admin/payments/reconcile");
    tracing::info!("  GET  /api/admin/payments/alerts");
    tracing::info!("  GET  /api/admin/payments/alerts/summary");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind HTTP listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("HTTP server error")?;

    tracing::info!("Balance engine stopped");
    Ok(())
}

/// Load configuration from YAML (when present) and apply env overrides.
fn resolve_config() -> anyhow::Result<Config> {
    let path = std::env::var("BALANCE_ENGINE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = if std::path::Path::new(&path).exists() {
        load_config(Some(&path)).with_context(|| format!("failed to load config from {path}"))?
    } else {
        tracing::info!(path = %path, "No config file found, using defaults");
        Config::default()
    };

    // The env path wins over the file for deployment-level settings.
    if let Ok(url) = std::env::var("DATABASE_API_URL") {
        config.backend.base_url = url;
    }
    if let Ok(key) = std::env::var("DATABASE_SERVICE_KEY") {
        config.backend.service_key = key;
    }
    if let Ok(token) = std::env::var("ADMIN_API_TOKEN") {
        config.server.admin_token = token;
    }
    if let Ok(port) = std::env::var("HTTP_PORT") {
        config.server.http_port = port.parse().context("invalid HTTP_PORT")?;
    }
    if let Ok(port) = std::env::var("METRICS_PORT") {
        config.observability.metrics_port = port.parse().context("invalid METRICS_PORT")?;
    }

    if config.backend.service_key.is_empty() {
        anyhow::bail!("DATABASE_SERVICE_KEY environment variable is required");
    }
    if config.server.admin_token.is_empty() {
        anyhow::bail!("ADMIN_API_TOKEN environment variable is required");
    }

    Ok(config)
}

/// Log the effective configuration (never the secrets).
fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        backend_url = %config.backend.base_url,
        reconciliation_limit = config.reconciliation.limit,
        concurrency = config.reconciliation.concurrency,
        alert_window_hours = config.alerts.window_hours,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. Better to fail fast at
/// startup than to run a process that cannot respond to termination.
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    let _ = shutdown_tx.send(());
}
