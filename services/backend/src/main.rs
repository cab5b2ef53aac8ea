use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_backend::build_router;
use wallet_backend::clients::{ChapaGateway, TelegramNotifier};
use wallet_backend::config::{Config, StorageBackend};
use wallet_backend::repository::{InMemoryLedgerRepository, LedgerRepository, RedisLedgerRepository};
use wallet_backend::services::RandomOutcomes;
use wallet_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with JSON formatting (configurable via env)
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string())
        .eq_ignore_ascii_case("json");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wallet_backend=info,tower_http=info".into());

    if use_json {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable logging for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        service = "wallet-backend",
        version = env!("CARGO_PKG_VERSION"),
        log_format = if use_json { "json" } else { "text" },
        "Starting wallet backend"
    );

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        storage = ?config.storage.backend,
        provider_configured = config.provider.secret_key.is_some(),
        webhook_signatures = config.provider.webhook_secret.is_some(),
        callback_url = %config.callback_url(),
        "Configuration loaded"
    );

    // Open the ledger
    let ledger: Arc<dyn LedgerRepository> = match config.storage.backend {
        StorageBackend::Redis => {
            let redis_client = redis::Client::open(config.storage.redis_url.clone())?;
            let redis_conn = redis_client.get_connection_manager().await?;
            tracing::info!("Redis connected");
            Arc::new(RedisLedgerRepository::new(redis_conn))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory ledger; balances are lost on restart");
            Arc::new(InMemoryLedgerRepository::new())
        }
    };

    // Outbound clients
    let gateway = Arc::new(ChapaGateway::new(&config.provider)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram)?);
    let outcomes = Arc::new(RandomOutcomes::new(&config.betting));

    let api_port = config.server.api_port;
    let metrics_port = config.server.metrics_port;
    let app_state = AppState::new(config, ledger, gateway, notifier, outcomes);
    let app = build_router(app_state);

    // Start metrics server
    let metrics_handle = tokio::spawn(start_metrics_server(metrics_port));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
    tracing::info!("Wallet API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    metrics_handle.abort();
    tracing::info!("Wallet backend stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    let app = Router::new().route(
        "/metrics",
        get(|| async move { handle.render() }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Metrics server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
