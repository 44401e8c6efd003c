//! Waitroom - Main Entry Point
//! JSON-RPC server + periodic promotion over a SQLite admission store

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use waitroom_api_rpc::{BroadcastNotifier, RpcServer, RpcServerConfig};
use waitroom_core::application::{
    shutdown_channel, AdmissionController, PromotionScheduler, WaitingRoomService,
};
use waitroom_core::port::id_provider::UuidProvider;
use waitroom_core::port::time_provider::SystemTimeProvider;
use waitroom_core::port::{AdmissionStore, TimeProvider, TokenIssuer};
use waitroom_infra_sqlite::{create_pool, run_migrations, SqliteAdmissionStore};
use waitroom_infra_token::OpaqueTokenIssuer;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SCHEDULER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Install the global subscriber; the returned guard flushes buffered logs on drop
fn init_logging() -> WorkerGuard {
    let log_format = std::env::var("WAITROOM_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waitroom=info"));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    // Optional OpenTelemetry export; errors are logged once the subscriber is up
    let (otel, telemetry_error) = match telemetry::init_layer() {
        Ok(layer) => (layer, None),
        Err(e) => (None, Some(e)),
    };
    let registry = tracing_subscriber::registry().with(otel).with(env_filter);

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            registry
                .with(fmt::layer().json().with_writer(writer))
                .init();
        }
        _ => {
            // Development: Pretty formatting
            registry
                .with(fmt::layer().pretty().with_writer(writer))
                .init();
        }
    }

    if let Some(e) = telemetry_error {
        warn!(error = %e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let _log_guard = init_logging();

    info!("Waitroom v{} starting...", VERSION);

    // 2. Load configuration
    let settings = config::load()?;
    info!(
        max_concurrent_users = settings.queue.max_concurrent_users,
        timeout_minutes = settings.queue.timeout_minutes,
        tick_interval_secs = settings.queue.tick_interval_secs,
        "Configuration loaded"
    );

    // 3. Initialize database
    if !settings.database.is_memory() {
        let db_path = settings.database.expanded_path();
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        info!(db_path = %db_path, "Initializing database...");
    }

    let pool = create_pool(&settings.database.url())
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store: Arc<dyn AdmissionStore> =
        Arc::new(SqliteAdmissionStore::new(pool, time_provider.clone()));
    let token_issuer: Arc<dyn TokenIssuer> = Arc::new(OpaqueTokenIssuer::new(
        time_provider.clone(),
        settings.token.ttl_hours,
    )?);
    let notifier = BroadcastNotifier::default();

    let controller = Arc::new(AdmissionController::new(
        store,
        Arc::new(UuidProvider),
        time_provider.clone(),
        settings.queue.clone(),
    ));
    let scheduler = Arc::new(PromotionScheduler::new(
        controller.clone(),
        token_issuer.clone(),
        Arc::new(notifier.clone()),
        time_provider.clone(),
    ));
    let service = Arc::new(WaitingRoomService::new(
        controller,
        scheduler.clone(),
        token_issuer,
        Arc::new(notifier.clone()),
        time_provider,
    ));

    // 5. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: settings.rpc.host.clone(),
        port: settings.rpc.port,
    };
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, service, notifier)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Start periodic promotion
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    info!(%rpc_addr, "System ready. Waiting for clients...");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    if let Err(e) = rpc_handle.stop() {
        error!(error = %e, "RPC server stop failed");
    }
    rpc_handle.stopped().await;
    if tokio::time::timeout(SCHEDULER_STOP_TIMEOUT, scheduler_handle)
        .await
        .is_err()
    {
        warn!("Promotion scheduler did not stop in time");
    }

    info!("Shutdown complete.");

    Ok(())
}
