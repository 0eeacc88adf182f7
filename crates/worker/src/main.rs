use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use guildxp_cache::PgBackend;
use guildxp_events::{EventBuffer, EventBus, EventPersistence, PgEventSink};
use guildxp_worker::dry_run::DryRunPlatform;
use guildxp_worker::{health, Services, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound for each shutdown step.
const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "guildxp_worker=debug,guildxp_cache=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(health_addr = %config.health_addr, "Loaded worker configuration");

    // --- Database ---
    let pool = guildxp_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    guildxp_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    guildxp_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Event bus and audit persistence ---
    let bus = Arc::new(EventBus::default());
    let buffer = Arc::new(EventBuffer::new(
        Arc::new(PgEventSink::new(pool.clone())),
        config.event_batch_size,
    ));
    let persistence_cancel = CancellationToken::new();
    let persistence_handle = tokio::spawn(EventPersistence::run(
        buffer.clone(),
        bus.subscribe(),
        config.event_flush_interval,
        persistence_cancel.clone(),
    ));

    // --- Caches and pipelines ---
    // The gateway adapter attaches to `services` and calls into `handlers`.
    // Without one, platform calls are logged only.
    let services = Services::new(
        Arc::new(PgBackend::new(pool)),
        Arc::new(DryRunPlatform),
        bus.clone(),
        &config,
    );

    let maintenance = Arc::new(services.maintenance(&config));
    let maintenance_cancel = CancellationToken::new();
    let maintenance_handle = {
        let maintenance = maintenance.clone();
        let cancel = maintenance_cancel.clone();
        tokio::spawn(async move { maintenance.run(cancel).await })
    };
    tracing::info!("Background services started (audit persistence, cache maintenance)");

    // --- Health endpoint ---
    let listener = tokio::net::TcpListener::bind(config.health_addr)
        .await
        .context("Failed to bind health endpoint")?;
    tracing::info!(addr = %config.health_addr, "Health endpoint listening");
    axum::serve(listener, health::router(services.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Health server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Shutting down, flushing state");

    maintenance_cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_STEP_TIMEOUT, maintenance_handle)
        .await
        .is_err()
    {
        tracing::warn!("Cache maintenance did not stop in time");
    }

    match tokio::time::timeout(SHUTDOWN_STEP_TIMEOUT, maintenance.shutdown()).await {
        Ok(report) if report.failed > 0 => {
            tracing::error!(failed = report.failed, "Some profiles could not be flushed");
        }
        Ok(_) => {}
        Err(_) => tracing::error!("Final profile flush timed out"),
    }

    persistence_cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_STEP_TIMEOUT, persistence_handle)
        .await
        .is_err()
    {
        tracing::warn!(
            pending = buffer.len().await,
            "Audit persistence did not drain in time"
        );
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
