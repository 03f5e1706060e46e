//! Race Ticket API server.
//!
//! Connects to `PostgreSQL`, runs migrations, optionally reseeds, and serves
//! the API plus a Prometheus `/metrics` endpoint.

mod config;

use anyhow::Context;
use axum::{Router, routing::get};
use config::Config;
use raceticket_postgres::PostgresDatabase;
use raceticket_core::repository::Database;
use raceticket_runtime::metrics::MetricsServer;
use raceticket_web::{AppState, build_router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raceticket=info,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Race Ticket API server");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        addr = %config.server.addr(),
        metrics_addr = %config.server.metrics_addr(),
        initialize_on_start = config.app.initialize_on_start,
        "Configuration loaded"
    );

    // Database
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .idle_timeout(Duration::from_secs(config.postgres.idle_timeout))
        .connect(&config.postgres.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let db = PostgresDatabase::new(pool, config.app.fixture_from_today());

    db.migrate().await.context("Failed to run migrations")?;
    info!("Migrations applied");

    if config.app.initialize_on_start {
        db.initialize().await.context("Failed to seed database")?;
    }

    // Metrics
    let metrics_addr: SocketAddr = config
        .server
        .metrics_addr()
        .parse()
        .context("Invalid metrics address")?;
    let mut metrics = MetricsServer::new(metrics_addr);
    metrics.start().context("Failed to install metrics recorder")?;
    if let Some(handle) = metrics.handle().cloned() {
        let metrics_app = Router::new().route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
        let listener = tokio::net::TcpListener::bind(metrics_addr)
            .await
            .context("Failed to bind metrics listener")?;
        info!(addr = %metrics_addr, "Metrics endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app).await {
                error!(error = %e, "Metrics server failed");
            }
        });
    }

    // API
    let app = build_router(AppState::new(db));
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(());
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("Server task panicked")?.context("Server failed")?;
            return Ok(());
        },
        () = shutdown_signal() => {},
    }

    let _ = shutdown_tx.send(());
    let timeout = config.server.shutdown_timeout();
    match tokio::time::timeout(timeout, server).await {
        Ok(result) => result.context("Server task panicked")?.context("Server failed")?,
        Err(_) => warn!(timeout_secs = timeout.as_secs(), "Shutdown timed out, dropping connections"),
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
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
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
