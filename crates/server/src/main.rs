mod bootstrap;
mod chat;
mod health;
mod llm;
mod mailer;
mod storage;

use std::future::IntoFuture;
use std::pin::pin;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::oneshot;
use tracing::{info, warn, Level};
use urbanbot_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);

    let app = bootstrap::bootstrap_with_config(config).await?;
    serve(app).await
}

async fn serve(app: bootstrap::Application) -> Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let routes = chat::router(app.dispatcher.clone()).merge(health::router(app.db_pool.clone()));
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(event_name = "system.server.listening", address = %address, "accepting connections");

    let (stopping_tx, stopping_rx) = oneshot::channel();
    let mut server = pin!(axum::serve(listener, routes).with_graceful_shutdown(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!(
            event_name = "system.server.stopping",
            grace_secs = grace.as_secs(),
            "shutdown signal received, draining requests"
        );
        let _ = stopping_tx.send(());
    })
    .into_future());

    // In-flight requests get the configured grace period after the signal;
    // past that the remaining connections are dropped.
    tokio::select! {
        result = &mut server => result?,
        _ = drain_deadline(stopping_rx, grace) => {
            warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "drain deadline elapsed, closing remaining connections"
            );
        }
    }

    info!(event_name = "system.server.stopped", "server shut down cleanly");
    Ok(())
}

/// Resolves `grace` after the shutdown signal fires; pends forever if the
/// signal never arrives, so a normal serve exit is never raced.
async fn drain_deadline(stopping: oneshot::Receiver<()>, grace: Duration) {
    if stopping.await.is_ok() {
        tokio::time::sleep(grace).await;
    } else {
        std::future::pending::<()>().await;
    }
}

// Logging must come up before bootstrap so connection and migration events
// are captured.
fn init_logging(config: &LoggingConfig) {
    let level: Level = config.level.parse().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);
    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
