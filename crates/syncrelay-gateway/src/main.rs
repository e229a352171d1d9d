//! syncRelay Gateway
//!
//! - WebSocket endpoint: /ws/:channel
//! - Dispatch workers own all channel state; sessions talk to them via commands
//! - Ops: /healthz, /v1/channels

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syncrelay_core::error::{Result, SyncRelayError};
use syncrelay_gateway::{app_state::AppState, config, realtime::Broker, router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "syncrelay-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> Result<()> {
    let cfg = config::load()?;
    let port = std::env::var("PORT").ok();
    let listen = config::listen_addr(&cfg, port.as_deref())?;

    let (broker, _workers) = Broker::spawn(&cfg.dispatch);
    tracing::info!(shards = broker.shard_count(), "broker started");

    let state = AppState::new(cfg, broker);
    let app = router::build_router(state);

    tracing::info!(%listen, "syncrelay-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| SyncRelayError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| SyncRelayError::Internal(format!("server failed: {e}")))?;

    tracing::info!("syncrelay-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
    tracing::info!("shutdown signal received");
}
