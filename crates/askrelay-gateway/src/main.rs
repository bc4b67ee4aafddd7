//! askrelay gateway
//!
//! - Operator peers: WebSocket at /ws
//! - Callers: POST /v1/rpc/{ask_question,work_report}
//! - Ops: /healthz, /readyz, /metrics

use std::net::SocketAddr;

use askrelay_core::error::{RelayError, Result};
use tracing_subscriber::{fmt, EnvFilter};

use askrelay_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "askrelay-gateway stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var(config::CONFIG_ENV)
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_or_default(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse().map_err(|e| {
        RelayError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}"))
    })?;

    let state = AppState::new(cfg);
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "askrelay-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RelayError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| RelayError::Internal(format!("server failed: {e}")))?;

    tracing::info!("askrelay-gateway stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
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

    tracing::info!("shutdown signal received; draining");
    state.begin_drain();
}
