mod http;
mod listener;
mod registry;
mod slots;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use platewatch_common::config::Config;
use state::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let state = match AppState::open(&config.receiver) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "failed to open vehicle registry");
            std::process::exit(1);
        }
    };
    info!(slots = config.receiver.slots, "parking lot ready");

    let notifications = tokio::net::TcpListener::bind(&config.receiver.listen)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind to {}: {e}", config.receiver.listen);
            std::process::exit(1);
        });
    tokio::spawn(listener::serve(notifications, state.clone()));

    let addr = config.receiver.http.clone();
    info!(addr, "platewatch receiver API starting");
    let api_listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received, shutting down");
    };
    if let Err(e) = axum::serve(api_listener, http::router(state))
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %e, "HTTP server failed");
        std::process::exit(1);
    }
}
