//! Startup helpers for the Conversafina server.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::chat::core::config::AppConfig;
use crate::server::{self, AppState};

/// Run the server (used by the `conversafina-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("Starting Conversafina v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!("Ollama endpoint: {}", config.llm.base_url);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Install the global `tracing` subscriber. Called once, from [`run`].
fn init_tracing() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// `RUST_LOG` directives on top of an `info` default.
fn env_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

/// Build the application state and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if state creation or the server fails.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let port = config.server.port;
    let state = AppState::new(config)
        .await
        .map_err(|e| format!("Failed to create state: {e}"))?;
    server::run_server_with_shutdown(state, port, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keeps_info_default() {
        let hint = env_filter().max_level_hint();
        assert!(hint >= Some(tracing::level_filters::LevelFilter::INFO));
    }
}
