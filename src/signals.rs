use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::{analysis::CostEstimator, config, handlers::AppState};

/// Shutdown signal types
#[derive(Debug, Clone, Copy)]
pub enum ShutdownSignal {
    /// Graceful shutdown (drain connections, clean up)
    Graceful,
}

/// Setup signal handlers for the server
///
/// Returns a broadcast sender for shutdown signals and a join handle for the signal task
///
/// Handles:
/// - SIGTERM/SIGINT: Graceful shutdown
/// - SIGHUP: Configuration reload from `config_path`
#[cfg(unix)]
pub fn setup_signal_handlers(
    state: AppState,
    config_path: PathBuf,
) -> Result<(
    broadcast::Sender<ShutdownSignal>,
    tokio::task::JoinHandle<()>,
)> {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx_clone = shutdown_tx.clone();

    // Register before spawning so setup failures reach the caller
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received, initiating graceful shutdown");
                    let _ = tx_clone.send(ShutdownSignal::Graceful);
                    break;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received, initiating graceful shutdown");
                    let _ = tx_clone.send(ShutdownSignal::Graceful);
                    break;
                }
                _ = sighup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    if let Err(e) = reload_config(&state, &config_path) {
                        error!("Failed to reload configuration: {}", e);
                    } else {
                        info!("Configuration reloaded successfully");
                    }
                }
            }
        }
    });

    Ok((shutdown_tx, handle))
}

/// Windows placeholder - only Ctrl+C, no reload
#[cfg(not(unix))]
pub fn setup_signal_handlers(
    _state: AppState,
    _config_path: PathBuf,
) -> Result<(
    broadcast::Sender<ShutdownSignal>,
    tokio::task::JoinHandle<()>,
)> {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx_clone = shutdown_tx.clone();

    let handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, initiating shutdown");
                let _ = tx_clone.send(ShutdownSignal::Graceful);
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    Ok((shutdown_tx, handle))
}

/// Reload configuration and rebuild the estimator.
///
/// Nothing is stored until the new file has loaded and validated; on any
/// failure the running config stays in place. The estimator is stored before
/// the config, in two separate swaps, so readers never see new API keys
/// paired with stale estimator tables. Server address, body limit, CORS and
/// the history database are bound at startup and need a restart to change.
pub fn reload_config(state: &AppState, config_path: &std::path::Path) -> Result<()> {
    info!(path = %config_path.display(), "Loading new configuration...");

    let new_config = config::load_config(config_path)?;
    let new_estimator = CostEstimator::new(new_config.estimator.clone());

    info!(
        "New configuration loaded. API Keys: {}, max recommendations: {}",
        new_config.api_keys.len(),
        new_config.estimator.max_recommendations
    );

    state.estimator.store(std::sync::Arc::new(new_estimator));
    state.config.store(std::sync::Arc::new(new_config));

    info!("Estimator and configuration stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use std::io::Write;

    #[tokio::test]
    async fn test_setup_signal_handlers() {
        let state = AppState::new(test_config());
        let (shutdown_tx, _handle) =
            setup_signal_handlers(state, PathBuf::from("config.toml")).unwrap();

        let mut rx = shutdown_tx.subscribe();
        shutdown_tx.send(ShutdownSignal::Graceful).unwrap();

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, ShutdownSignal::Graceful));
    }

    #[test]
    fn test_reload_swaps_config_and_estimator() {
        let state = AppState::new(test_config());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 8080
log_level = "info"
log_format = "json"

[[api_keys]]
key = "sk-reloaded-key-1"
name = "reloaded"
enabled = true

[estimator]
max_recommendations = 2
"#
        )
        .unwrap();

        reload_config(&state, file.path()).unwrap();

        assert_eq!(state.config.load().api_keys[0].name, "reloaded");
        assert_eq!(state.estimator.load().config().max_recommendations, 2);
    }

    #[test]
    fn test_reload_leaves_config_and_estimator_in_step() {
        let state = AppState::new(test_config());
        assert!(state.history.is_none());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 8080
log_level = "info"
log_format = "json"

[[api_keys]]
key = "sk-reloaded-key-1"
name = "reloaded"
enabled = true
plan = "enterprise"

[estimator]
max_recommendations = 4
"#
        )
        .unwrap();

        reload_config(&state, file.path()).unwrap();

        // Both halves reflect the new file once reload returns
        let config = state.config.load();
        let estimator = state.estimator.load();
        assert_eq!(config.api_keys.len(), 1);
        assert_eq!(
            config.estimator.max_recommendations,
            estimator.config().max_recommendations
        );
        assert!(state.history.is_none());
    }

    #[test]
    fn test_failed_reload_keeps_old_config() {
        let state = AppState::new(test_config());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[server]\nhost = \"127.0.0.1\"\n").unwrap();

        assert!(reload_config(&state, file.path()).is_err());
        assert_eq!(state.config.load().api_keys.len(), 3);
        assert_eq!(state.estimator.load().config().max_recommendations, 10);
    }
}
