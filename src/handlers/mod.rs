pub mod analyze;
pub mod health;
pub mod history;
pub mod metrics_handler;
pub mod plans;
pub mod upload;

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::{
    analysis::{CostAnalysisResult, CostEstimator},
    auth::AuthInfo,
    config::Config,
    history::HistoryStore,
};

/// Application state shared by the authenticated routes.
///
/// Config and estimator live in separate `ArcSwap`s. A reload stores the
/// estimator first and the config second, so a request racing a reload can
/// briefly pair the new estimator tables with the previous key set. The plan
/// used for an analysis is always the one read by the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    pub estimator: Arc<ArcSwap<CostEstimator>>,
    /// `None` when `[history].enabled = false`
    pub history: Option<Arc<HistoryStore>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let estimator = CostEstimator::new(config.estimator.clone());
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            estimator: Arc::new(ArcSwap::from_pointee(estimator)),
            history: None,
        }
    }

    pub fn with_history(mut self, history: Arc<HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }
}

/// Store a finished analysis when history is enabled.
///
/// A failed write is logged and does not fail the request.
pub(crate) async fn record_history(
    state: &AppState,
    auth: &AuthInfo,
    source: &str,
    filename: Option<&str>,
    analysis: &CostAnalysisResult,
) {
    let Some(history) = &state.history else {
        return;
    };
    if let Err(e) = history
        .save(&auth.api_key_name, source, filename, analysis)
        .await
    {
        tracing::warn!(
            api_key = %auth.api_key_name,
            error = %e,
            "Failed to record analysis history"
        );
    }
}
