//! Command implementations for the CLI
//!
//! - start: Start the HTTP server
//! - test: Test configuration validity
//! - config: Configuration display and validation
//! - analyze: One-shot analysis of a bill entered on the command line
//! - decode: Decode and analyze a billing file

pub mod analyze;
pub mod config;
pub mod decode;
pub mod start;

use anyhow::Result;
use aws_cost_advisor::analysis::{CostEstimator, EstimatorConfig};
use aws_cost_advisor::config as app_config;
use std::path::Path;

/// Estimator for offline commands: the configured rule tables when the config
/// file exists, built-in defaults otherwise
pub(crate) fn offline_estimator(config_path: &Path) -> Result<CostEstimator> {
    if config_path.exists() {
        let cfg = app_config::load_config(config_path)?;
        tracing::debug!(path = %config_path.display(), "Using estimator tables from config");
        Ok(CostEstimator::new(cfg.estimator))
    } else {
        tracing::debug!("No config file, using default estimator tables");
        Ok(CostEstimator::new(EstimatorConfig::default()))
    }
}
