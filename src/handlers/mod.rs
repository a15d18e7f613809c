//! HTTP request handlers for Loadgauge
//!
//! Weighted endpoints and the help page are served by
//! [`crate::respond::InstrumentedHandler`]; this module holds the
//! uninstrumented utility endpoints and the shared state they read.

use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::Metrics;
use std::sync::Arc;

pub mod metrics;
pub mod ready;

/// Application state shared across all handlers
///
/// Cheap to clone: the config is Arc'd and `Metrics` is a set of handles.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: Metrics,
}

impl AppState {
    /// Create a new AppState with a fresh metric registry
    pub fn new(config: Config) -> AppResult<Self> {
        Ok(Self::with_metrics(config, Metrics::new()?))
    }

    /// Create an AppState around an existing registry
    pub fn with_metrics(config: Config, metrics: Metrics) -> Self {
        Self {
            config: Arc::new(config),
            metrics,
        }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the metric registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::Weight;

    #[test]
    fn test_appstate_new_creates_state() {
        let state = AppState::new(Config::default()).expect("should create state");
        assert_eq!(state.config().server.display, "nothing");
        assert_eq!(state.metrics().load(), 0.0);
    }

    #[test]
    fn test_appstate_clones_share_metrics() {
        let state = AppState::new(Config::default()).unwrap();
        let state2 = state.clone();
        state2.metrics().apply_weight(Weight::new(7));
        assert_eq!(state.metrics().load(), 7.0);
    }
}
