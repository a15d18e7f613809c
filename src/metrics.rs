//! Prometheus metrics for Loadgauge
//!
//! Three instruments carry the synthetic signal:
//! - `http_requests_total{handler,method}`: requests per endpoint path and method
//! - `load_total`: the shared load gauge driven by endpoint weights
//! - `errors_total`: responses that never reached the client
//!
//! On Linux the registry also carries the `process_*` series from the
//! prometheus process collector. Everything is exported via `/metrics` in
//! Prometheus text format.

use crate::weights::{GaugeEffect, Weight};
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const LOAD_TOTAL: &str = "load_total";
pub const ERRORS_TOTAL: &str = "errors_total";

/// Metric registry shared by every request handler
///
/// Cloning is cheap: all instruments are handles onto shared atomics, so a
/// clone observes and mutates the same values. Separate `Metrics::new()`
/// instances are fully independent.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    load: Gauge,
    errors_total: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all instruments with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: table size + 1 (help page) handlers × methods seen.
        // Entries appear on first observation and are never removed.
        let requests_total = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "The number of received http request"),
            &["handler", "method"],
        )?;

        let load = Gauge::with_opts(Opts::new(LOAD_TOTAL, "The load of the server"))?;

        let errors_total =
            IntCounter::with_opts(Opts::new(ERRORS_TOTAL, "The total number of errors"))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(load.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            load,
            errors_total,
        })
    }

    /// Count one request for `path` with `method`
    pub fn increment_request(&self, path: &str, method: &str) {
        self.requests_total
            .with_label_values(&[path, method])
            .inc();
    }

    /// Apply an endpoint weight to the load gauge
    ///
    /// Addition goes through the gauge's compare-and-swap loop, so concurrent
    /// hits never lose updates.
    pub fn apply_weight(&self, weight: Weight) {
        match weight.effect() {
            GaugeEffect::Reset => self.load.set(0.0),
            GaugeEffect::Add(amount) => self.load.add(amount),
            GaugeEffect::Unchanged => {}
        }
    }

    /// Record a response that was not delivered
    pub fn increment_error(&self) {
        self.errors_total.inc();
    }

    /// Current load gauge value
    pub fn load(&self) -> f64 {
        self.load.get()
    }

    /// Total errors recorded since startup
    pub fn errors(&self) -> u64 {
        self.errors_total.get()
    }

    /// Request count for a (path, method) pair
    ///
    /// Reads through the registry instead of the vec so that asking about a
    /// pair never creates its series.
    pub fn requests(&self, path: &str, method: &str) -> u64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == REQUESTS_TOTAL)
            .and_then(|mf| {
                mf.get_metric().iter().find(|m| {
                    let labels = m.get_label();
                    let has = |name: &str, value: &str| {
                        labels
                            .iter()
                            .any(|l| l.name() == name && l.value() == value)
                    };
                    has("handler", path) && has("method", method)
                })
            })
            .map(|m| m.get_counter().value.unwrap_or(0.0) as u64)
            .unwrap_or(0)
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();

            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                metric_names = ?metric_names,
                "Prometheus text encoder failed"
            );

            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            let valid_up_to = e.utf8_error().valid_up_to();
            tracing::error!(
                invalid_byte_index = valid_up_to,
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                valid_up_to, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_creates_registry() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.increment_request("/one", "GET");

        let output = metrics.gather().expect("should gather");
        assert!(output.contains("# TYPE http_requests_total counter"));
        assert!(output.contains("# TYPE load_total gauge"));
        assert!(output.contains("# TYPE errors_total counter"));
    }

    #[test]
    fn test_zero_weight_resets_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.apply_weight(Weight::new(1_000));
        metrics.apply_weight(Weight::new(10));
        assert_eq!(metrics.load(), 1_010.0);

        metrics.apply_weight(Weight::new(0));
        assert_eq!(metrics.load(), 0.0);
    }

    #[test]
    fn test_positive_weight_accumulates() {
        let metrics = Metrics::new().unwrap();
        for _ in 0..7 {
            metrics.apply_weight(Weight::new(100));
        }
        assert_eq!(metrics.load(), 700.0);
    }

    #[test]
    fn test_negative_weight_is_no_op() {
        let metrics = Metrics::new().unwrap();
        metrics.apply_weight(Weight::new(42));
        metrics.apply_weight(Weight::NO_OP);
        metrics.apply_weight(Weight::new(-1_000));
        assert_eq!(metrics.load(), 42.0);
    }

    #[test]
    fn test_request_counter_is_keyed_by_path_and_method() {
        let metrics = Metrics::new().unwrap();
        metrics.increment_request("/ten", "GET");
        metrics.increment_request("/ten", "GET");
        metrics.increment_request("/ten", "POST");

        assert_eq!(metrics.requests("/ten", "GET"), 2);
        assert_eq!(metrics.requests("/ten", "POST"), 1);
        assert_eq!(metrics.requests("/one", "GET"), 0);
    }

    #[test]
    fn test_reading_requests_does_not_create_series() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.requests("/one", "GET"), 0);

        let output = metrics.gather().unwrap();
        assert!(!output.contains("handler=\"/one\""));
    }

    #[test]
    fn test_error_counter_increments() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.errors(), 0);
        metrics.increment_error();
        metrics.increment_error();
        assert_eq!(metrics.errors(), 2);
    }

    #[test]
    fn test_clones_share_instruments() {
        let metrics = Metrics::new().unwrap();
        let clone = metrics.clone();
        clone.apply_weight(Weight::new(5));
        clone.increment_error();
        assert_eq!(metrics.load(), 5.0);
        assert_eq!(metrics.errors(), 1);
    }

    #[test]
    fn test_separate_instances_are_isolated() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.apply_weight(Weight::new(10));
        a.increment_request("/ten", "GET");
        assert_eq!(b.load(), 0.0);
        assert_eq!(b.requests("/ten", "GET"), 0);
    }

    #[test]
    fn test_gather_exposition_values() {
        let metrics = Metrics::new().unwrap();
        metrics.increment_request("/hundred", "GET");
        metrics.apply_weight(Weight::new(100));
        metrics.increment_error();

        let output = metrics.gather().unwrap();
        assert!(output.contains("http_requests_total{handler=\"/hundred\",method=\"GET\"} 1"));
        assert!(output.contains("load_total 100"));
        assert!(output.contains("errors_total 1"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_collector_registered() {
        let metrics = Metrics::new().unwrap();
        let output = metrics.gather().unwrap();
        assert!(output.contains("process_"));
    }

    #[test]
    fn test_concurrent_gauge_updates_are_not_lost() {
        let metrics = Metrics::new().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        m.apply_weight(Weight::new(10));
                        m.increment_request("/ten", "GET");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.load(), 80_000.0);
        assert_eq!(metrics.requests("/ten", "GET"), 8_000);
    }
}
