//! Prometheus metrics for monitoring.

use std::sync::atomic::AtomicU64;

use bcdx_model::artifacts::Diagnosis;
use bcdx_model::decision::Label;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Metrics registry for the diagnosis service
#[derive(Debug)]
pub struct MetricsRegistry {
    /// Prometheus registry
    registry: Registry,
    /// Successful predictions
    pub predictions_total: Counter,
    /// Predictions labelled malignant
    pub malignant_total: Counter,
    /// Predictions labelled benign
    pub benign_total: Counter,
    /// Failed predictions
    pub prediction_errors_total: Counter,
    /// Probability of the most recent prediction
    pub last_probability: Gauge<f64, AtomicU64>,
    /// Pipeline latency histogram (nanoseconds)
    pub inference_latency_ns: Histogram,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Create a new metrics registry
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let predictions_total = Counter::default();
        registry.register(
            "bcdx_predictions",
            "Total number of successful predictions",
            predictions_total.clone(),
        );

        let malignant_total = Counter::default();
        registry.register(
            "bcdx_malignant",
            "Predictions labelled malignant",
            malignant_total.clone(),
        );

        let benign_total = Counter::default();
        registry.register(
            "bcdx_benign",
            "Predictions labelled benign",
            benign_total.clone(),
        );

        let prediction_errors_total = Counter::default();
        registry.register(
            "bcdx_prediction_errors",
            "Predictions rejected or failed",
            prediction_errors_total.clone(),
        );

        let last_probability = Gauge::<f64, AtomicU64>::default();
        registry.register(
            "bcdx_last_probability",
            "Probability of the most recent prediction",
            last_probability.clone(),
        );

        // 1us to ~500ms
        let ns_buckets: Vec<f64> = exponential_buckets(1_000.0, 2.0, 20).collect();
        let inference_latency_ns = Histogram::new(ns_buckets.into_iter());
        registry.register(
            "bcdx_inference_latency_ns",
            "Pipeline latency in nanoseconds",
            inference_latency_ns.clone(),
        );

        Self {
            registry,
            predictions_total,
            malignant_total,
            benign_total,
            prediction_errors_total,
            last_probability,
            inference_latency_ns,
        }
    }

    /// Record a successful diagnosis
    pub fn record_diagnosis(&self, diagnosis: &Diagnosis) {
        self.predictions_total.inc();
        match diagnosis.decision.label {
            Label::Malignant => self.malignant_total.inc(),
            Label::Benign => self.benign_total.inc(),
        };
        self.last_probability.set(diagnosis.decision.probability);
        self.inference_latency_ns
            .observe(diagnosis.latency_ns as f64);
    }

    /// Record a failed prediction
    pub fn record_error(&self) {
        self.prediction_errors_total.inc();
    }

    /// Encode metrics for Prometheus scraping
    #[must_use]
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }

    /// Get registry reference
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcdx_model::decision::render;

    #[test]
    fn test_metrics_creation() {
        let metrics = MetricsRegistry::new();

        metrics.record_diagnosis(&Diagnosis {
            decision: render(0.8),
            latency_ns: 12_000,
        });
        metrics.record_diagnosis(&Diagnosis {
            decision: render(0.5),
            latency_ns: 9_000,
        });
        metrics.record_error();

        assert_eq!(metrics.predictions_total.get(), 2);
        assert_eq!(metrics.malignant_total.get(), 1);
        assert_eq!(metrics.benign_total.get(), 1);
        assert_eq!(metrics.prediction_errors_total.get(), 1);

        let output = metrics.encode();
        assert!(output.contains("bcdx_predictions_total"));
        assert!(output.contains("bcdx_prediction_errors_total"));
        assert!(output.contains("bcdx_inference_latency_ns"));
    }
}
