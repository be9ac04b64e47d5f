//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Query API metrics
    pub query_requests: CounterVec,
    pub stage_duration: HistogramVec,

    // Retrieval metrics
    pub search_documents: Histogram,

    // Token budget metrics
    pub context_tokens: Histogram,
    pub context_available: Histogram,
    pub context_truncations: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let query_requests = register_counter_vec_with_registry!(
            Opts::new("query_requests_total", "Total query requests by outcome"),
            &["status"],
            registry
        )?;

        let stage_duration = register_histogram_vec_with_registry!(
            "query_stage_duration_seconds",
            "Duration of each query pipeline stage in seconds",
            &["stage"],
            registry
        )?;

        let search_documents = register_histogram_with_registry!(
            "search_documents",
            "Documents returned per search",
            vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0],
            registry
        )?;

        let context_tokens = register_histogram_with_registry!(
            "context_tokens",
            "Tokens in the untruncated retrieved context",
            vec![0.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0, 32000.0],
            registry
        )?;

        let context_available = register_histogram_with_registry!(
            "context_available_tokens",
            "Tokens available for context after query and safety margin",
            vec![0.0, 1000.0, 2000.0, 4000.0, 6000.0, 8000.0, 16000.0],
            registry
        )?;

        let context_truncations = register_counter_with_registry!(
            Opts::new("context_truncations_total", "Total truncated contexts"),
            registry
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            query_requests,
            stage_duration,
            search_documents,
            context_tokens,
            context_available,
            context_truncations,
        })
    }

    /// Record the outcome of a query request
    pub fn record_query(&self, status: &str) {
        self.query_requests.with_label_values(&[status]).inc();
    }

    /// Record how long a pipeline stage took
    pub fn observe_stage(&self, stage: &str, seconds: f64) {
        self.stage_duration.with_label_values(&[stage]).observe(seconds);
    }

    /// Record the size of a search result
    pub fn record_search(&self, documents: usize) {
        self.search_documents.observe(documents as f64);
    }

    /// Record how the context budget was spent
    pub fn record_context(&self, context_tokens: usize, available: i64, truncated: bool) {
        self.context_tokens.observe(context_tokens as f64);
        self.context_available.observe(available.max(0) as f64);
        if truncated {
            self.context_truncations.inc();
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
