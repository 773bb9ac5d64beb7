//! Cache and introspection instrumentation
//!
//! With the `metrics` feature, counters and a histogram are registered on the
//! global OpenTelemetry meter; the application installs the exporter. With
//! the `tracing` feature, [`tracing_helpers`] builds the spans used around
//! introspection and cache operations.

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<SchemaMetrics> = Lazy::new(SchemaMetrics::init);

#[cfg(feature = "metrics")]
pub struct SchemaMetrics {
    pub cache_hits_total: Counter<u64>,
    pub cache_misses_total: Counter<u64>,
    pub introspection_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl SchemaMetrics {
    pub fn init() -> Self {
        let meter = global::meter("lifeguard_schema");

        let cache_hits_total = meter
            .u64_counter("lifeguard_schema_cache_hits_total")
            .with_description("Schema cache lookups served from cache")
            .build();

        let cache_misses_total = meter
            .u64_counter("lifeguard_schema_cache_misses_total")
            .with_description("Schema cache lookups that required inference")
            .build();

        let introspection_duration = meter
            .f64_histogram("lifeguard_schema_introspection_duration_seconds")
            .with_description("Duration of table introspection")
            .build();

        Self {
            cache_hits_total,
            cache_misses_total,
            introspection_duration,
        }
    }

    pub fn record_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits_total.add(1, &[]);
        } else {
            self.cache_misses_total.add(1, &[]);
        }
    }

    pub fn record_introspection(&self, elapsed: std::time::Duration, adapter: &'static str) {
        self.introspection_duration
            .record(elapsed.as_secs_f64(), &[KeyValue::new("adapter", adapter)]);
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn introspect_span(adapter: &str, table: &str) -> Span {
        info_span!("lifeguard_schema.introspect", adapter = adapter, table = table)
    }

    pub fn cache_span(operation: &'static str, table: &str) -> Span {
        info_span!("lifeguard_schema.cache", operation = operation, table = table)
    }
}
