//! Observability hooks for bound functions and invalidation fan-out.
//!
//! Implement [`QueryMetrics`] to feed your monitoring system:
//!
//! ```ignore
//! use query_kit::observability::QueryMetrics;
//! use query_kit::QueryKey;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl QueryMetrics for PrometheusMetrics {
//!     fn record_fetch(&self, _key: &QueryKey, _duration: Duration) {
//!         // histogram!("query_fetch_latency").record(duration);
//!     }
//! }
//!
//! // let factory = QueryFactory::new(..).with_metrics(Arc::new(PrometheusMetrics));
//! ```
//!
//! The factory defaults to [`NoOpMetrics`]. Methods you do not override log
//! through the `log` crate. Recording never changes the result of the
//! instrumented call.

use crate::key::QueryKey;
use std::time::Duration;

/// Trait for query metrics collection.
pub trait QueryMetrics: Send + Sync {
    /// A bound fetch function resolved with data.
    fn record_fetch(&self, key: &QueryKey, duration: Duration) {
        debug!("Query FETCH: {} took {:?}", key, duration);
    }

    /// A bound fetch function failed (response-level or transport).
    fn record_fetch_error(&self, key: &QueryKey, error: &str) {
        warn!("Query FETCH ERROR for {}: {}", key, error);
    }

    /// A bound mutate function resolved with data.
    fn record_mutation(&self, duration: Duration) {
        debug!("Query MUTATION took {:?}", duration);
    }

    /// One invalidation request completed.
    fn record_invalidation(&self, key: &QueryKey, duration: Duration) {
        debug!("Query INVALIDATE: {} took {:?}", key, duration);
    }

    /// Any other failure (mutation, invalidation, background save).
    fn record_error(&self, context: &str, error: &str) {
        warn!("Query ERROR in {}: {}", context, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl QueryMetrics for NoOpMetrics {
    fn record_fetch(&self, _key: &QueryKey, _duration: Duration) {}
    fn record_fetch_error(&self, _key: &QueryKey, _error: &str) {}
    fn record_mutation(&self, _duration: Duration) {}
    fn record_invalidation(&self, _key: &QueryKey, _duration: Duration) {}
    fn record_error(&self, _context: &str, _error: &str) {}
}

/// Metrics implementation that only uses the trait's logging defaults.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl QueryMetrics for LogMetrics {}
