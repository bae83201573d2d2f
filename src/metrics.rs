//! Metrics collection and export for size pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "metrics")]
use crate::errors::{PoolError, PoolResult};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use sizepool::{QueuePool, SizePool};
///
/// let pool = QueuePool::new(3, || 1u8, |b: &mut u8| *b = 0);
///
/// let item = pool.get().unwrap();
/// let metrics = pool.metrics();
/// assert_eq!(metrics.total_retrieved, 1);
/// assert_eq!(metrics.checked_out, 1);
///
/// pool.put(item).unwrap();
/// assert_eq!(pool.metrics().total_returned, 1);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total items handed out by `get` and `b_get`
    pub total_retrieved: usize,

    /// Total items accepted back by `put`
    pub total_returned: usize,

    /// Number of times a retrieval found nothing in time
    pub exhausted_events: usize,

    /// Returned items dropped by the validation predicate
    pub validation_failures: usize,

    /// Returned items refused because the store was full or closed
    pub rejected_returns: usize,

    /// Items currently in the store
    pub available_objects: usize,

    /// Items currently held by callers
    pub checked_out: usize,

    /// Checked-out ratio (0.0 to 1.0)
    pub utilization: f64,

    /// Configured capacity
    pub max_capacity: usize,

    /// Whether the pool has been closed
    pub closed: bool,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_retrieved".to_string(), self.total_retrieved.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("rejected_returns".to_string(), self.rejected_returns.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics.insert("closed".to_string(), self.closed.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Render a snapshot in the Prometheus text exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use sizepool::{ChannelPool, MetricsExporter, SizePool};
    /// use std::collections::HashMap;
    ///
    /// let pool = ChannelPool::new(2, || 0u64, |n: &mut u64| *n = 0);
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&pool.metrics(), "conns", Some(&tags)).unwrap();
    /// assert!(output.contains("sizepool_objects_available"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            labels.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace("sizepool")
                .const_labels(labels.clone())
        };
        let registry = Registry::new();

        // Gauge metrics
        let gauges = [
            ("objects_available", "Current available objects", metrics.available_objects),
            ("objects_checked_out", "Objects currently held by callers", metrics.checked_out),
            ("capacity", "Configured pool capacity", metrics.max_capacity),
            ("closed", "1 once the pool is closed", usize::from(metrics.closed)),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(opts(name, help)).map_err(export_error)?;
            gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
            registry.register(Box::new(gauge)).map_err(export_error)?;
        }

        let utilization =
            Gauge::with_opts(opts("utilization", "Pool utilization ratio")).map_err(export_error)?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization)).map_err(export_error)?;

        // Counter metrics
        let counters = [
            ("objects_retrieved_total", "Total objects retrieved", metrics.total_retrieved),
            ("objects_returned_total", "Total objects returned", metrics.total_returned),
            ("events_exhausted_total", "Retrievals that found the pool empty", metrics.exhausted_events),
            ("validation_failures_total", "Validation failures", metrics.validation_failures),
            ("returns_rejected_total", "Returns refused by a full or closed pool", metrics.rejected_returns),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(opts(name, help)).map_err(export_error)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter)).map_err(export_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(export_error)?;
        String::from_utf8(buffer).map_err(export_error)
    }
}

#[cfg(feature = "metrics")]
fn export_error(err: impl std::fmt::Display) -> PoolError {
    PoolError::MetricsExport(err.to_string())
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_retrieved: AtomicUsize,
    pub total_returned: AtomicUsize,
    pub exhausted_events: AtomicUsize,
    pub validation_failures: AtomicUsize,
    pub rejected_returns: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, available: usize, capacity: usize) -> PoolMetrics {
        let checked_out = capacity.saturating_sub(available);
        let utilization = if capacity > 0 {
            checked_out as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_retrieved: self.total_retrieved.load(Ordering::Relaxed),
            total_returned: self.total_returned.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            rejected_returns: self.rejected_returns.load(Ordering::Relaxed),
            available_objects: available,
            checked_out,
            utilization,
            max_capacity: capacity,
            closed: false,
        }
    }

    /// Snapshot for a closed pool: nothing is idle and nothing counts as
    /// checked out, since the pool will never take items back.
    pub fn closed_metrics(&self, capacity: usize) -> PoolMetrics {
        PoolMetrics {
            checked_out: 0,
            utilization: 0.0,
            closed: true,
            ..self.get_metrics(0, capacity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_saturates_when_overfilled() {
        let tracker = MetricsTracker::new();
        MetricsTracker::record(&tracker.total_returned);

        let metrics = tracker.get_metrics(5, 4);
        assert_eq!(metrics.checked_out, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert_eq!(metrics.total_returned, 1);
    }

    #[test]
    fn test_export_map() {
        let tracker = MetricsTracker::new();
        let exported = tracker.get_metrics(1, 4).export();
        assert_eq!(exported["checked_out"], "3");
        assert_eq!(exported["utilization"], "0.75");
        assert_eq!(exported["closed"], "false");
    }

    #[test]
    fn test_closed_snapshot_is_idle() {
        let tracker = MetricsTracker::new();
        MetricsTracker::record(&tracker.total_retrieved);

        let metrics = tracker.closed_metrics(4);
        assert!(metrics.closed);
        assert_eq!(metrics.available_objects, 0);
        assert_eq!(metrics.checked_out, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert_eq!(metrics.max_capacity, 4);
        assert_eq!(metrics.total_retrieved, 1);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_prometheus_rejects_bad_label() {
        let tracker = MetricsTracker::new();
        let mut tags = HashMap::new();
        tags.insert("not a label".to_string(), "x".to_string());

        let result = MetricsExporter::export_prometheus(&tracker.get_metrics(1, 1), "p", Some(&tags));
        assert!(matches!(result, Err(PoolError::MetricsExport(_))));
    }
}
