//! Metrics sink injected into the pool and the GitHub gateway.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const RATE_LIMIT_HITS: &str = "github_rate_limit_hits_total";
pub const EFFECTIVE_ETAGS: &str = "github_effective_etag_uses_total";
pub const AVAILABLE_TOKENS: &str = "github_available_tokens";
pub const INVALIDATED_TOKENS: &str = "github_invalidated_tokens_total";
pub const RATE_LIMIT_REMAINING: &str = "github_rate_limit_remaining";
pub const CHARTS_CACHED: &str = "charts_served_from_cache_total";
pub const CHARTS_RENDERED: &str = "charts_rendered_total";
pub const CHARTS_FALLBACK: &str = "charts_fallback_total";

/// Receiver for named counters and gauges.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &'static str);

    /// Sets a gauge, optionally scoped to a label such as a token suffix.
    fn gauge(&self, name: &'static str, label: Option<&str>, value: f64);
}

/// Point-in-time copy of an [`InMemoryMetrics`] registry.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
}

/// Keeps counters and gauges in memory so the health endpoint (and tests) can
/// read them back.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.snapshot().counters.get(name).copied().unwrap_or(0)
    }

    pub fn gauge_value(&self, name: &str, label: Option<&str>) -> Option<f64> {
        self.snapshot().gauges.get(&gauge_key(name, label)).copied()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &'static str) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard.counters.entry(name.to_string()).or_insert(0) += 1;
    }

    fn gauge(&self, name: &'static str, label: Option<&str>, value: f64) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.gauges.insert(gauge_key(name, label), value);
    }
}

fn gauge_key(name: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{}{{{}}}", name, label),
        None => name.to_string(),
    }
}
