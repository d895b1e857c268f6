//! Process-wide serving metrics
//!
//! A single mutex-guarded store aggregates request counters, a streaming
//! latency mean, and a per-decision histogram across concurrent requests.
//! Every mutation is one short critical section; `snapshot` copies the
//! whole aggregate under the same lock, so a reader never observes a
//! total/average pair from two different prefixes of the event stream.
//!
//! Counters are process-lifetime only; nothing here persists across
//! restarts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Request counters.
#[derive(Debug, Default, Clone)]
struct RequestCounters {
    total: u64,
    single: u64,
    batch_records: u64,
}

/// Streaming latency statistics in milliseconds.
#[derive(Debug, Default, Clone)]
struct LatencyStats {
    average: f64,
    last: f64,
    count: u64,
}

#[derive(Debug, Default)]
struct MetricsInner {
    requests: RequestCounters,
    latency: LatencyStats,
    decisions: BTreeMap<String, u64>,
}

/// Concurrency-safe metrics aggregator shared across the serving layer.
#[derive(Debug, Default)]
pub struct MetricsStore {
    inner: Mutex<MetricsInner>,
}

impl MetricsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means a panic elsewhere while counting; the
    /// counters carry no invariant worth refusing service over.
    fn lock(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one handled request with its duration in milliseconds.
    ///
    /// Updates the streaming mean incrementally from the new sample and
    /// the sample count, so the average is exact regardless of call order.
    pub fn record_request(&self, duration_ms: f64) {
        let mut inner = self.lock();
        inner.requests.total += 1;
        inner.latency.last = duration_ms;
        inner.latency.count += 1;
        let n = inner.latency.count as f64;
        inner.latency.average = (inner.latency.average * (n - 1.0) + duration_ms) / n;
    }

    /// Record one single-prediction request.
    pub fn record_single(&self) {
        self.lock().requests.single += 1;
    }

    /// Add `size` records to the batch-record counter.
    pub fn record_batch(&self, size: usize) {
        self.lock().requests.batch_records += size as u64;
    }

    /// Increment the occurrence counter for a decision label.
    ///
    /// A blank label is a no-op.
    pub fn record_decision(&self, label: &str) {
        if label.is_empty() {
            return;
        }
        *self.lock().decisions.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Point-in-time copy of all counters, taken under one lock.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        MetricsSnapshot {
            requests: RequestSnapshot {
                total: inner.requests.total,
                single: inner.requests.single,
                batch_records: inner.requests.batch_records,
            },
            latency_ms: LatencySnapshot {
                average: round2(inner.latency.average),
                last: round2(inner.latency.last),
            },
            decisions: inner.decisions.clone(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Immutable point-in-time view of the metrics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Request counters
    pub requests: RequestSnapshot,
    /// Latency statistics, rounded to 2 decimal places
    pub latency_ms: LatencySnapshot,
    /// Decision label → occurrence count
    pub decisions: BTreeMap<String, u64>,
}

/// Request counters as of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Total requests handled
    pub total: u64,
    /// Single-prediction requests
    pub single: u64,
    /// Records scored through batch requests
    pub batch_records: u64,
}

/// Latency statistics as of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySnapshot {
    /// Streaming mean over all recorded requests
    pub average: f64,
    /// Most recently recorded duration
    pub last: f64,
}
