//! Memoized post-hoc explanations
//!
//! Explanations are expensive, so the engine memoizes them behind a
//! content-addressed cache: the key is a SHA-256 over the canonical
//! (sorted field name → value) serialization of a single-row feature
//! vector. The cache is bounded with least-recently-used eviction and
//! guarantees at-most-one computation per distinct key under concurrent
//! misses — each entry is a shared once-cell, so late arrivals for a key
//! await the first caller's computation instead of repeating it.
//!
//! The underlying explainer is built lazily, exactly once, from a factory
//! resolved at startup. A deployment without the capability yields
//! `CapabilityUnavailable` before any cache work happens.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use crate::contracts::FeatureTable;
use crate::error::{Result, ServingError};

/// Default number of entries on each side of an explanation.
pub const DEFAULT_TOP_K: usize = 5;

/// Default cache capacity (distinct feature vectors).
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Per-feature attribution scores for one feature vector.
///
/// The explanation generator is an optional external capability; it
/// returns one signed impact value per manifest feature.
pub trait Explainer: Send + Sync {
    /// Attribution scores for a single-row feature table, one value per
    /// column, in column order. Positive impact pushes toward default.
    fn attributions(&self, features: &FeatureTable) -> Result<Vec<f64>>;
}

/// One ranked attribution entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    /// Feature name from the manifest
    pub feature: String,
    /// Signed impact, rounded to 4 decimal places
    pub impact: f64,
}

/// Ranked explanation for one feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Top-k features pushing the score toward default, impact descending
    pub risk_drivers: Vec<FeatureImpact>,
    /// Bottom-k features pulling the score away from default, impact
    /// ascending
    pub protective_factors: Vec<FeatureImpact>,
}

/// Content-addressed key for a single-row feature vector.
///
/// Canonicalizes the row into a sorted name → value mapping before
/// hashing, so the key is independent of column order.
pub fn vector_fingerprint(features: &FeatureTable) -> Result<String> {
    use sha2::{Digest, Sha256};

    let row = features
        .row(0)
        .ok_or_else(|| ServingError::invalid_input("cannot fingerprint an empty feature table"))?;

    let canonical: BTreeMap<&str, f64> = features
        .columns()
        .iter()
        .map(String::as_str)
        .zip(row.iter().copied())
        .collect();

    let payload = serde_json::to_vec(&canonical)
        .map_err(|e| ServingError::internal(format!("fingerprint serialization failed: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(hex::encode(hasher.finalize()))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Rank raw attribution scores into risk drivers and protective factors.
fn rank_attributions(columns: &[String], impacts: &[f64], top_k: usize) -> Explanation {
    let mut ranked: Vec<(usize, f64)> = impacts.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let risk_drivers = ranked
        .iter()
        .take(top_k)
        .map(|&(i, impact)| FeatureImpact {
            feature: columns[i].clone(),
            impact: round4(impact),
        })
        .collect();

    // Bottom-k of the descending ranking, re-sorted ascending so the
    // strongest protective feature comes first.
    let tail_start = ranked.len().saturating_sub(top_k);
    let mut tail: Vec<(usize, f64)> = ranked[tail_start..].to_vec();
    tail.sort_by(|a, b| a.1.total_cmp(&b.1));
    let protective_factors = tail
        .into_iter()
        .map(|(i, impact)| FeatureImpact {
            feature: columns[i].clone(),
            impact: round4(impact),
        })
        .collect();

    Explanation {
        risk_drivers,
        protective_factors,
    }
}

type EntryCell = Arc<OnceCell<Explanation>>;

struct CacheState {
    entries: HashMap<String, EntryCell>,
    /// LRU order; front = oldest. Kept exact: a touched key is moved to
    /// the back, so eviction is a plain pop from the front.
    order: VecDeque<String>,
}

/// Bounded, content-addressed memoization over feature vectors.
///
/// Thread-safe: the map is guarded by a mutex held only for O(capacity)
/// bookkeeping, never across the computation itself. Concurrent misses
/// for one key share a single in-flight computation (single-flight); a
/// failed computation caches nothing, so the next caller retries.
pub struct ExplanationCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for ExplanationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplanationCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl ExplanationCache {
    /// Create a cache holding at most `capacity` distinct vectors.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of entries currently tracked (including in-flight ones).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the explanation for `key`, computing it at most once across
    /// concurrent callers.
    ///
    /// The entry cell is claimed (and the LRU order updated) under the
    /// lock; the computation itself runs outside it. Waiters for the same
    /// key await the first caller's cell instead of recomputing.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<Explanation>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Explanation>>,
    {
        let cell = {
            let mut state = self.lock();
            if let Some(cell) = state.entries.get(key) {
                let cell = Arc::clone(cell);
                // Touch: move the key to the back of the eviction order.
                if let Some(pos) = state.order.iter().position(|k| k == key) {
                    state.order.remove(pos);
                }
                state.order.push_back(key.to_string());
                cell
            } else {
                let cell: EntryCell = Arc::new(OnceCell::new());
                state.entries.insert(key.to_string(), Arc::clone(&cell));
                state.order.push_back(key.to_string());
                while state.entries.len() > self.capacity {
                    let Some(oldest) = state.order.pop_front() else {
                        break;
                    };
                    state.entries.remove(&oldest);
                }
                cell
            }
        };

        cell.get_or_try_init(compute).await.cloned()
    }
}

/// Factory resolved at startup; absent when the deployment lacks the
/// explanation capability.
pub type ExplainerFactory = Box<dyn Fn() -> Result<Arc<dyn Explainer>> + Send + Sync>;

/// Serving-layer entry point for explanations.
///
/// Owns the capability flag, the lazily-built explainer, and the cache.
pub struct ExplanationEngine {
    factory: Option<ExplainerFactory>,
    explainer: OnceCell<Arc<dyn Explainer>>,
    cache: ExplanationCache,
    top_k: usize,
}

impl std::fmt::Debug for ExplanationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplanationEngine")
            .field("available", &self.available())
            .field("top_k", &self.top_k)
            .field("cache", &self.cache)
            .finish()
    }
}

impl ExplanationEngine {
    /// Create an engine; pass `None` when the capability is not present
    /// in this deployment.
    pub fn new(factory: Option<ExplainerFactory>) -> Self {
        Self {
            factory,
            explainer: OnceCell::new(),
            cache: ExplanationCache::new(DEFAULT_CACHE_CAPACITY),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override the number of entries on each side of the explanation.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Override the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = ExplanationCache::new(capacity);
        self
    }

    /// Whether the explanation capability is present.
    pub fn available(&self) -> bool {
        self.factory.is_some()
    }

    /// Entries currently cached.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Explain a single-row feature table.
    ///
    /// Fails with a validation error for multi-row input and with
    /// `CapabilityUnavailable` when no explainer factory was configured.
    /// On a cache hit the stored explanation is returned unchanged; on a
    /// miss the explainer (built at most once) is invoked, its scores
    /// ranked, and the result stored.
    pub async fn explain(&self, features: &FeatureTable) -> Result<Explanation> {
        if !features.is_single() {
            return Err(ServingError::invalid_input(format!(
                "explanations support single-record input only, got {} rows",
                features.row_count()
            )));
        }

        let factory = self.factory.as_ref().ok_or_else(|| {
            ServingError::capability_unavailable(
                "explanation generator is not available in this runtime",
            )
        })?;

        let key = vector_fingerprint(features)?;
        self.cache
            .get_or_compute(&key, || async {
                let explainer = self
                    .explainer
                    .get_or_try_init(|| async { factory() })
                    .await?;
                let impacts = explainer.attributions(features)?;
                if impacts.len() != features.column_count() {
                    return Err(ServingError::internal(format!(
                        "explainer returned {} impacts for {} features",
                        impacts.len(),
                        features.column_count()
                    )));
                }
                Ok(rank_attributions(features.columns(), &impacts, self.top_k))
            })
            .await
    }
}
