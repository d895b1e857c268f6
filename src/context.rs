//! Serving context: all startup state in one explicit object
//!
//! Replaces ambient singletons with a context constructed once in `main`
//! from the artifact bundle and passed by reference into every component.
//! Contracts are immutable; the metrics store and the explanation cache
//! are the only shared-mutable members and both serialize their own
//! mutations internally.

use std::sync::Arc;

use crate::artifacts::ArtifactBundle;
use crate::error::Result;
use crate::explain::{
    Explainer, ExplainerFactory, ExplanationEngine, DEFAULT_CACHE_CAPACITY, DEFAULT_TOP_K,
};
use crate::inference::InferenceService;
use crate::metrics::MetricsStore;
use crate::model::{LogisticScorecard, ScorecardExplainer};
use crate::pipeline::{CanonicalCleaner, OneHotFeatureEngineer, PreprocessPipeline};

/// Tunables resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServingConfig {
    /// Whether the explanation capability is enabled in this deployment
    pub explanations_enabled: bool,
    /// Entries on each side of an explanation
    pub explanation_top_k: usize,
    /// Distinct feature vectors the explanation cache retains
    pub explanation_cache_capacity: usize,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            explanations_enabled: true,
            explanation_top_k: DEFAULT_TOP_K,
            explanation_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Shared per-process serving state.
#[derive(Debug)]
pub struct ServingContext {
    /// Raw batch → validated feature table
    pub pipeline: PreprocessPipeline,
    /// Feature table → risk decisions
    pub inference: InferenceService,
    /// Memoized explanations
    pub explanations: ExplanationEngine,
    /// Process-wide request metrics
    pub metrics: Arc<MetricsStore>,
}

impl ServingContext {
    /// Build the context from an artifact bundle with the default
    /// in-process collaborators (canonical cleaner, one-hot engineer,
    /// logistic scorecard, scorecard explainer).
    pub fn from_bundle(bundle: ArtifactBundle, config: ServingConfig) -> Result<Arc<Self>> {
        let metrics = Arc::new(MetricsStore::new());

        let raw_schema = Arc::new(bundle.raw_schema);
        let manifest = Arc::new(bundle.manifest);

        let scorecard = LogisticScorecard::from_spec(&bundle.scorecard, &manifest)?;

        let pipeline = PreprocessPipeline::new(
            Arc::clone(&raw_schema),
            Arc::clone(&manifest),
            Arc::new(CanonicalCleaner),
            Arc::new(OneHotFeatureEngineer),
        );

        let explainer_factory: Option<ExplainerFactory> = if config.explanations_enabled {
            let source = scorecard.clone();
            Some(Box::new(move || {
                Ok(Arc::new(ScorecardExplainer::from_scorecard(&source)) as Arc<dyn Explainer>)
            }))
        } else {
            None
        };

        let inference = InferenceService::new(
            Arc::new(scorecard),
            bundle.identity,
            bundle.thresholds,
            Arc::clone(&metrics),
        );

        let explanations = ExplanationEngine::new(explainer_factory)
            .with_top_k(config.explanation_top_k)
            .with_cache_capacity(config.explanation_cache_capacity);

        Ok(Arc::new(Self {
            pipeline,
            inference,
            explanations,
            metrics,
        }))
    }
}
