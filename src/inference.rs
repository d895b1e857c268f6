//! Inference orchestration: feature table → risk decisions
//!
//! Wraps the opaque scoring model with the decision engine and the
//! metrics side effects. By the time a table reaches this service both
//! contracts have been validated, so only unexpected faults remain.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::contracts::{DecisionThresholds, FeatureTable, ModelIdentity};
use crate::decision::{decide, Decision};
use crate::error::{Result, ServingError};
use crate::metrics::MetricsStore;
use crate::model::ScoringModel;

/// One scored application: the decision band, the class label, the
/// probability that produced the band, and the model identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    /// Decision band derived from the probability
    pub decision: Decision,
    /// Predicted class label (1 = default)
    pub prediction: i64,
    /// Probability of default; `null` when the model exposes none
    pub probability_of_default: Option<f64>,
    /// Model name from the artifact bundle
    pub model_name: String,
    /// Model version from the artifact bundle
    pub model_version: String,
}

/// Scoring service shared across requests.
pub struct InferenceService {
    model: Arc<dyn ScoringModel>,
    identity: ModelIdentity,
    thresholds: DecisionThresholds,
    metrics: Arc<MetricsStore>,
}

impl InferenceService {
    /// Assemble the service from startup state.
    pub fn new(
        model: Arc<dyn ScoringModel>,
        identity: ModelIdentity,
        thresholds: DecisionThresholds,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        Self {
            model,
            identity,
            thresholds,
            metrics,
        }
    }

    /// Identity of the loaded model.
    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    /// Decision thresholds in force.
    pub fn thresholds(&self) -> &DecisionThresholds {
        &self.thresholds
    }

    /// Score a single-row feature table.
    pub fn score_single(&self, features: &FeatureTable, request_id: &str) -> Result<RiskDecision> {
        if !features.is_single() {
            return Err(ServingError::internal(format!(
                "score_single called with {} rows",
                features.row_count()
            )));
        }

        let mut results = self.score(features)?;
        let result = results
            .pop()
            .ok_or_else(|| ServingError::internal("model returned no prediction"))?;

        tracing::info!(
            request_id = %request_id,
            prediction = result.prediction,
            probability_of_default = ?result.probability_of_default.map(round4),
            decision = %result.decision,
            model = %self.identity.model_name,
            version = %self.identity.model_version,
            "Scored application"
        );
        Ok(result)
    }

    /// Score a multi-row feature table, preserving input order.
    pub fn score_batch(
        &self,
        features: &FeatureTable,
        request_id: &str,
    ) -> Result<Vec<RiskDecision>> {
        let results = self.score(features)?;

        tracing::info!(
            request_id = %request_id,
            batch_size = results.len(),
            model = %self.identity.model_name,
            version = %self.identity.model_version,
            "Scored batch"
        );
        Ok(results)
    }

    /// Run the model once over the whole table and derive per-row
    /// decisions, recording each decision label as a side effect.
    fn score(&self, features: &FeatureTable) -> Result<Vec<RiskDecision>> {
        let predictions = self.model.predict(features)?;
        if predictions.len() != features.row_count() {
            return Err(ServingError::internal(format!(
                "model returned {} predictions for {} rows",
                predictions.len(),
                features.row_count()
            )));
        }

        let probabilities = self.model.predict_proba(features)?;
        if let Some(p) = &probabilities {
            if p.len() != features.row_count() {
                return Err(ServingError::internal(format!(
                    "model returned {} probabilities for {} rows",
                    p.len(),
                    features.row_count()
                )));
            }
        }

        let results = predictions
            .into_iter()
            .enumerate()
            .map(|(i, prediction)| {
                let probability = probabilities.as_ref().map(|p| p[i]);
                let decision = decide(probability, &self.thresholds);
                self.metrics.record_decision(decision.as_str());
                RiskDecision {
                    decision,
                    prediction,
                    probability_of_default: probability,
                    model_name: self.identity.model_name.clone(),
                    model_version: self.identity.model_version.clone(),
                }
            })
            .collect();
        Ok(results)
    }
}

impl std::fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceService")
            .field("identity", &self.identity)
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
