//! Scoring model collaborators
//!
//! The serving layer treats the model as an opaque function behind the
//! `ScoringModel` trait: class labels always, a calibrated probability
//! only when the model exposes one. `LogisticScorecard` is the bundled
//! default — a logistic model over the manifest's features whose
//! coefficients double as the explanation capability
//! (`ScorecardExplainer`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::contracts::{FeatureManifest, FeatureTable};
use crate::error::{Result, ServingError};
use crate::explain::Explainer;

/// Opaque pre-trained scoring model.
pub trait ScoringModel: Send + Sync {
    /// Predicted class label per row (1 = default).
    fn predict(&self, features: &FeatureTable) -> Result<Vec<i64>>;

    /// Probability of default per row, or `None` when the model exposes
    /// no calibrated probability.
    fn predict_proba(&self, features: &FeatureTable) -> Result<Option<Vec<f64>>>;
}

/// Serialized scorecard artifact: intercept plus per-feature weights and
/// baselines, keyed by feature name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardSpec {
    /// Model intercept
    pub intercept: f64,
    /// Feature name → trained coefficient
    pub weights: BTreeMap<String, f64>,
    /// Feature name → training-population mean, the attribution baseline
    #[serde(default)]
    pub baseline: BTreeMap<String, f64>,
}

impl ScorecardSpec {
    /// Resolve the spec against a manifest into aligned weight/baseline
    /// vectors, rejecting a spec that does not cover every feature.
    fn resolve(&self, manifest: &FeatureManifest) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut weights = Vec::with_capacity(manifest.names().len());
        let mut baseline = Vec::with_capacity(manifest.names().len());

        for name in manifest.names() {
            let weight = self.weights.get(name).ok_or_else(|| {
                ServingError::artifact(format!("scorecard is missing a weight for feature {name}"))
            })?;
            weights.push(*weight);
            baseline.push(self.baseline.get(name).copied().unwrap_or(0.0));
        }
        Ok((weights, baseline))
    }
}

/// Logistic regression scorecard aligned to the feature manifest.
#[derive(Debug, Clone)]
pub struct LogisticScorecard {
    intercept: f64,
    weights: Vec<f64>,
    baseline: Vec<f64>,
    classification_threshold: f64,
}

impl LogisticScorecard {
    /// Build a scorecard from its artifact spec, aligned to the manifest
    /// order.
    pub fn from_spec(spec: &ScorecardSpec, manifest: &FeatureManifest) -> Result<Self> {
        let (weights, baseline) = spec.resolve(manifest)?;
        Ok(Self {
            intercept: spec.intercept,
            weights,
            baseline,
            classification_threshold: 0.5,
        })
    }

    /// Per-feature attribution baseline, aligned to the manifest order.
    pub fn baseline(&self) -> &[f64] {
        &self.baseline
    }

    /// Trained coefficients, aligned to the manifest order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn check_width(&self, features: &FeatureTable) -> Result<()> {
        if features.column_count() != self.weights.len() {
            return Err(ServingError::internal(format!(
                "scorecard was trained on {} features, table has {}",
                self.weights.len(),
                features.column_count()
            )));
        }
        Ok(())
    }

    fn probability(&self, row: &[f64]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ScoringModel for LogisticScorecard {
    fn predict(&self, features: &FeatureTable) -> Result<Vec<i64>> {
        self.check_width(features)?;
        Ok(features
            .rows()
            .map(|row| i64::from(self.probability(row) >= self.classification_threshold))
            .collect())
    }

    fn predict_proba(&self, features: &FeatureTable) -> Result<Option<Vec<f64>>> {
        self.check_width(features)?;
        Ok(Some(
            features.rows().map(|row| self.probability(row)).collect(),
        ))
    }
}

/// Linear attribution over the scorecard's coefficients.
///
/// Each feature's impact is `weight * (value - baseline)`: the signed
/// contribution of that feature's deviation from the training-population
/// mean to the log-odds of default.
#[derive(Debug, Clone)]
pub struct ScorecardExplainer {
    weights: Vec<f64>,
    baseline: Vec<f64>,
}

impl ScorecardExplainer {
    /// Build the explainer from an already-resolved scorecard.
    pub fn from_scorecard(scorecard: &LogisticScorecard) -> Self {
        Self {
            weights: scorecard.weights().to_vec(),
            baseline: scorecard.baseline().to_vec(),
        }
    }
}

impl Explainer for ScorecardExplainer {
    fn attributions(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        let row = features
            .row(0)
            .ok_or_else(|| ServingError::invalid_input("cannot explain an empty feature table"))?;
        if row.len() != self.weights.len() {
            return Err(ServingError::internal(format!(
                "explainer was built for {} features, table has {}",
                self.weights.len(),
                row.len()
            )));
        }
        Ok(self
            .weights
            .iter()
            .zip(self.baseline.iter())
            .zip(row)
            .map(|((w, b), x)| w * (x - b))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> FeatureManifest {
        FeatureManifest::new(vec!["a".to_string(), "b".to_string()])
    }

    fn spec() -> ScorecardSpec {
        ScorecardSpec {
            intercept: -1.0,
            weights: [("a".to_string(), 2.0), ("b".to_string(), -0.5)]
                .into_iter()
                .collect(),
            baseline: [("a".to_string(), 1.0), ("b".to_string(), 0.0)]
                .into_iter()
                .collect(),
        }
    }

    fn table(rows: Vec<Vec<f64>>) -> FeatureTable {
        FeatureTable::new(vec!["a".to_string(), "b".to_string()], rows).unwrap()
    }

    #[test]
    fn test_spec_resolution_follows_manifest_order() {
        let scorecard = LogisticScorecard::from_spec(&spec(), &manifest()).unwrap();
        assert_eq!(scorecard.weights(), &[2.0, -0.5]);
        assert_eq!(scorecard.baseline(), &[1.0, 0.0]);
    }

    #[test]
    fn test_spec_missing_weight_is_artifact_error() {
        let manifest = FeatureManifest::new(vec!["a".to_string(), "missing".to_string()]);
        let err = LogisticScorecard::from_spec(&spec(), &manifest).unwrap_err();
        assert!(matches!(err, ServingError::Artifact(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_probability_and_label_agree() {
        let scorecard = LogisticScorecard::from_spec(&spec(), &manifest()).unwrap();
        let features = table(vec![vec![0.0, 0.0], vec![2.0, 0.0]]);

        let probabilities = scorecard.predict_proba(&features).unwrap().unwrap();
        let labels = scorecard.predict(&features).unwrap();

        // z = -1.0 → p < 0.5 → label 0; z = 3.0 → p > 0.5 → label 1.
        assert!(probabilities[0] < 0.5);
        assert!(probabilities[1] > 0.5);
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn test_width_mismatch_is_internal_error() {
        let scorecard = LogisticScorecard::from_spec(&spec(), &manifest()).unwrap();
        let narrow = FeatureTable::new(vec!["a".to_string()], vec![vec![1.0]]).unwrap();
        assert!(matches!(
            scorecard.predict(&narrow).unwrap_err(),
            ServingError::Internal(_)
        ));
    }

    #[test]
    fn test_explainer_attributions_are_deviation_weighted() {
        let scorecard = LogisticScorecard::from_spec(&spec(), &manifest()).unwrap();
        let explainer = ScorecardExplainer::from_scorecard(&scorecard);

        let features = table(vec![vec![2.0, 4.0]]);
        let impacts = explainer.attributions(&features).unwrap();

        // a: 2.0 * (2.0 - 1.0) = 2.0; b: -0.5 * (4.0 - 0.0) = -2.0.
        assert_eq!(impacts, vec![2.0, -2.0]);
    }

    #[test]
    fn test_explainer_at_baseline_is_neutral() {
        let scorecard = LogisticScorecard::from_spec(&spec(), &manifest()).unwrap();
        let explainer = ScorecardExplainer::from_scorecard(&scorecard);

        let features = table(vec![vec![1.0, 0.0]]);
        assert_eq!(explainer.attributions(&features).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }
}
