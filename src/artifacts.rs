//! Startup artifact bundle
//!
//! Everything the serving layer needs at startup comes from one artifact
//! directory written at training time: the raw-input schema, the feature
//! manifest, the decision thresholds, the model identity, and the
//! scorecard coefficients. All of it is loaded exactly once, validated,
//! and shared read-only for the process lifetime.
//!
//! A built-in credit-application bundle is included so the service and
//! its tests run without an external artifact directory.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

use crate::contracts::{DecisionThresholds, FeatureManifest, FieldKind, ModelIdentity, RawSchema};
use crate::error::{Result, ServingError};
use crate::model::ScorecardSpec;

/// File names inside an artifact directory.
const RAW_SCHEMA_FILE: &str = "raw_schema.json";
const FEATURE_SCHEMA_FILE: &str = "feature_schema.json";
const THRESHOLD_FILE: &str = "decision_threshold.json";
const METADATA_FILE: &str = "model_metadata.json";
const SCORECARD_FILE: &str = "scorecard.json";

/// All startup artifacts, loaded and validated together.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    /// Raw-input field contract
    pub raw_schema: RawSchema,
    /// Ordered feature-name manifest
    pub manifest: FeatureManifest,
    /// Decision thresholds over probability of default
    pub thresholds: DecisionThresholds,
    /// Model name/version reported with every decision
    pub identity: ModelIdentity,
    /// Scorecard coefficients for the bundled model and explainer
    pub scorecard: ScorecardSpec,
}

#[derive(Debug, Deserialize)]
struct ThresholdFile {
    #[serde(default = "default_approve")]
    approve: f64,
    #[serde(default = "default_conditional")]
    conditional: f64,
}

fn default_approve() -> f64 {
    0.3
}

fn default_conditional() -> f64 {
    0.6
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| ServingError::artifact(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| ServingError::artifact(format!("cannot parse {}: {e}", path.display())))
}

impl ArtifactBundle {
    /// Load and validate a bundle from an artifact directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let raw_schema: RawSchema = read_json(dir, RAW_SCHEMA_FILE)?;
        let manifest: FeatureManifest = read_json(dir, FEATURE_SCHEMA_FILE)?;
        let thresholds: ThresholdFile = read_json(dir, THRESHOLD_FILE)?;
        let identity: ModelIdentity = read_json(dir, METADATA_FILE)?;
        let scorecard: ScorecardSpec = read_json(dir, SCORECARD_FILE)?;

        let thresholds = DecisionThresholds::new(thresholds.approve, thresholds.conditional)?;

        Ok(Self {
            raw_schema,
            manifest,
            thresholds,
            identity,
            scorecard,
        })
    }

    /// Built-in credit-application bundle.
    pub fn builtin() -> Self {
        let raw_schema = RawSchema::new()
            .with_field("person_age", FieldKind::Integer)
            .with_field("person_income", FieldKind::Float)
            .with_field("person_home_ownership", FieldKind::Categorical)
            .with_field("person_emp_length", FieldKind::Integer)
            .with_field("loan_intent", FieldKind::Categorical)
            .with_field("loan_grade", FieldKind::Categorical)
            .with_field("loan_amnt", FieldKind::Float)
            .with_field("loan_int_rate", FieldKind::Float)
            .with_field("loan_percent_income", FieldKind::Float)
            .with_field("cb_person_default_on_file", FieldKind::Categorical)
            .with_field("cb_person_cred_hist_length", FieldKind::Integer);

        let manifest = FeatureManifest::new(
            builtin_features()
                .iter()
                .map(|(name, _, _)| name.to_string())
                .collect(),
        );

        let scorecard = ScorecardSpec {
            intercept: -2.0,
            weights: builtin_features()
                .iter()
                .map(|(name, weight, _)| (name.to_string(), *weight))
                .collect(),
            baseline: builtin_features()
                .iter()
                .map(|(name, _, baseline)| (name.to_string(), *baseline))
                .collect(),
        };

        Self {
            raw_schema,
            manifest,
            thresholds: DecisionThresholds::new(0.3, 0.6)
                .expect("builtin thresholds are ordered"),
            identity: ModelIdentity::new("gradient_boosting_scorecard", "1.0.0"),
            scorecard,
        }
    }
}

/// `(feature name, coefficient, baseline)` for the built-in scorecard.
///
/// Coefficients are scaled to the raw feature units (income in currency,
/// rate in percent), so the log-odds stay in a sensible range for
/// realistic applications.
fn builtin_features() -> &'static [(&'static str, f64, f64)] {
    &[
        ("person_age", -0.01, 27.0),
        ("person_income", -0.000008, 66000.0),
        ("person_emp_length", -0.03, 4.7),
        ("loan_amnt", 0.00002, 9600.0),
        ("loan_int_rate", 0.08, 11.0),
        ("loan_percent_income", 2.5, 0.17),
        ("cb_person_cred_hist_length", -0.02, 5.8),
        ("person_home_ownership_MORTGAGE", -0.25, 0.41),
        ("person_home_ownership_OTHER", 0.15, 0.02),
        ("person_home_ownership_OWN", -0.30, 0.07),
        ("person_home_ownership_RENT", 0.35, 0.50),
        ("loan_intent_DEBTCONSOLIDATION", 0.20, 0.16),
        ("loan_intent_EDUCATION", -0.05, 0.20),
        ("loan_intent_HOMEIMPROVEMENT", 0.10, 0.11),
        ("loan_intent_MEDICAL", 0.25, 0.19),
        ("loan_intent_PERSONAL", 0.10, 0.17),
        ("loan_intent_VENTURE", -0.10, 0.17),
        ("loan_grade_A", -0.60, 0.33),
        ("loan_grade_B", -0.10, 0.32),
        ("loan_grade_C", 0.10, 0.20),
        ("loan_grade_D", 0.40, 0.11),
        ("loan_grade_E", 0.70, 0.03),
        ("loan_grade_F", 1.00, 0.007),
        ("loan_grade_G", 1.30, 0.002),
        ("cb_person_default_on_file_N", -0.20, 0.82),
        ("cb_person_default_on_file_Y", 0.45, 0.18),
    ]
}
