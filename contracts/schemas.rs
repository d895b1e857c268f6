//! Schema contract definitions for the serving layer
//!
//! Declares the two authoritative contracts every request is checked
//! against: the raw-input field set (`RawSchema`) and the ordered feature
//! manifest the model expects (`FeatureManifest`), together with the value
//! types that flow between them.
//!
//! All contract types here are loaded once at startup and shared read-only
//! for the process lifetime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, ServingError};

/// A scalar value in a raw application record.
///
/// Raw payloads carry integers, floating-point numbers, and short
/// categorical strings; nothing else is accepted at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer field (e.g. `person_age`)
    Int(i64),
    /// Floating-point field (e.g. `loan_int_rate`)
    Float(f64),
    /// Categorical field (e.g. `person_home_ownership`)
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value; `None` for categorical text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    /// Categorical view of the value; `None` for numeric fields.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Expected type of a raw field, declared by the raw schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Whole-number field
    Integer,
    /// Floating-point field
    Float,
    /// Short categorical string field
    Categorical,
}

impl FieldKind {
    /// Whether this kind carries a numeric value.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float)
    }
}

/// One applicant's unprocessed input fields, keyed by field name.
///
/// A batch is an ordered sequence of records sharing one schema; every
/// record in a batch is expected to expose the same field set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Whether the record carries the named field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The raw-input contract: field name to expected kind.
///
/// Immutable and process-wide; loaded once at startup. Validation only
/// requires declared fields to be *present* — undeclared extras are
/// tolerated so upstream producers can version payloads ahead of the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSchema {
    fields: BTreeMap<String, FieldKind>,
}

impl RawSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field.
    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Kind of a declared field, if any.
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).copied()
    }

    /// Iterate over declared `(name, kind)` pairs in name order.
    pub fn declared_fields(&self) -> impl Iterator<Item = (&String, FieldKind)> {
        self.fields.iter().map(|(n, k)| (n, *k))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The model's exact input contract: an ordered feature-name list plus the
/// expected count.
///
/// The count is stored separately from `names.len()` on purpose: it is read
/// from the same artifact bundle as the model and double-checked against
/// the engineered table so a corrupted manifest or a duplicated column
/// surfaces instead of silently shifting model input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureManifest {
    /// Ordered feature names the model was trained on
    #[serde(rename = "feature_names")]
    names: Vec<String>,
    /// Expected feature count from the artifact bundle
    #[serde(rename = "num_features")]
    expected_count: usize,
}

impl FeatureManifest {
    /// Create a manifest whose expected count matches the name list.
    pub fn new(names: Vec<String>) -> Self {
        let expected_count = names.len();
        Self {
            names,
            expected_count,
        }
    }

    /// Create a manifest with an explicit expected count (as read from the
    /// artifact bundle).
    pub fn with_expected_count(names: Vec<String>, expected_count: usize) -> Self {
        Self {
            names,
            expected_count,
        }
    }

    /// Ordered feature names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Expected feature count.
    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Whether the manifest declares the named feature.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Numeric feature table consumed directly by the scoring model.
///
/// One row per input record, columns exactly equal to the feature manifest.
/// Row width is enforced at construction; column-set conformance is checked
/// separately by `validation::validate_features`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Build a table, rejecting rows whose width differs from the column
    /// count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ServingError::internal(format!(
                    "feature row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Column names in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds exactly one row (a feature vector).
    pub fn is_single(&self) -> bool {
        self.rows.len() == 1
    }

    /// Row by index.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Iterate over rows in input order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Decision thresholds `(approve, conditional)` over probability of
/// default.
///
/// Invariant: `0 ≤ approve ≤ conditional ≤ 1`, enforced at construction;
/// loaded once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    approve: f64,
    conditional: f64,
}

impl DecisionThresholds {
    /// Build thresholds, rejecting unordered or out-of-range values.
    pub fn new(approve: f64, conditional: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&approve) || !(0.0..=1.0).contains(&conditional) {
            return Err(ServingError::artifact(format!(
                "decision thresholds must lie in [0, 1]: approve={approve}, conditional={conditional}"
            )));
        }
        if approve > conditional {
            return Err(ServingError::artifact(format!(
                "approve threshold {approve} exceeds conditional threshold {conditional}"
            )));
        }
        Ok(Self {
            approve,
            conditional,
        })
    }

    /// Upper bound (exclusive) of the approve band.
    pub fn approve(&self) -> f64 {
        self.approve
    }

    /// Upper bound (exclusive) of the conditional-approval band.
    pub fn conditional(&self) -> f64 {
        self.conditional
    }
}

/// Identity of the loaded model, reported verbatim in every decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    /// Model name from the artifact bundle
    pub model_name: String,
    /// Model version from the artifact bundle
    pub model_version: String,
}

impl ModelIdentity {
    /// Create a model identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            model_name: name.into(),
            model_version: version.into(),
        }
    }
}
