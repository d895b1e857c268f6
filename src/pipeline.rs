//! Preprocessing pipeline: raw batch → validated feature table
//!
//! The cleaner and feature engineer are external collaborators behind
//! traits; the pipeline fixes the order of operations and guarantees each
//! stage runs exactly once per batch, whatever its size:
//!
//! 1. batch-size bounds, 2. raw schema validation, 3. cleaning,
//! 4. feature engineering, 5. feature-contract validation.
//!
//! A contract violation stops the pipeline before later stages run, so a
//! bad payload never reaches the feature engineer, let alone the model.

use std::sync::Arc;

use crate::contracts::{FeatureManifest, FeatureTable, FieldValue, RawRecord, RawSchema};
use crate::error::{Result, ServingError};
use crate::validation::{validate_batch_size, validate_features, validate_raw};

/// Normalizes a raw batch into canonical tabular form.
pub trait RecordCleaner: Send + Sync {
    /// Clean the whole batch at once, preserving record order.
    fn clean(&self, batch: &[RawRecord], schema: &RawSchema) -> Result<Vec<RawRecord>>;
}

/// Derives the numeric feature table from a cleaned batch.
pub trait FeatureEngineer: Send + Sync {
    /// Engineer the whole batch at once; the output columns are expected
    /// to satisfy the manifest (the pipeline re-checks).
    fn engineer(
        &self,
        batch: &[RawRecord],
        schema: &RawSchema,
        manifest: &FeatureManifest,
    ) -> Result<FeatureTable>;
}

/// Default cleaner: trims and upper-cases categorical values, passes
/// numeric fields through untouched. Fields the schema does not declare
/// are dropped here, which is what makes raw-payload extras harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalCleaner;

impl RecordCleaner for CanonicalCleaner {
    fn clean(&self, batch: &[RawRecord], schema: &RawSchema) -> Result<Vec<RawRecord>> {
        batch
            .iter()
            .map(|record| {
                let mut cleaned = RawRecord::new();
                for (name, _kind) in schema.declared_fields() {
                    let value = record.get(name).ok_or_else(|| {
                        ServingError::internal(format!(
                            "cleaner saw unvalidated record missing field {name}"
                        ))
                    })?;
                    let value = match value {
                        FieldValue::Text(s) => FieldValue::Text(s.trim().to_uppercase()),
                        other => other.clone(),
                    };
                    cleaned = cleaned.with_field(name.clone(), value);
                }
                Ok(cleaned)
            })
            .collect()
    }
}

/// Default feature engineer: numeric fields pass through under their own
/// name; categorical fields expand to the manifest's `{field}_{VALUE}`
/// one-hot columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneHotFeatureEngineer;

impl OneHotFeatureEngineer {
    fn cell(name: &str, record: &RawRecord, schema: &RawSchema) -> Result<f64> {
        // Direct numeric field.
        if let Some(kind) = schema.kind_of(name) {
            if kind.is_numeric() {
                return record
                    .get(name)
                    .and_then(FieldValue::as_f64)
                    .ok_or_else(|| {
                        ServingError::invalid_input(format!("field {name} must be numeric"))
                    });
            }
            return Err(ServingError::invalid_input(format!(
                "categorical field {name} cannot be used as a feature directly"
            )));
        }

        // One-hot column `{field}_{VALUE}` over a categorical field. The
        // longest matching declared field wins so names containing
        // underscores resolve unambiguously.
        let source = schema
            .declared_fields()
            .filter(|(field, kind)| {
                !kind.is_numeric()
                    && name.len() > field.len() + 1
                    && name.starts_with(field.as_str())
                    && name.as_bytes()[field.len()] == b'_'
            })
            .max_by_key(|(field, _)| field.len());

        let Some((field, _)) = source else {
            return Err(ServingError::invalid_input(format!(
                "feature {name} has no corresponding raw field"
            )));
        };

        let level = &name[field.len() + 1..];
        let value = record.get(field).and_then(FieldValue::as_text).ok_or_else(|| {
            ServingError::invalid_input(format!("field {field} must be categorical"))
        })?;
        Ok(f64::from(value == level))
    }
}

impl FeatureEngineer for OneHotFeatureEngineer {
    fn engineer(
        &self,
        batch: &[RawRecord],
        schema: &RawSchema,
        manifest: &FeatureManifest,
    ) -> Result<FeatureTable> {
        let columns: Vec<String> = manifest.names().to_vec();
        let rows = batch
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|name| Self::cell(name, record, schema))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;
        FeatureTable::new(columns, rows)
    }
}

/// The serving-side preprocessing pipeline.
///
/// Holds the immutable contracts and the collaborator seams; `prepare`
/// is pure with respect to shared state and safe for concurrent callers.
pub struct PreprocessPipeline {
    schema: Arc<RawSchema>,
    manifest: Arc<FeatureManifest>,
    cleaner: Arc<dyn RecordCleaner>,
    engineer: Arc<dyn FeatureEngineer>,
}

impl PreprocessPipeline {
    /// Assemble a pipeline from contracts and collaborators.
    pub fn new(
        schema: Arc<RawSchema>,
        manifest: Arc<FeatureManifest>,
        cleaner: Arc<dyn RecordCleaner>,
        engineer: Arc<dyn FeatureEngineer>,
    ) -> Self {
        Self {
            schema,
            manifest,
            cleaner,
            engineer,
        }
    }

    /// The raw-input schema this pipeline enforces.
    pub fn schema(&self) -> &RawSchema {
        &self.schema
    }

    /// The feature manifest this pipeline enforces.
    pub fn manifest(&self) -> &FeatureManifest {
        &self.manifest
    }

    /// Turn a raw batch into a validated, model-ready feature table.
    ///
    /// Every stage runs exactly once against the whole batch; all
    /// contract failures surface before any model work happens.
    pub fn prepare(&self, batch: &[RawRecord]) -> Result<FeatureTable> {
        validate_batch_size(batch.len())?;
        validate_raw(batch, &self.schema)?;

        let cleaned = self.cleaner.clean(batch, &self.schema)?;
        let features = self
            .engineer
            .engineer(&cleaned, &self.schema, &self.manifest)?;

        validate_features(&features, &self.manifest)?;
        Ok(features)
    }
}

impl std::fmt::Debug for PreprocessPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreprocessPipeline")
            .field("schema_fields", &self.schema.len())
            .field("manifest_features", &self.manifest.expected_count())
            .finish()
    }
}
