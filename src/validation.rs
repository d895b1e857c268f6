//! Contract validation for raw records and engineered features
//!
//! Two independent, pure checks guard the serving path: the raw-input
//! schema check (before any processing) and the feature-manifest check
//! (after feature engineering, before the model sees the table). Both
//! collect every violation they find and report them in a single error.
//!
//! Batch requests are validated once against the whole batch, never once
//! per record: every row gets identical treatment and the cost stays flat.

use std::collections::BTreeSet;

use crate::contracts::{FeatureManifest, FeatureTable, RawRecord, RawSchema};
use crate::error::{Result, ServingError};

/// Maximum accepted batch size, bound checked before any processing.
pub const MAX_BATCH_SIZE: usize = 500;

/// Reject empty and oversize batches before any processing happens.
pub fn validate_batch_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(ServingError::invalid_input("Batch is empty"));
    }
    if size > MAX_BATCH_SIZE {
        return Err(ServingError::invalid_input(format!(
            "Batch size {size} exceeds maximum limit of {MAX_BATCH_SIZE} records"
        )));
    }
    Ok(())
}

/// Check every record in the batch against the raw-input schema.
///
/// Every field the schema declares must be present in every record; all
/// missing fields across the whole batch are collected into one
/// `ServingError::Schema`. Fields the schema does not declare are
/// tolerated — intentional permissiveness so upstream producers can ship
/// payload additions before the model is retrained.
pub fn validate_raw(batch: &[RawRecord], schema: &RawSchema) -> Result<()> {
    let mut missing = BTreeSet::new();

    for record in batch {
        for (name, _kind) in schema.declared_fields() {
            if !record.contains(name) {
                missing.insert(name.clone());
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServingError::Schema {
            missing: missing.into_iter().collect(),
        })
    }
}

/// Check an engineered feature table against the model's manifest.
///
/// Three checks run before anything is reported, so one call surfaces
/// every violation at once:
/// - `missing`: manifest columns absent from the table,
/// - `extra`: table columns the manifest does not declare,
/// - column count against the manifest's expected count — checked
///   independently of the name sets, so duplicated or collapsed columns
///   surface even when the sets otherwise match.
pub fn validate_features(table: &FeatureTable, manifest: &FeatureManifest) -> Result<()> {
    let missing: Vec<String> = manifest
        .names()
        .iter()
        .filter(|name| !table.columns().contains(name))
        .cloned()
        .collect();

    let extra: Vec<String> = table
        .columns()
        .iter()
        .filter(|column| !manifest.contains(column))
        .cloned()
        .collect();

    let count_mismatch = table.column_count() != manifest.expected_count();

    if missing.is_empty() && extra.is_empty() && !count_mismatch {
        Ok(())
    } else {
        Err(ServingError::FeatureContract {
            missing,
            extra,
            expected: manifest.expected_count(),
            actual: table.column_count(),
        })
    }
}
