//! Serving-layer contract definitions
//!
//! This module defines the immutable contracts the serving layer enforces
//! at its boundary:
//!
//! - `RawSchema`: the raw-input field set every application record must
//!   satisfy before any processing.
//! - `FeatureManifest`: the authoritative ordered feature-name list the
//!   model expects, with its expected count.
//! - `DecisionThresholds`: the two ordered probability cut points that
//!   turn a risk score into a decision band.
//! - `ModelIdentity`: the model name/version reported with every decision.
//!
//! # Design Principles
//!
//! - **Load once**: every contract is constructed at startup from the
//!   artifact bundle and shared read-only thereafter.
//! - **Fail loud**: contract construction validates its own invariants;
//!   a malformed artifact stops the process before it serves a request.
//! - **No ambient state**: contracts travel inside the serving context,
//!   never as globals.

pub mod schemas;

pub use schemas::{
    DecisionThresholds, FeatureManifest, FeatureTable, FieldKind, FieldValue, ModelIdentity,
    RawRecord, RawSchema,
};
