//! Risk Serving Layer
//!
//! The serving contract layer for a pre-trained credit risk scoring
//! model: turns a raw application record (or an ordered batch of them)
//! into a validated, model-ready feature table, converts the model's
//! continuous risk score into a discrete decision, aggregates operational
//! metrics across concurrent requests, and memoizes expensive post-hoc
//! explanations.
//!
//! ## Features
//!
//! - **Schema Contracts**: declarative raw-input field set and an
//!   authoritative ordered feature manifest, loaded once at startup
//! - **Contract Validation**: every violation in a request is collected
//!   and reported at once, before any model work happens
//! - **Decision Engine**: pure threshold bands over probability of
//!   default, with boundaries owned by the higher-risk band
//! - **Metrics Aggregation**: linearizable counters and a streaming
//!   latency mean, readable as an atomic snapshot
//! - **Explanation Cache**: content-addressed, bounded, single-flight
//!   memoization in front of an optional explainer capability
//! - **HTTP Surface**: axum routes for single, batch, and explained
//!   predictions plus metrics and health
//! - **No Ambient State**: all startup state lives in one context object
//!   built in `main` and shared by reference
//!
//! ## Architecture
//!
//! The crate is organized around the request path:
//!
//! 1. **Contracts** (`contracts/`): the immutable schema, manifest,
//!    threshold, and identity types.
//!
//! 2. **Validation** (`validation`): pure raw-schema and
//!    feature-contract checks.
//!
//! 3. **Pipeline** (`pipeline`): cleaner and feature-engineer seams, run
//!    exactly once per batch.
//!
//! 4. **Inference** (`inference`, `model`, `decision`): the opaque model
//!    behind a trait, decision banding, per-decision metrics.
//!
//! 5. **Explanations** (`explain`): lazy explainer, content-addressed
//!    cache, top-k ranking.
//!
//! 6. **Transport** (`handler`, `cli`): axum router, error mapping,
//!    request middleware, and the `risk-serve` binary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use risk_serving::{ArtifactBundle, ServingConfig, ServingContext};
//! use risk_serving::contracts::{FieldValue, RawRecord};
//!
//! # fn main() -> risk_serving::Result<()> {
//! let context = ServingContext::from_bundle(
//!     ArtifactBundle::builtin(),
//!     ServingConfig::default(),
//! )?;
//!
//! let record = RawRecord::new()
//!     .with_field("person_age", FieldValue::Int(30))
//!     .with_field("person_income", FieldValue::Float(60000.0));
//! // ... remaining fields elided
//!
//! let batch = [record];
//! let features = context.pipeline.prepare(&batch)?;
//! let decision = context.inference.score_single(&features, "example")?;
//! println!("{}", decision.decision);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod artifacts;
pub mod cli;
pub mod context;
pub mod decision;
pub mod error;
pub mod explain;
pub mod handler;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod validation;

// Contracts module - located at ../contracts relative to src/
#[path = "../contracts/mod.rs"]
pub mod contracts;

// Re-export the request-path types
pub use artifacts::ArtifactBundle;
pub use context::{ServingConfig, ServingContext};
pub use decision::{decide, Decision};
pub use error::{Result, ServingError};
pub use explain::{
    Explainer, ExplanationCache, ExplanationEngine, Explanation, FeatureImpact,
};
pub use inference::{InferenceService, RiskDecision};
pub use metrics::{MetricsSnapshot, MetricsStore};
pub use model::{LogisticScorecard, ScorecardExplainer, ScorecardSpec, ScoringModel};
pub use pipeline::{FeatureEngineer, PreprocessPipeline, RecordCleaner};
pub use validation::{validate_batch_size, validate_features, validate_raw, MAX_BATCH_SIZE};

// Re-export contract types for external use
pub use contracts::{
    DecisionThresholds, FeatureManifest, FeatureTable, FieldKind, FieldValue, ModelIdentity,
    RawRecord, RawSchema,
};

// Re-export handler types for embedding the router
pub use handler::{create_router, BatchPredictResponse, ExplainResponse};

// Re-export CLI types for the binary
pub use cli::{ExitCode, ServeCli, ServeCommands};

/// Service version (from Cargo.toml)
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service identifier
pub const SERVICE_NAME: &str = "risk-serving";

/// Run the CLI application
///
/// This is the main entry point for the `risk-serve` binary.
pub async fn run_cli(cli: ServeCli) -> ExitCode {
    cli::run(cli).await
}
