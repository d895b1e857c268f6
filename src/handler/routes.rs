//! Route definitions for the serving layer
//!
//! - `POST /predict` — score one application
//! - `POST /predict/batch` — score an ordered batch (1–500 records)
//! - `POST /predict/explain` — score one application and attach ranked
//!   explanations
//! - `GET /metrics` — point-in-time metrics snapshot
//! - `GET /health` — liveness check
//!
//! All routes return machine-readable JSON. Contract validation runs
//! before any model invocation; the explain route additionally goes
//! through the memoizing explanation engine.

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{track_requests, ApiError, RequestContext};
use crate::context::ServingContext;
use crate::contracts::RawRecord;
use crate::explain::Explanation;
use crate::inference::RiskDecision;
use crate::metrics::MetricsSnapshot;

/// Batch response: results in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    /// Number of records scored
    pub batch_size: usize,
    /// One decision per input record, in input order
    pub results: Vec<RiskDecision>,
}

/// Explain response: the decision object merged with the explanations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainResponse {
    /// The scored decision, flattened into the top level
    #[serde(flatten)]
    pub decision: RiskDecision,
    /// Ranked per-feature attributions
    pub explanations: Explanation,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is serving
    pub status: String,
}

/// Create the router with all routes and layers.
pub fn create_router(context: Arc<ServingContext>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/predict/explain", post(predict_explain))
        .route("/metrics", get(metrics_snapshot))
        .route("/health", get(health_check))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&context),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(context)
}

/// POST /predict — score a single application.
pub async fn predict(
    State(context): State<Arc<ServingContext>>,
    Extension(request): Extension<RequestContext>,
    Json(record): Json<RawRecord>,
) -> Result<Json<RiskDecision>, ApiError> {
    let request_id = request.request_id.as_str();
    let batch = [record];

    let features = context
        .pipeline
        .prepare(&batch)
        .map_err(|e| ApiError::new(e, request_id))?;
    let decision = context
        .inference
        .score_single(&features, request_id)
        .map_err(|e| ApiError::new(e, request_id))?;

    context.metrics.record_single();
    Ok(Json(decision))
}

/// POST /predict/batch — score an ordered batch of applications.
pub async fn predict_batch(
    State(context): State<Arc<ServingContext>>,
    Extension(request): Extension<RequestContext>,
    Json(records): Json<Vec<RawRecord>>,
) -> Result<Json<BatchPredictResponse>, ApiError> {
    let request_id = request.request_id.as_str();
    let batch_size = records.len();

    // The whole batch flows through cleaning, engineering, and both
    // validations exactly once; the size bound is checked first.
    let features = context
        .pipeline
        .prepare(&records)
        .map_err(|e| ApiError::new(e, request_id))?;
    let results = context
        .inference
        .score_batch(&features, request_id)
        .map_err(|e| ApiError::new(e, request_id))?;

    context.metrics.record_batch(batch_size);
    Ok(Json(BatchPredictResponse {
        batch_size,
        results,
    }))
}

/// POST /predict/explain — score one application with explanations.
pub async fn predict_explain(
    State(context): State<Arc<ServingContext>>,
    Extension(request): Extension<RequestContext>,
    Json(record): Json<RawRecord>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let request_id = request.request_id.as_str();

    // Capability is resolved at startup and checked before any work.
    if !context.explanations.available() {
        return Err(ApiError::new(
            crate::error::ServingError::capability_unavailable(
                "explanation generator is not available in this runtime",
            ),
            request_id,
        ));
    }

    let batch = [record];
    let features = context
        .pipeline
        .prepare(&batch)
        .map_err(|e| ApiError::new(e, request_id))?;
    let decision = context
        .inference
        .score_single(&features, request_id)
        .map_err(|e| ApiError::new(e, request_id))?;
    context.metrics.record_single();

    let explanations = context
        .explanations
        .explain(&features)
        .await
        .map_err(|e| ApiError::new(e, request_id))?;

    Ok(Json(ExplainResponse {
        decision,
        explanations,
    }))
}

/// GET /metrics — read the metrics snapshot.
pub async fn metrics_snapshot(
    State(context): State<Arc<ServingContext>>,
) -> Json<MetricsSnapshot> {
    Json(context.metrics.snapshot())
}

/// GET /health — liveness check.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
