//! Integration tests for the risk serving layer
//!
//! Exercises the cross-module flows:
//! - contract validation short-circuits the pipeline before collaborators
//!   run
//! - batch bounds at the serving boundary
//! - explanation memoization across calls and the capability signal
//! - metrics aggregation fed by the request middleware
//! - the HTTP surface end to end via in-process router requests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use risk_serving::contracts::{
    FeatureManifest, FeatureTable, FieldValue, RawRecord, RawSchema,
};
use risk_serving::pipeline::{CanonicalCleaner, FeatureEngineer, OneHotFeatureEngineer};
use risk_serving::{
    create_router, ArtifactBundle, Decision, PreprocessPipeline, Result, ServingConfig,
    ServingContext, ServingError, MAX_BATCH_SIZE,
};

/// A complete, sensible credit application.
fn sample_record() -> RawRecord {
    RawRecord::new()
        .with_field("person_age", FieldValue::Int(30))
        .with_field("person_income", FieldValue::Float(60000.0))
        .with_field(
            "person_home_ownership",
            FieldValue::Text("RENT".to_string()),
        )
        .with_field("person_emp_length", FieldValue::Int(4))
        .with_field("loan_intent", FieldValue::Text("PERSONAL".to_string()))
        .with_field("loan_grade", FieldValue::Text("B".to_string()))
        .with_field("loan_amnt", FieldValue::Float(12000.0))
        .with_field("loan_int_rate", FieldValue::Float(12.0))
        .with_field("loan_percent_income", FieldValue::Float(0.2))
        .with_field(
            "cb_person_default_on_file",
            FieldValue::Text("N".to_string()),
        )
        .with_field("cb_person_cred_hist_length", FieldValue::Int(7))
}

fn sample_payload() -> serde_json::Value {
    serde_json::to_value(sample_record()).unwrap()
}

fn default_context() -> Arc<ServingContext> {
    ServingContext::from_bundle(ArtifactBundle::builtin(), ServingConfig::default()).unwrap()
}

/// Feature engineer that counts invocations before delegating.
struct CountingEngineer {
    calls: Arc<AtomicUsize>,
    inner: OneHotFeatureEngineer,
}

impl FeatureEngineer for CountingEngineer {
    fn engineer(
        &self,
        batch: &[RawRecord],
        schema: &RawSchema,
        manifest: &FeatureManifest,
    ) -> Result<FeatureTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.engineer(batch, schema, manifest)
    }
}

fn counting_pipeline() -> (PreprocessPipeline, Arc<AtomicUsize>) {
    let bundle = ArtifactBundle::builtin();
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = PreprocessPipeline::new(
        Arc::new(bundle.raw_schema),
        Arc::new(bundle.manifest),
        Arc::new(CanonicalCleaner),
        Arc::new(CountingEngineer {
            calls: Arc::clone(&calls),
            inner: OneHotFeatureEngineer,
        }),
    );
    (pipeline, calls)
}

// --- Pipeline short-circuiting ---

#[test]
fn raw_validation_failure_never_reaches_the_engineer() {
    let (pipeline, calls) = counting_pipeline();

    let mut incomplete = RawRecord::new();
    for (name, value) in sample_record().fields() {
        if name != "loan_amnt" {
            incomplete = incomplete.with_field(name.clone(), value.clone());
        }
    }

    let err = pipeline.prepare(&[incomplete]).unwrap_err();
    match err {
        ServingError::Schema { missing } => assert_eq!(missing, vec!["loan_amnt"]),
        other => panic!("expected Schema error, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn engineer_runs_exactly_once_per_batch() {
    let (pipeline, calls) = counting_pipeline();
    let batch: Vec<RawRecord> = (0..10).map(|_| sample_record()).collect();

    pipeline.prepare(&batch).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// --- Batch bounds ---

#[test]
fn empty_batch_is_rejected_with_specific_error() {
    let context = default_context();
    let err = context.pipeline.prepare(&[]).unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn oversize_batch_is_rejected_with_specific_error() {
    let context = default_context();
    let batch: Vec<RawRecord> = (0..MAX_BATCH_SIZE + 1).map(|_| sample_record()).collect();
    let err = context.pipeline.prepare(&batch).unwrap_err();
    assert!(err.to_string().contains("exceeds maximum limit"));
}

#[test]
fn max_size_batch_succeeds_end_to_end() {
    let context = default_context();
    let batch: Vec<RawRecord> = (0..MAX_BATCH_SIZE).map(|_| sample_record()).collect();

    let features = context.pipeline.prepare(&batch).unwrap();
    let results = context.inference.score_batch(&features, "test").unwrap();

    assert_eq!(results.len(), MAX_BATCH_SIZE);
    // Identical rows must yield identical decisions.
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

// --- Explanations ---

#[tokio::test]
async fn repeated_explanations_are_served_from_cache() {
    let context = default_context();
    let features = context.pipeline.prepare(&[sample_record()]).unwrap();

    let first = context.explanations.explain(&features).await.unwrap();
    let second = context.explanations.explain(&features).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(context.explanations.cached_entries(), 1);
}

#[tokio::test]
async fn disabled_capability_yields_distinct_error() {
    let config = ServingConfig {
        explanations_enabled: false,
        ..ServingConfig::default()
    };
    let context = ServingContext::from_bundle(ArtifactBundle::builtin(), config).unwrap();
    let features = context.pipeline.prepare(&[sample_record()]).unwrap();

    let err = context.explanations.explain(&features).await.unwrap_err();
    assert!(matches!(err, ServingError::CapabilityUnavailable(_)));
}

// --- Metrics ---

#[test]
fn metrics_aggregate_across_recorders() {
    let context = default_context();

    context.metrics.record_request(10.0);
    context.metrics.record_request(20.0);
    context.metrics.record_request(30.0);
    context.metrics.record_decision("APPROVE");
    context.metrics.record_decision("APPROVE");

    let snapshot = context.metrics.snapshot();
    assert_eq!(snapshot.latency_ms.average, 20.0);
    assert_eq!(snapshot.latency_ms.last, 30.0);
    assert_eq!(snapshot.decisions.get("APPROVE"), Some(&2));
}

// --- HTTP surface ---

async fn post_json(
    context: &Arc<ServingContext>,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = create_router(Arc::clone(context))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(context: &Arc<ServingContext>, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = create_router(Arc::clone(context))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn predict_returns_decision_object() {
    let context = default_context();
    let (status, json) = post_json(&context, "/predict", sample_payload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"], Decision::Approve.as_str());
    assert_eq!(json["prediction"], 0);
    assert!(json["probability_of_default"].is_number());
    assert_eq!(json["model_name"], "gradient_boosting_scorecard");
    assert_eq!(json["model_version"], "1.0.0");
}

#[tokio::test]
async fn predict_with_missing_field_is_client_fault_with_field_name() {
    let context = default_context();
    let mut payload = sample_payload();
    payload.as_object_mut().unwrap().remove("loan_int_rate");

    let (status, json) = post_json(&context, "/predict", payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "RAW_SCHEMA_VIOLATION");
    assert_eq!(json["error"]["details"]["missing_fields"][0], "loan_int_rate");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn predict_tolerates_unexpected_extra_fields() {
    let context = default_context();
    let mut payload = sample_payload();
    payload
        .as_object_mut()
        .unwrap()
        .insert("campaign_code".to_string(), serde_json::json!("SPRING"));

    let (status, _json) = post_json(&context, "/predict", payload).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn batch_predict_preserves_order_and_size() {
    let context = default_context();
    let payload = serde_json::json!([sample_payload(), sample_payload(), sample_payload()]);

    let (status, json) = post_json(&context, "/predict/batch", payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["batch_size"], 3);
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert_eq!(json["results"][0]["decision"], Decision::Approve.as_str());
}

#[tokio::test]
async fn empty_batch_over_http_is_rejected() {
    let context = default_context();
    let (status, json) = post_json(&context, "/predict/batch", serde_json::json!([])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("empty"));
}

#[tokio::test]
async fn explain_merges_decision_and_explanations() {
    let context = default_context();
    let (status, json) = post_json(&context, "/predict/explain", sample_payload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"], Decision::Approve.as_str());
    assert_eq!(
        json["explanations"]["risk_drivers"].as_array().unwrap().len(),
        5
    );
    assert_eq!(
        json["explanations"]["protective_factors"]
            .as_array()
            .unwrap()
            .len(),
        5
    );
    // Every entry carries a feature name and a numeric impact.
    for entry in json["explanations"]["risk_drivers"].as_array().unwrap() {
        assert!(entry["feature"].is_string());
        assert!(entry["impact"].is_number());
    }
}

#[tokio::test]
async fn explain_without_capability_returns_not_implemented() {
    let config = ServingConfig {
        explanations_enabled: false,
        ..ServingConfig::default()
    };
    let context = ServingContext::from_bundle(ArtifactBundle::builtin(), config).unwrap();

    let (status, json) = post_json(&context, "/predict/explain", sample_payload()).await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json["error"]["code"], "CAPABILITY_UNAVAILABLE");
}

#[tokio::test]
async fn health_check_reports_ok() {
    let context = default_context();
    let (status, json) = get_json(&context, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn middleware_feeds_metrics_and_sets_request_id() {
    let context = default_context();

    let response = create_router(Arc::clone(&context))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(sample_payload().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let snapshot = context.metrics.snapshot();
    assert_eq!(snapshot.requests.total, 1);
    assert_eq!(snapshot.requests.single, 1);
    assert_eq!(
        snapshot.decisions.get(Decision::Approve.as_str()),
        Some(&1)
    );

    // The /metrics endpoint reflects the same store.
    let (status, json) = get_json(&context, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requests"]["total"], 1);
    assert_eq!(json["decisions"]["APPROVE"], 1);
}

#[tokio::test]
async fn batch_requests_update_batch_record_counter() {
    let context = default_context();
    let payload = serde_json::json!([sample_payload(), sample_payload()]);

    let (status, _json) = post_json(&context, "/predict/batch", payload).await;
    assert_eq!(status, StatusCode::OK);

    let snapshot = context.metrics.snapshot();
    assert_eq!(snapshot.requests.batch_records, 2);
    assert_eq!(snapshot.requests.single, 0);
}
