//! HTTP handler infrastructure for the serving layer
//!
//! Provides the axum router, request middleware, response DTOs, and the
//! mapping from `ServingError` to HTTP responses:
//!
//! - contract/validation failures → 400 with every violation enumerated,
//! - capability-unavailable → 501, never conflated with a server fault,
//! - anything unexpected → logged with the request ID, surfaced as an
//!   opaque 500.
//!
//! ## Design Principles
//!
//! - **Stateless handlers**: all shared state lives in the serving
//!   context injected through axum state.
//! - **Machine-readable responses**: JSON everywhere, including errors.
//! - **One timing path**: the middleware measures every request and feeds
//!   the metrics aggregator; handlers never time themselves.

pub mod middleware;
pub mod routes;

pub use middleware::{track_requests, RequestContext};
pub use routes::{create_router, BatchPredictResponse, ExplainResponse, HealthResponse};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ServingError;

/// Error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error information
    pub error: ErrorInfo,
    /// Request identifier for correlation
    pub request_id: String,
    /// Response timestamp (ISO 8601)
    pub timestamp: String,
}

/// A serving error bound to the request it occurred in.
#[derive(Debug)]
pub struct ApiError {
    error: ServingError,
    request_id: String,
}

impl ApiError {
    /// Bind a serving error to a request ID.
    pub fn new(error: ServingError, request_id: impl Into<String>) -> Self {
        Self {
            error,
            request_id: request_id.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match &self.error {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServingError::CapabilityUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match &self.error {
            ServingError::InvalidInput(_) => "INVALID_INPUT",
            ServingError::Schema { .. } => "RAW_SCHEMA_VIOLATION",
            ServingError::FeatureContract { .. } => "FEATURE_CONTRACT_VIOLATION",
            ServingError::CapabilityUnavailable(_) => "CAPABILITY_UNAVAILABLE",
            ServingError::Artifact(_) | ServingError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_info = match &self.error {
            ServingError::Schema { missing } => ErrorInfo::new(
                self.error_code(),
                self.error.to_string(),
            )
            .with_details(serde_json::json!({ "missing_fields": missing })),
            ServingError::FeatureContract {
                missing,
                extra,
                expected,
                actual,
            } => ErrorInfo::new(self.error_code(), self.error.to_string()).with_details(
                serde_json::json!({
                    "missing_features": missing,
                    "unexpected_features": extra,
                    "expected_count": expected,
                    "actual_count": actual,
                }),
            ),
            ServingError::InvalidInput(_) | ServingError::CapabilityUnavailable(_) => {
                ErrorInfo::new(self.error_code(), self.error.to_string())
            }
            // Unexpected faults: full context stays in the server log, the
            // caller gets an opaque message.
            other => {
                tracing::error!(
                    request_id = %self.request_id,
                    error = %other,
                    "Internal serving error"
                );
                ErrorInfo::new(self.error_code(), "Internal prediction error")
            }
        };

        let body = ErrorBody {
            error: error_info,
            request_id: self.request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
