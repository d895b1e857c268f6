//! Request middleware
//!
//! Assigns every request a UUID, times it end to end, records the
//! duration in the metrics store, echoes the ID back in `X-Request-ID`,
//! and writes one structured log line per request. Handlers read the ID
//! from request extensions for error correlation.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::context::ServingContext;

/// Per-request correlation data, injected into request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request UUID
    pub request_id: String,
}

/// Request-ID + timing middleware.
///
/// Every request that reaches the router passes through here exactly
/// once, so the metrics total/latency counters see each request exactly
/// once regardless of endpoint.
pub async fn track_requests(
    State(context): State<Arc<ServingContext>>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let start = Instant::now();
    let mut response = next.run(request).await;
    let duration_ms = duration_ms(start);

    context.metrics.record_request(duration_ms);

    if let Ok(header) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", header);
    }

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = duration_ms,
        "Request completed"
    );

    response
}

fn duration_ms(start: Instant) -> f64 {
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    (elapsed * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_is_nonnegative_and_small_for_immediate_calls() {
        let start = Instant::now();
        let ms = duration_ms(start);
        assert!(ms >= 0.0);
        assert!(ms < 1_000.0);
    }

    #[test]
    fn test_request_context_is_cloneable() {
        let ctx = RequestContext {
            request_id: "req-1".to_string(),
        };
        assert_eq!(ctx.clone().request_id, "req-1");
    }
}
