use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::warn;

use crate::api::models::{error_codes, ApiError, HealthResponse, QueryRequest, QueryResponse};
use crate::completion::CompletionError;
use crate::error::RelayError;
use crate::handler::QueryHandler;
use crate::metrics::METRICS;
use crate::search::SearchError;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<QueryHandler>,
}

impl AppState {
    pub fn new(handler: QueryHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

/// Answer a question
///
/// POST /query
pub async fn post_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ApiError>)> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected malformed query body");
        METRICS.record_query("input");
        // an unsized body that outgrows the limit surfaces here, not in the limit layer
        let (status, code) = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, error_codes::PAYLOAD_TOO_LARGE)
            }
            _ => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
        };
        (status, Json(ApiError::new(code, rejection.body_text())))
    })?;

    state
        .handler
        .handle_query(request.query.as_deref())
        .await
        .map(|response| Json(QueryResponse { response }))
        .map_err(|e| error_response(&e))
}

/// Liveness check
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus exposition
///
/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}

/// Map a pipeline failure to a status code and error body
pub fn error_response(e: &RelayError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match e {
        RelayError::InvalidInput(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
        RelayError::Search(SearchError::Timeout(_))
        | RelayError::Completion(CompletionError::Timeout(_)) => {
            (StatusCode::GATEWAY_TIMEOUT, error_codes::TIMEOUT)
        }
        RelayError::Search(_) => (StatusCode::BAD_GATEWAY, error_codes::SEARCH_UPSTREAM_ERROR),
        RelayError::Completion(_) => (
            StatusCode::BAD_GATEWAY,
            error_codes::COMPLETION_UPSTREAM_ERROR,
        ),
        RelayError::Tokenizer(_) | RelayError::Config(_) | RelayError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
        }
    };

    (status, Json(ApiError::new(code, e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let (status, body) = error_response(&RelayError::InvalidInput("Missing query".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, error_codes::VALIDATION_ERROR);

        let (status, body) = error_response(&RelayError::Search(SearchError::Upstream {
            status: 500,
            body: "boom".into(),
        }));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.code, error_codes::SEARCH_UPSTREAM_ERROR);

        let (status, body) = error_response(&RelayError::Completion(CompletionError::Upstream {
            status: 401,
            body: "invalid key".into(),
        }));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.code, error_codes::COMPLETION_UPSTREAM_ERROR);

        let (status, body) =
            error_response(&RelayError::Completion(CompletionError::Timeout("60s".into())));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body.code, error_codes::TIMEOUT);

        let (status, _) = error_response(&RelayError::Internal("oops".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
