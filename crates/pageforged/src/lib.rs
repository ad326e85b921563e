//! Pageforge HTTP service.
//!
//! `POST /api/deploy` runs one deployment round for the JSON body and
//! answers with the round's response; `GET /health` is a liveness probe.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pageforge_core::{DeployResponse, ErrorClass, Orchestrator, RawTaskRequest, ValidationError};
use thiserror::Error;

/// Shared service state.
pub struct AppState {
    orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Errors rejected before a round starts.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Malformed(#[from] ValidationError),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = DeployResponse::Failure {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// HTTP status for a round outcome.
pub const fn status_for(class: Option<ErrorClass>) -> StatusCode {
    match class {
        None => StatusCode::OK,
        Some(ErrorClass::Rejected) => StatusCode::BAD_REQUEST,
        Some(ErrorClass::Forbidden) => StatusCode::FORBIDDEN,
        Some(ErrorClass::Downstream) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/deploy", post(deploy))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn deploy(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    let raw = RawTaskRequest::from_json(&body)?;
    let (class, response) = state.orchestrator.respond(raw).await;
    Ok((status_for(class), Json(response)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_map_to_statuses() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(status_for(Some(ErrorClass::Rejected)), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Some(ErrorClass::Forbidden)), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(Some(ErrorClass::Downstream)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = ApiError::from(ValidationError::MalformedBody("expected value".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
