//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tts_facade_common::error::Error;

use crate::facade::DomainError;
use crate::schema::ValidationErrors;

/// Failure of a facade request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body is not valid JSON or does not match the request schema (422).
    #[error("Request validation failed: {0}")]
    Schema(ValidationErrors),

    /// Structurally valid but semantically invalid request (400).
    #[error("Invalid request: {}", join_domain(.0))]
    Domain(Vec<DomainError>),

    /// Provider failure, timeout or internal fault (5xx).
    #[error(transparent)]
    Upstream(#[from] Error),
}

fn join_domain(errors: &[DomainError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Domain(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(Error::Api { .. } | Error::EmptyAudio(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Schema(errors) => json!({ "detail": errors }),
            ApiError::Domain(errors) => json!({ "detail": join_domain(&errors) }),
            ApiError::Upstream(Error::Api { status_code, .. }) => {
                let detail = if status_code == 0 {
                    "Synthesis provider unreachable".to_string()
                } else {
                    format!("Synthesis provider failed (HTTP {})", status_code)
                };
                json!({ "detail": detail })
            }
            ApiError::Upstream(Error::EmptyAudio(_)) => {
                json!({ "detail": "Synthesis provider returned no audio" })
            }
            ApiError::Upstream(Error::Timeout(after)) => {
                json!({ "detail": format!("Synthesis provider timed out after {:?}", after) })
            }
            ApiError::Upstream(err) => {
                tracing::error!("Internal server error: {}", err);
                json!({ "detail": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
