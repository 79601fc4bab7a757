use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use footy_models::FootyError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Upstream(String),
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn parts(&self) -> (&'static str, &str) {
        match self {
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::BadRequest(msg) => ("invalid_input", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::Unavailable(msg) => ("unavailable", msg),
            ApiError::Upstream(msg) => ("upstream_unavailable", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
        }
    }
}

impl From<FootyError> for ApiError {
    fn from(err: FootyError) -> Self {
        match err {
            FootyError::TeamNotFound { .. } => ApiError::NotFound(err.to_string()),
            FootyError::InvalidOdds { .. } | FootyError::InvalidInput(_) => {
                ApiError::BadRequest(err.to_string())
            }
            FootyError::UpstreamUnavailable(_) => ApiError::Upstream(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = self.parts();
        if status.is_server_error() {
            error!("{} {}: {}", status.as_u16(), code, message);
        }

        let body = ErrorResponse {
            error: code.to_string(),
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
