use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::access::AccessStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no email provided")]
    MissingIdentifier,

    #[error("access pending approval")]
    AccessPending,

    #[error("access {status}")]
    NotApproved { status: AccessStatus },

    #[error("unknown decision: {0}")]
    InvalidDecision(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Bodies are script comments: a client that blindly evaluates a
        // rejection body executes nothing.
        let (status, body) = match &self {
            AppError::MissingIdentifier => {
                (StatusCode::BAD_REQUEST, "// No email provided".to_string())
            }
            AppError::AccessPending => (
                StatusCode::FORBIDDEN,
                "// Access pending approval. Contact admin.".to_string(),
            ),
            AppError::NotApproved { status } => {
                (StatusCode::FORBIDDEN, format!("// Access {}", status))
            }
            AppError::InvalidDecision(raw) => (
                StatusCode::BAD_REQUEST,
                format!("// Unknown decision: {}", raw),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "// Internal server error".to_string(),
                )
            }
        };

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
