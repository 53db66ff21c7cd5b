//! Error types for the request path
//!
//! Every failure is rendered as a plain-text status line; internal detail
//! never reaches the response body.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::lookup::StoreError;

// == Gateway Error Enum ==
/// Terminal outcomes of a rejected or failed request.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Origin not allowed by the policy
    #[error("origin not allowed")]
    Forbidden,

    /// Anything other than GET
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Path is not `/gravatar/{account}`
    #[error("malformed path: {0}")]
    BadRequest(String),

    /// Lookup backend failure
    #[error(transparent)]
    Backend(#[from] StoreError),

    /// Response could not be built
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Backend(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handling.
pub type Result<T> = std::result::Result<T, GatewayError>;
