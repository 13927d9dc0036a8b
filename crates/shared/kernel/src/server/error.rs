//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use evreg_derive::api_model;
use std::borrow::Cow;
use std::fmt;

const INTERNAL_CODE: &str = "INTERNAL_SERVER_ERROR";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[api_model]
/// Error payload returned by every failing endpoint
pub struct ErrorBody {
    /// Machine-readable error code, e.g. `DUPLICATE_PHONE`
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// An error on its way to the client: a status, a stable code and a message.
///
/// Slices convert their own error enums into this type; server-side failures
/// should go through [`ApiError::internal`] so details stay in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: Cow<'static, str>,
    message: Cow<'static, str>,
}

impl ApiError {
    #[must_use]
    pub fn new(
        status: StatusCode,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self { status, code: code.into(), message: message.into() }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// 500 with a generic message. The cause is logged, never sent.
    #[must_use]
    pub fn internal(cause: &dyn std::error::Error) -> Self {
        tracing::error!(error = %cause, "Internal server error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_CODE, INTERNAL_MESSAGE)
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<super::ApiStateError> for ApiError {
    fn from(err: super::ApiStateError) -> Self {
        Self::internal(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code.into_owned(), message: self.message.into_owned() };
        (self.status, Json(body)).into_response()
    }
}
