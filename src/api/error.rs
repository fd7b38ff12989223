//! Mapping from [`CpgError`] to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::CpgError;

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error. Client errors carry their message; everything else is
/// logged server-side and answered with a generic message.
#[derive(Debug)]
pub struct ApiError {
    /// Short description of the failed operation, used for 500 bodies.
    context: &'static str,
    source: CpgError,
}

impl ApiError {
    pub fn new(context: &'static str, source: CpgError) -> Self {
        Self { context, source }
    }

    /// A worker task that panicked or was cancelled.
    pub fn join(context: &'static str, err: tokio::task::JoinError) -> Self {
        Self::new(context, CpgError::Io(std::io::Error::other(err.to_string())))
    }

    pub fn status(&self) -> StatusCode {
        match self.source {
            CpgError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CpgError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(context = self.context, error = %self.source, "internal server error");
            format!("{}: internal error", self.context)
        } else {
            self.source.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Attach an operation name to a crate result.
pub trait ResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for crate::error::Result<T> {
    fn context(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(context, e))
    }
}
