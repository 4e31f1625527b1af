//! Mapping of core errors onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use updater_core::{ErrorKind, LicenseFetchError, UpdateError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

/// A failed request, rendered as `{error, kind}`.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            kind if kind.is_upstream_error() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpdateError> for ApiError {
    fn from(e: UpdateError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<LicenseFetchError> for ApiError {
    fn from(e: LicenseFetchError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(ErrorKind::InvalidArgument, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = %self.kind, "{}", self.message);
        } else {
            warn!(kind = %self.kind, "{}", self.message);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.message,
                kind: self.kind,
            }),
        )
            .into_response()
    }
}
