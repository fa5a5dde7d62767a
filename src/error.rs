//! # error
//!
//! Centralised application error type.
//!
//! Every handler returns `Result<_, AppError>`. Axum's `IntoResponse` impl
//! converts these into structured JSON error bodies. "No gaps" or "no price
//! data" is never an error; only bad input and store failures end up here.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Query parameters that cannot be interpreted (negative window,
    /// unknown direction, unparseable date…).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The record store failed; the request is abandoned without a
    /// partial result.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)                    => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Backend(_))    => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::Malformed(_))  => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_)                      => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let message = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
