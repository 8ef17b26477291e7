//! Error → HTTP response mapping.
//!
//! Every failure leaves the server as `{"error": "<message>"}` with a non-2xx
//! status.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ingest::PipelineError;
use crate::scanner::RunError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Busy(#[from] RunError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Multipart(#[from] MultipartRejection),
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Pipeline(PipelineError::Malformed(e.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(PipelineError::MissingFile)
            | ApiError::Pipeline(PipelineError::EmptyFile)
            | ApiError::Pipeline(PipelineError::Malformed(_))
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(PipelineError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Busy(_) => StatusCode::CONFLICT,
            ApiError::Json(rejection) => rejection.status(),
            ApiError::Multipart(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Json(rejection) => rejection.body_text(),
            ApiError::Multipart(rejection) => rejection.body_text(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
