use crate::{email_sender::EmailSendError, tokens::TokenError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors surfaced by the result store, statistics and verification workflow.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid ID format")]
    InvalidId,

    #[error("Result not found")]
    RecordNotFound,

    #[error("Statistics not found")]
    StatisticsNotFound,

    #[error("Email already verified for this result")]
    AlreadyVerified,

    #[error("Invalid verification token")]
    InvalidToken,

    #[error("Token encoding failed: {0}")]
    EncodingFailure(#[from] TokenError),

    #[error("Email delivery failed: {0}")]
    DeliveryFailure(#[from] EmailSendError),

    #[error("backend error: {0}")]
    Backend(String),
}

impl CoreError {
    pub(crate) fn from_backend<E: std::error::Error>(error: E) -> Self {
        Self::Backend(error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::InvalidId => StatusCode::BAD_REQUEST,
            CoreError::RecordNotFound => StatusCode::NOT_FOUND,
            CoreError::StatisticsNotFound => StatusCode::NOT_FOUND,
            CoreError::AlreadyVerified => StatusCode::BAD_REQUEST,
            CoreError::InvalidToken => StatusCode::BAD_REQUEST,
            CoreError::EncodingFailure(_)
            | CoreError::DeliveryFailure(_)
            | CoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable error message.
    pub error: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures keep their underlying message in the body.
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
