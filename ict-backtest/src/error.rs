//! Error types for ict-backtest.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::data::SourceError;

/// Run-level backtest failures.
///
/// Per-signal problems never surface here; they are recorded as skips.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NoData(String),

    #[error("Misaligned data: bar {index} is not after its predecessor")]
    MisalignedData { index: usize },

    #[error("Signal source error: {0}")]
    Source(#[from] SourceError),

    #[error("Backtest timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl BacktestError {
    /// Error code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NoData(_) => "NO_DATA",
            Self::MisalignedData { .. } => "MISALIGNED_DATA",
            Self::Source(e) if e.is_not_found() => "DATA_NOT_FOUND",
            Self::Source(_) => "SOURCE_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::NoData(_) | Self::MisalignedData { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Source(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Source(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// API error body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl IntoResponse for BacktestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Backtest failed");
        } else {
            tracing::warn!(error = %self, "Backtest rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ApiError {
                code: self.code().to_string(),
                message: self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
