use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coc_protocol::{ErrorBody, ErrorResponse, ProtocolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("batch too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] coc_ledger::LedgerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ProtocolError> for GatewayError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MessageTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<coc_types::TypeError> for GatewayError {
    fn from(err: coc_types::TypeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl GatewayError {
    fn status_and_title(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            Self::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            Self::Ledger(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, title) = self.status_and_title();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "gateway internal error");
            "an internal error occurred".to_string()
        } else {
            tracing::debug!(error = %self, "request rejected");
            self.to_string()
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                title: title.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
