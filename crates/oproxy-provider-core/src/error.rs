use std::io;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("read response body failed: {0}")]
    ReadBody(#[source] io::Error),
    #[error("close response body failed: {0}")]
    CloseBody(#[source] io::Error),
    #[error("unmarshal response body failed: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("marshal response body failed: {0}")]
    Encode(#[source] serde_json::Error),
    /// The backend answered with its own `{"error": ...}` object.
    #[error("{message}")]
    Backend { status: StatusCode, message: String },
    #[error("do request failed: {0}")]
    Upstream(String),
    #[error("downstream connection closed")]
    Downstream,
}

impl RelayError {
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::ReadBody(_) => "read_response_body_failed",
            RelayError::CloseBody(_) => "close_response_body_failed",
            RelayError::Decode(_) => "unmarshal_response_body_failed",
            RelayError::Encode(_) => "marshal_response_body_failed",
            RelayError::Backend { .. } => "ollama_error",
            RelayError::Upstream(_) => "do_request_failed",
            RelayError::Downstream => "downstream_closed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Backend { status, .. } => *status,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
