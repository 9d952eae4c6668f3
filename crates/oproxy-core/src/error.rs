use bytes::Bytes;
use http::StatusCode;

use oproxy_protocol::openai::error::ErrorEnvelope;
use oproxy_provider_core::RelayError;

const FALLBACK_BODY: &[u8] =
    br#"{"error":{"message":"internal error","type":"oproxy_error","code":"internal"}}"#;

/// An error answered by the proxy itself, already rendered as an
/// OpenAI-style error envelope.
#[derive(Debug, Clone)]
pub struct ProxyError {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        let envelope = ErrorEnvelope::new(code, message);
        let body = serde_json::to_vec(&envelope)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(FALLBACK_BODY));
        Self { status, body }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }
}

impl From<RelayError> for ProxyError {
    fn from(err: RelayError) -> Self {
        Self::new(err.status(), err.code(), err.to_string())
    }
}
