use std::io;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http::StatusCode;
use serde::Deserialize;
use tracing::warn;

use oproxy_protocol::ollama::generate::response::GenerateResponse as OllamaGenerateResponse;
use oproxy_protocol::openai::chat_completions::ChatCompletionResponse as OpenAIChatCompletionResponse;
use oproxy_provider_core::{ByteStream, RelayError, UpstreamBody, Usage};
use oproxy_transform::generate_content::openai_chat2ollama::response::{
    transform_response, usage_from_response,
};

#[derive(Debug, Clone)]
pub struct JsonOutcome {
    pub response: OpenAIChatCompletionResponse,
    pub body: Bytes,
    pub usage: Usage,
}

/// Read a complete Ollama generate body and convert it to one OpenAI chat
/// completion. The body is released exactly once, before decoding.
pub async fn relay_json(status: StatusCode, body: UpstreamBody) -> Result<JsonOutcome, RelayError> {
    let bytes = read_body(body).await?;

    let unit: OllamaGenerateResponse =
        serde_json::from_slice(&bytes).map_err(RelayError::Decode)?;
    if let Some(message) = unit.backend_error() {
        return Err(RelayError::Backend {
            status: error_status(status),
            message: message.to_string(),
        });
    }

    let usage = usage_from_response(&unit);
    let response = transform_response(unit);
    let body = serde_json::to_vec(&response)
        .map(Bytes::from)
        .map_err(RelayError::Encode)?;
    Ok(JsonOutcome {
        response,
        body,
        usage,
    })
}

#[derive(Deserialize)]
struct BackendError {
    error: String,
}

pub async fn read_backend_error(status: StatusCode, body: UpstreamBody) -> RelayError {
    let bytes = match read_body(body).await {
        Ok(bytes) => bytes,
        Err(err) => return err,
    };
    let message = match serde_json::from_slice::<BackendError>(&bytes) {
        Ok(parsed) if !parsed.error.is_empty() => parsed.error,
        _ => {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("upstream error")
                    .to_string()
            } else {
                text
            }
        }
    };
    RelayError::Backend {
        status: error_status(status),
        message,
    }
}

// A read failure wins over a release failure.
async fn read_body(body: UpstreamBody) -> Result<Bytes, RelayError> {
    let (stream, release) = body.into_parts();
    let read = read_to_end(stream).await;
    let released = release.release();
    let bytes = read.map_err(RelayError::ReadBody)?;
    released.map_err(RelayError::CloseBody)?;
    Ok(bytes)
}

async fn read_to_end(mut stream: ByteStream) -> io::Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

fn error_status(status: StatusCode) -> StatusCode {
    if status.is_success() {
        warn!(event = "backend_error_with_success_status", status = status.as_u16());
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        status
    }
}
