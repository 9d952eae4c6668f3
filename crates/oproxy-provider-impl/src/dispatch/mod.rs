mod json;
mod stream;

pub use json::{JsonOutcome, read_backend_error, relay_json};
pub use stream::{MIN_LINE_LEN, RelayFailure, StreamOutcome, relay_stream};

use std::io;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::stream::unfold;
use http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::{info, warn};

use oproxy_protocol::ollama::generate::request::GenerateRequest as OllamaGenerateRequest;
use oproxy_protocol::openai::chat_completions::request::ChatCompletionRequest as OpenAIChatRequest;
use oproxy_provider_core::{
    CallContext, ChannelSink, ProxyResponse, RelayError, StreamBody, UpstreamBody,
    UpstreamResponse,
};
use oproxy_transform::generate_content::openai_chat2ollama::request::transform_request;

pub const EVENT_STREAM: &str = "text/event-stream";
pub const APPLICATION_JSON: &str = "application/json";

/// Events buffered between the relay task and the HTTP body.
const EVENT_BUFFER: usize = 16;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[async_trait]
pub trait DispatchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn call_native(
        &self,
        req: OllamaGenerateRequest,
        ctx: CallContext,
    ) -> Result<UpstreamResponse, RelayError>;
}

pub async fn dispatch_request<P: DispatchProvider>(
    provider: &P,
    req: OpenAIChatRequest,
    ctx: CallContext,
) -> Result<ProxyResponse, RelayError> {
    let is_stream = req.stream;
    let upstream_req = transform_request(req);

    let UpstreamResponse {
        status,
        headers: _,
        body,
    } = provider.call_native(upstream_req, ctx.clone()).await?;

    if is_stream {
        if !status.is_success() {
            return Err(read_backend_error(status, body).await);
        }
        return Ok(stream_response(body, ctx));
    }

    let outcome = relay_json(status, body).await?;
    info!(
        event = "downstream_response",
        trace_id = %ctx.trace_id,
        provider = %provider.name(),
        id = %outcome.response.id,
        prompt_tokens = outcome.usage.prompt_tokens,
        completion_tokens = outcome.usage.completion_tokens,
        total_tokens = outcome.usage.total_tokens,
    );
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    Ok(ProxyResponse::Json {
        status,
        headers,
        body: outcome.body,
    })
}

fn stream_response(body: UpstreamBody, ctx: CallContext) -> ProxyResponse {
    let (mut sink, rx) = ChannelSink::channel(EVENT_BUFFER);
    let trace_id = ctx.trace_id;
    tokio::spawn(async move {
        let started_at = Instant::now();
        match relay_stream(body, &mut sink).await {
            Ok(outcome) => {
                info!(
                    event = "downstream_stream_finished",
                    trace_id = %trace_id,
                    id = %outcome.id,
                    chunks = outcome.chunks,
                    text_len = outcome.text.len(),
                    prompt_tokens = outcome.usage.map(|usage| usage.prompt_tokens),
                    completion_tokens = outcome.usage.map(|usage| usage.completion_tokens),
                    elapsed_ms = started_at.elapsed().as_millis(),
                );
            }
            Err(RelayFailure { error, partial }) => {
                warn!(
                    event = "downstream_stream_failed",
                    trace_id = %trace_id,
                    id = %partial.id,
                    code = error.code(),
                    error = %error,
                    chunks = partial.chunks,
                    text_len = partial.text.len(),
                    elapsed_ms = started_at.elapsed().as_millis(),
                );
                if !matches!(error, RelayError::Downstream) {
                    sink.abort(io::Error::other(error.to_string())).await;
                }
            }
        }
    });

    let stream = unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        Some((item, rx))
    });

    ProxyResponse::Stream {
        status: StatusCode::OK,
        headers: event_stream_headers(),
        body: StreamBody::new(EVENT_STREAM, stream),
    }
}

pub fn event_stream_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    headers
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures_util::StreamExt;
    use futures_util::stream;

    use super::*;

    struct FakeOllama {
        status: StatusCode,
        body: &'static str,
        seen: Mutex<Option<OllamaGenerateRequest>>,
    }

    impl FakeOllama {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl DispatchProvider for FakeOllama {
        fn name(&self) -> &str {
            "fake"
        }

        async fn call_native(
            &self,
            req: OllamaGenerateRequest,
            _ctx: CallContext,
        ) -> Result<UpstreamResponse, RelayError> {
            *self.seen.lock().unwrap() = Some(req);
            Ok(UpstreamResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body: UpstreamBody::new(stream::iter(vec![Ok(Bytes::from_static(
                    self.body.as_bytes(),
                ))])),
            })
        }
    }

    fn chat(stream: bool) -> OpenAIChatRequest {
        serde_json::from_value(serde_json::json!({
            "model": "llama3",
            "stream": stream,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn single_shot_returns_json() {
        let provider = FakeOllama::new(
            StatusCode::OK,
            r#"{"model":"llama3","response":"hello","done":true}"#,
        );

        let response = dispatch_request(&provider, chat(false), CallContext::default())
            .await
            .unwrap();

        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.prompt, "hi");
        assert_eq!(seen.system, "be brief");
        assert_eq!(seen.stream, Some(false));
        let ProxyResponse::Json {
            status,
            headers,
            body,
        } = response
        else {
            panic!("expected json response");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], APPLICATION_JSON);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["choices"][0]["message"]["content"], "hello");
    }

    #[tokio::test]
    async fn streaming_relays_events_with_sse_headers() {
        let provider = FakeOllama::new(
            StatusCode::OK,
            "{\"model\":\"llama3\",\"response\":\"a\",\"done\":false}\n{\"model\":\"llama3\",\"response\":\"b\",\"done\":true}\n",
        );

        let response = dispatch_request(&provider, chat(true), CallContext::default())
            .await
            .unwrap();

        let ProxyResponse::Stream {
            status,
            headers,
            body,
        } = response
        else {
            panic!("expected stream response");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(headers[CACHE_CONTROL], "no-cache");
        assert_eq!(headers[CONNECTION], "keep-alive");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(body.content_type, EVENT_STREAM);

        let events: Vec<Bytes> = body.stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], Bytes::from_static(b"data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn streaming_upstream_failure_becomes_backend_error() {
        let provider = FakeOllama::new(StatusCode::NOT_FOUND, r#"{"error":"model not found"}"#);

        let err = dispatch_request(&provider, chat(true), CallContext::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "ollama_error");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn single_shot_backend_error_is_fatal() {
        let provider = FakeOllama::new(StatusCode::BAD_REQUEST, r#"{"error":"bad options"}"#);

        let err = dispatch_request(&provider, chat(false), CallContext::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "bad options");
    }
}
