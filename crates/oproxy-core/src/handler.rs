use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use tracing::{info, warn};

use oproxy_protocol::openai::chat_completions::ChatCompletionRequest;
use oproxy_provider_core::{CallContext, ProxyResponse};

use crate::core::CoreState;
use crate::error::ProxyError;

pub async fn chat_completions_handler(
    State(state): State<Arc<CoreState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id(&headers);
    let trace_id = request_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let request = match serde_json::from_slice::<ChatCompletionRequest>(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(
                event = "downstream_request_rejected",
                trace_id = %trace_id,
                error = %err
            );
            return error_response(ProxyError::bad_request(err.to_string()));
        }
    };

    let started_at = Instant::now();
    info!(
        event = "downstream_request",
        trace_id = %trace_id,
        provider = %state.provider.name(),
        model = %request.model,
        messages = request.messages.len(),
        is_stream = request.stream
    );

    let ctx = CallContext {
        trace_id: trace_id.clone(),
        request_id,
    };
    match state.provider.call(request, ctx).await {
        Ok(response) => proxy_response(response),
        Err(err) => {
            warn!(
                event = "downstream_error",
                trace_id = %trace_id,
                code = err.code(),
                status = err.status().as_u16(),
                elapsed_ms = started_at.elapsed().as_millis(),
                error = %err
            );
            error_response(err.into())
        }
    }
}

pub async fn health_handler() -> &'static str {
    "OK"
}

fn proxy_response(response: ProxyResponse) -> Response {
    match response {
        ProxyResponse::Json {
            status,
            headers,
            body,
        } => {
            let mut resp = Response::new(Body::from(body));
            *resp.status_mut() = status;
            resp.headers_mut().extend(headers);
            resp
        }
        ProxyResponse::Stream {
            status,
            headers,
            body,
        } => {
            let mut resp = Response::new(Body::from_stream(body.stream));
            *resp.status_mut() = status;
            resp.headers_mut().extend(headers);
            if !resp.headers().contains_key(CONTENT_TYPE) {
                resp.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type));
            }
            resp
        }
    }
}

fn error_response(err: ProxyError) -> Response {
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("request-id"))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
