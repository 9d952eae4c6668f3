use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use oproxy_protocol::ollama::generate::request::GenerateRequest as OllamaGenerateRequest;
use oproxy_protocol::openai::chat_completions::request::ChatCompletionRequest as OpenAIChatRequest;
use oproxy_provider_core::{CallContext, Provider, ProxyResponse, RelayError, UpstreamResponse};

use crate::dispatch::{DispatchProvider, dispatch_request};
use crate::upstream::{build_url, handle_response, network_failure};

pub const PROVIDER_NAME: &str = "ollama";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: wreq::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(wreq::Client::new(), base_url)
    }

    pub fn with_client(client: wreq::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn call(
        &self,
        req: OpenAIChatRequest,
        ctx: CallContext,
    ) -> Result<ProxyResponse, RelayError> {
        dispatch_request(self, req, ctx).await
    }
}

#[async_trait]
impl DispatchProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn call_native(
        &self,
        req: OllamaGenerateRequest,
        ctx: CallContext,
    ) -> Result<UpstreamResponse, RelayError> {
        let url = build_url(&self.base_url, GENERATE_PATH);
        let is_stream = req.stream.unwrap_or(true);
        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "ollama.generate",
            method = "POST",
            path = %GENERATE_PATH,
            model = %req.model,
            is_stream = is_stream
        );
        let response = self
            .client
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    event = "upstream_response",
                    trace_id = %ctx.trace_id,
                    provider = %PROVIDER_NAME,
                    op = "ollama.generate",
                    status = "error",
                    elapsed_ms = started_at.elapsed().as_millis(),
                    error = %err
                );
                network_failure(err)
            })?;
        info!(
            event = "upstream_response",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "ollama.generate",
            status = %response.status().as_u16(),
            elapsed_ms = started_at.elapsed().as_millis(),
            is_stream = is_stream
        );
        Ok(handle_response(response))
    }
}
