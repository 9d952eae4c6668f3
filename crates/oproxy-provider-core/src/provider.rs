use async_trait::async_trait;
use http::{HeaderMap, StatusCode};

use oproxy_protocol::openai::chat_completions::request::ChatCompletionRequest;

use crate::body::UpstreamBody;
use crate::error::RelayError;
use crate::response::ProxyResponse;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub trace_id: String,
    pub request_id: Option<String>,
}

pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn call(
        &self,
        request: ChatCompletionRequest,
        ctx: CallContext,
    ) -> Result<ProxyResponse, RelayError>;
}
