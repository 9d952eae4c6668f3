pub mod body;
pub mod error;
pub mod provider;
pub mod response;
pub mod sink;

pub use body::{BodyRelease, ByteStream, UpstreamBody};
pub use error::RelayError;
pub use oproxy_protocol::openai::chat_completions::types::Usage;
pub use provider::{CallContext, Provider, UpstreamResponse};
pub use response::{ProxyResponse, StreamBody};
pub use sink::{ChannelSink, EventSink, SinkClosed};
