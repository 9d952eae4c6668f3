pub mod types;
pub mod request;
pub mod response;
pub mod stream;

pub use request::ChatCompletionRequest;
pub use response::ChatCompletionResponse;
pub use stream::ChatCompletionChunk;
pub use types::*;
