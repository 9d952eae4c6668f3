pub mod dispatch;
pub mod provider;
pub mod upstream;

pub use dispatch::{DispatchProvider, dispatch_request};
pub use provider::OllamaProvider;
