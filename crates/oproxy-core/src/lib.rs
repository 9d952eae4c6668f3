pub mod core;
pub mod error;
pub mod handler;

pub use crate::core::{Core, CoreState};
pub use error::ProxyError;
