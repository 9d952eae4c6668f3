pub mod request;
pub mod response;

pub use request::{GenerateOptions, GenerateRequest};
pub use response::GenerateResponse;
