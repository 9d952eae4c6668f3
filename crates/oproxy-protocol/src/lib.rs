pub mod ndjson;
pub mod ollama;
pub mod openai;
pub mod sse;
