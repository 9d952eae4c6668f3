use oproxy_protocol::ollama::generate::response::GenerateResponse as OllamaGenerateResponse;
use oproxy_protocol::openai::chat_completions::stream::{
    CHAT_COMPLETION_CHUNK_OBJECT, ChatCompletionChunk as OpenAIChatCompletionChunk, ChunkChoice,
    ChunkDelta,
};
use oproxy_protocol::openai::chat_completions::types::FINISH_REASON_STOP;

use crate::generate_content::created_seconds;

/// Convert one streamed Ollama line into an OpenAI chunk. `id` is left empty.
pub fn transform_chunk(response: OllamaGenerateResponse) -> OpenAIChatCompletionChunk {
    let finish_reason = response.done.then(|| FINISH_REASON_STOP.to_string());

    OpenAIChatCompletionChunk {
        id: String::new(),
        object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
        created: created_seconds(response.created_at),
        model: response.model,
        choices: vec![ChunkChoice {
            index: 0,
            delta: ChunkDelta {
                role: None,
                content: response.response,
            },
            finish_reason,
        }],
    }
}
