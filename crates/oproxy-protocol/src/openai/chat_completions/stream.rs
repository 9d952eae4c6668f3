use serde::{Deserialize, Serialize};

use crate::openai::chat_completions::types::Role;

pub const CHAT_COMPLETION_CHUNK_OBJECT: &str = "chat.completion.chunk";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    /// Serialised as `null` until the terminal chunk.
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_finish_reason_serialises_as_null() {
        let chunk = ChatCompletionChunk {
            id: "chatcmpl-1".to_string(),
            object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
            created: 1,
            model: "llama3".to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: None,
                    content: "hi".to_string(),
                },
                finish_reason: None,
            }],
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["choices"][0]["finish_reason"], serde_json::Value::Null);
        assert_eq!(value["choices"][0]["delta"], serde_json::json!({ "content": "hi" }));
        assert_eq!(value["object"], "chat.completion.chunk");
    }
}
