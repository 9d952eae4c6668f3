use oproxy_protocol::ollama::generate::response::GenerateResponse as OllamaGenerateResponse;
use oproxy_protocol::openai::chat_completions::response::{
    CHAT_COMPLETION_OBJECT, ChatCompletionChoice,
    ChatCompletionResponse as OpenAIChatCompletionResponse,
};
use oproxy_protocol::openai::chat_completions::types::{
    ChatMessage, FINISH_REASON_STOP, Role, Usage,
};

use crate::generate_content::{completion_id, created_seconds};

/// Convert a complete Ollama generate response into an OpenAI chat completion.
pub fn transform_response(response: OllamaGenerateResponse) -> OpenAIChatCompletionResponse {
    let usage = usage_from_response(&response);
    let finish_reason = if response.done {
        FINISH_REASON_STOP.to_string()
    } else {
        String::new()
    };

    OpenAIChatCompletionResponse {
        id: completion_id(),
        object: CHAT_COMPLETION_OBJECT.to_string(),
        created: created_seconds(response.created_at),
        model: response.model,
        choices: vec![ChatCompletionChoice {
            index: 0,
            message: ChatMessage::new(Role::Assistant, response.response),
            finish_reason,
        }],
        usage,
    }
}

pub fn usage_from_response(response: &OllamaGenerateResponse) -> Usage {
    Usage::new(
        response.prompt_eval_count.unwrap_or_default(),
        response.eval_count.unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn done_response_maps_to_stopped_choice() {
        let response = OllamaGenerateResponse {
            model: "llama3".to_string(),
            created_at: Some(datetime!(2024-01-01 00:00:00 UTC)),
            response: "hello".to_string(),
            done: true,
            prompt_eval_count: Some(12),
            eval_count: Some(3),
            ..Default::default()
        };

        let mapped = transform_response(response);
        assert_eq!(mapped.object, "chat.completion");
        assert_eq!(mapped.model, "llama3");
        assert_eq!(mapped.created, 1_704_067_200);
        assert!(mapped.id.starts_with("chatcmpl-"));
        assert_eq!(mapped.choices.len(), 1);
        let choice = &mapped.choices[0];
        assert_eq!(choice.index, 0);
        assert_eq!(choice.message.role, Role::Assistant);
        assert_eq!(choice.message.content.to_text(), "hello");
        assert_eq!(choice.finish_reason, "stop");
        assert_eq!(mapped.usage, Usage::new(12, 3));
        assert_eq!(mapped.usage.total_tokens, 15);
    }

    #[test]
    fn unfinished_response_has_empty_finish_reason_and_zero_usage() {
        let mapped = transform_response(OllamaGenerateResponse {
            response: "partial".to_string(),
            ..Default::default()
        });
        assert_eq!(mapped.choices[0].finish_reason, "");
        assert_eq!(mapped.usage, Usage::default());
        assert!(mapped.created > 0);
    }
}
