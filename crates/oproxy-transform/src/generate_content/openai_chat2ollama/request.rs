use serde_json::{Value, json};

use oproxy_protocol::ollama::generate::request::{
    GenerateOptions, GenerateRequest as OllamaGenerateRequest,
};
use oproxy_protocol::openai::chat_completions::request::ChatCompletionRequest as OpenAIChatRequest;
use oproxy_protocol::openai::chat_completions::types::Role;

/// Convert an OpenAI chat request into an Ollama generate request.
///
/// The last system message becomes `system` and the last user message becomes
/// `prompt`; assistant turns are dropped. Without any user message the legacy
/// `prompt` field is used as-is.
pub fn transform_request(request: OpenAIChatRequest) -> OllamaGenerateRequest {
    let options = transform_options(&request);
    let mut prompt = legacy_prompt(request.prompt.as_ref());
    let mut system = String::new();

    for message in &request.messages {
        match message.role {
            Role::System => system = message.content.to_text(),
            Role::User => prompt = message.content.to_text(),
            Role::Assistant => {}
        }
    }

    OllamaGenerateRequest {
        model: request.model,
        prompt,
        system,
        template: String::new(),
        context: None,
        stream: Some(request.stream),
        options,
    }
}

fn legacy_prompt(prompt: Option<&Value>) -> String {
    match prompt {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn transform_options(request: &OpenAIChatRequest) -> Option<GenerateOptions> {
    let mut options = GenerateOptions::new();
    if let Some(temperature) = request.temperature {
        options.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = request.top_p {
        options.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(max_tokens) = request.max_tokens {
        options.insert("num_predict".to_string(), json!(max_tokens));
    }
    if let Some(seed) = request.seed {
        options.insert("seed".to_string(), json!(seed));
    }
    if let Some(penalty) = request.frequency_penalty {
        options.insert("frequency_penalty".to_string(), json!(penalty));
    }
    if let Some(penalty) = request.presence_penalty {
        options.insert("presence_penalty".to_string(), json!(penalty));
    }
    if let Some(stop) = request.stop.clone() {
        options.insert("stop".to_string(), json!(stop.into_vec()));
    }

    if options.is_empty() { None } else { Some(options) }
}

#[cfg(test)]
mod tests {
    use oproxy_protocol::openai::chat_completions::types::{ChatMessage, Stop};

    use super::*;

    fn chat(messages: Vec<ChatMessage>) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: "llama3".to_string(),
            messages,
            stream: true,
            ..Default::default()
        }
    }

    #[test]
    fn last_user_and_last_system_win() {
        let request = chat(vec![
            ChatMessage::new(Role::System, "be terse"),
            ChatMessage::new(Role::User, "first"),
            ChatMessage::new(Role::Assistant, "answer"),
            ChatMessage::new(Role::System, "be verbose"),
            ChatMessage::new(Role::User, "second"),
        ]);

        let mapped = transform_request(request);
        assert_eq!(mapped.model, "llama3");
        assert_eq!(mapped.prompt, "second");
        assert_eq!(mapped.system, "be verbose");
        assert_eq!(mapped.stream, Some(true));
        assert_eq!(mapped.template, "");
        assert_eq!(mapped.context, None);
        assert_eq!(mapped.options, None);
    }

    #[test]
    fn assistant_content_never_becomes_prompt() {
        let request = chat(vec![
            ChatMessage::new(Role::User, "question"),
            ChatMessage::new(Role::Assistant, "reply"),
        ]);
        assert_eq!(transform_request(request).prompt, "question");
    }

    #[test]
    fn legacy_prompt_is_used_without_user_message() {
        let mut request = chat(vec![ChatMessage::new(Role::System, "sys")]);
        request.prompt = Some(json!("free text"));
        request.stream = false;

        let mapped = transform_request(request);
        assert_eq!(mapped.prompt, "free text");
        assert_eq!(mapped.system, "sys");
        assert_eq!(mapped.stream, Some(false));

        let mut request = chat(Vec::new());
        request.prompt = Some(json!(["a", "b"]));
        assert_eq!(transform_request(request).prompt, r#"["a","b"]"#);
    }

    #[test]
    fn empty_request_passes_through() {
        let mapped = transform_request(OpenAIChatRequest::default());
        assert_eq!(mapped.model, "");
        assert_eq!(mapped.prompt, "");
        assert_eq!(mapped.system, "");
        assert_eq!(mapped.stream, Some(false));
    }

    #[test]
    fn sampling_parameters_land_in_options() {
        let mut request = chat(vec![ChatMessage::new(Role::User, "hi")]);
        request.temperature = Some(0.5);
        request.max_tokens = Some(64);
        request.stop = Some(Stop::One("###".to_string()));
        request.seed = Some(7);

        let options = transform_request(request).options.unwrap();
        assert_eq!(options["temperature"], json!(0.5));
        assert_eq!(options["num_predict"], json!(64));
        assert_eq!(options["stop"], json!(["###"]));
        assert_eq!(options["seed"], json!(7));
        assert!(!options.contains_key("top_p"));
    }
}
