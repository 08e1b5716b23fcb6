//! OpenAI-compatible chat completions wire format.

use fg_core::VerdictError;
use serde_json::{json, Value};

/// `POST` target for a chat completion.
pub fn chat_url(api_url: &str) -> String {
    format!("{}/chat/completions", api_url.trim_end_matches('/'))
}

/// `GET` target listing the models the key can use.
pub fn models_url(api_url: &str) -> String {
    format!("{}/models", api_url.trim_end_matches('/'))
}

pub fn request_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "response_format": { "type": "json_object" },
        "max_tokens": 100,
        "temperature": 0.0
    })
}

/// Model text at `choices[0].message.content`.
pub fn extract_text(envelope: &Value) -> Result<&str, VerdictError> {
    envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| VerdictError::Envelope("missing choices[0].message.content".to_string()))
}

/// Chat model ids from a `/models` listing: ids containing `gpt`, sorted.
pub fn chat_models(listing: &Value) -> Vec<String> {
    let mut models: Vec<String> = listing
        .get("data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|model| model.get("id").and_then(Value::as_str))
        .filter(|id| id.contains("gpt"))
        .map(str::to_string)
        .collect();
    models.sort();
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_trim_trailing_slash() {
        assert_eq!(chat_url("https://api.openai.com/v1/"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(chat_url("https://api.openai.com/v1"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(models_url("https://proxy.local/v1/"), "https://proxy.local/v1/models");
    }

    #[test]
    fn test_request_body() {
        let body = request_body("gpt-4o-mini", "judge this");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_extract_text() {
        let envelope = json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "{\"decision\":\"no\",\"score\":4}" } }]
        });
        assert_eq!(extract_text(&envelope).unwrap(), r#"{"decision":"no","score":4}"#);
        assert!(extract_text(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_chat_models() {
        let listing = json!({
            "object": "list",
            "data": [
                { "id": "gpt-4o" },
                { "id": "text-embedding-3-small" },
                { "id": "gpt-3.5-turbo" },
                { "object": "model" }
            ]
        });
        assert_eq!(chat_models(&listing), vec!["gpt-3.5-turbo", "gpt-4o"]);
        assert!(chat_models(&json!({})).is_empty());
    }
}
