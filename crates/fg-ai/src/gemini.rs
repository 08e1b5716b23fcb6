//! Google Gemini `generateContent` wire format.

use fg_core::VerdictError;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// `POST` target for a generation request. The API key goes in the `key`
/// query parameter.
pub fn generate_url(base_url: &str, model: &str) -> String {
    format!("{}/v1beta/models/{}:generateContent", base_url.trim_end_matches('/'), model)
}

/// `GET` target used to validate a key.
pub fn models_url(base_url: &str) -> String {
    format!("{}/v1beta/models", base_url.trim_end_matches('/'))
}

pub fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "response_mime_type": "application/json",
            "maxOutputTokens": 100
        }
    })
}

/// Model text at `candidates[0].content.parts[0].text`.
pub fn extract_text(envelope: &Value) -> Result<&str, VerdictError> {
    envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| VerdictError::Envelope("missing candidates[0].content.parts[0].text".to_string()))
}
