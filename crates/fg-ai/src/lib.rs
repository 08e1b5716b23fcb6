//! FocusGate AI providers
//!
//! Implements [`fg_core::VerdictClient`] over HTTP for Google Gemini and
//! any OpenAI-compatible chat completions endpoint. Both providers are asked
//! for a JSON object `{"decision": "yes"|"no", "score": 0-100}`, which is
//! parsed by [`fg_core::verdict::parse_verdict_payload`].

pub mod client;
pub mod gemini;
pub mod openai;
pub mod prompt;

pub use client::{AiClient, Endpoints};
pub use prompt::build_prompt;
