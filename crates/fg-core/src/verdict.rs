//! AI verdict contract
//!
//! Provider clients live in `fg-ai`; this module holds the types the engine
//! consumes and the provider-independent payload parser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ProviderConfig;

/// Allow/deny decision plus a relevance score.
///
/// `score == None` means no judgment was made; such verdicts are never
/// recorded in the score history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiVerdict {
    pub allowed: bool,
    pub score: Option<u8>,
}

impl AiVerdict {
    /// Neutral result used whenever the AI could not judge.
    pub const UNKNOWN: Self = Self {
        allowed: true,
        score: None,
    };

    /// Result for a payload that arrived but could not be understood.
    pub const MALFORMED: Self = Self {
        allowed: false,
        score: Some(0),
    };

    /// Score as carried on the wire, with `-1` for "no judgment".
    pub fn wire_score(&self) -> i32 {
        self.score.map_or(-1, i32::from)
    }
}

/// Error type for provider calls.
#[derive(Debug, thiserror::Error)]
pub enum VerdictError {
    #[error("Provider is not configured: {0}")]
    NotConfigured(String),
    #[error("Provider request failed: {0}")]
    Transport(String),
    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected provider response: {0}")]
    Envelope(String),
}

#[async_trait]
pub trait VerdictClient: Send + Sync {
    /// Judge `title` against `intent`.
    ///
    /// Missing configuration yields [`AiVerdict::UNKNOWN`]; an unparseable
    /// decision payload yields [`AiVerdict::MALFORMED`]; transport and
    /// envelope failures are returned as errors and degrade to UNKNOWN in
    /// the engine.
    async fn evaluate(&self, title: &str, intent: &str, provider: &ProviderConfig) -> Result<AiVerdict, VerdictError>;

    /// Check that the provider accepts the configured credentials.
    async fn validate(&self, provider: &ProviderConfig) -> Result<(), VerdictError>;
}

// =============================================================================
// Payload parsing
// =============================================================================

/// Parse the model's JSON answer: `{"decision": "...", "score": N}`.
///
/// Anything that is not valid JSON is treated as a deny with score 0.
/// A missing decision denies; a missing score is 0; scores are clamped to
/// 0..=100.
pub fn parse_verdict_payload(raw: &str) -> AiVerdict {
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("AI payload is not valid JSON ({}): {:?}", e, raw);
            return AiVerdict::MALFORMED;
        }
    };

    let allowed = match value.get("decision") {
        Some(Value::String(decision)) => decision_allows(decision),
        Some(Value::Bool(decision)) => *decision,
        _ => false,
    };

    let score = match value.get("score") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)).unwrap_or(0),
        Some(Value::String(s)) => leading_int(s).unwrap_or(0),
        _ => 0,
    };

    let verdict = AiVerdict {
        allowed,
        score: Some(score.clamp(0, 100) as u8),
    };
    log::debug!("Parsed AI payload {:?} -> {:?}", raw, verdict);
    verdict
}

/// Only the forms the prompt asks for allow: `是` or a bare `yes`.
fn decision_allows(decision: &str) -> bool {
    if decision.contains('是') {
        return true;
    }
    decision
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .eq_ignore_ascii_case("yes")
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allow() {
        let v = parse_verdict_payload(r#"{"decision": "yes", "score": 92}"#);
        assert_eq!(v, AiVerdict { allowed: true, score: Some(92) });
        let v = parse_verdict_payload(r#"{"decision": "是", "score": 85}"#);
        assert!(v.allowed);
    }

    #[test]
    fn test_parse_deny() {
        let v = parse_verdict_payload(r#"{"decision": "no", "score": 12}"#);
        assert_eq!(v, AiVerdict { allowed: false, score: Some(12) });
        let v = parse_verdict_payload(r#"{"decision": "否", "score": 3}"#);
        assert!(!v.allowed);
    }

    #[test]
    fn test_parse_only_prompted_forms_allow() {
        assert!(parse_verdict_payload(r#"{"decision": " YES. ", "score": 70}"#).allowed);
        for decision in ["allowed? no", "allow", "true", "no, not yes", "yesterday"] {
            let payload = serde_json::json!({ "decision": decision, "score": 70 }).to_string();
            assert!(!parse_verdict_payload(&payload).allowed, "{decision:?} should deny");
        }
    }

    #[test]
    fn test_parse_missing_fields() {
        assert_eq!(parse_verdict_payload("{}"), AiVerdict { allowed: false, score: Some(0) });
        assert_eq!(
            parse_verdict_payload(r#"{"decision": "yes"}"#),
            AiVerdict { allowed: true, score: Some(0) }
        );
    }

    #[test]
    fn test_parse_score_forms() {
        assert_eq!(parse_verdict_payload(r#"{"decision":"yes","score":"77"}"#).score, Some(77));
        assert_eq!(parse_verdict_payload(r#"{"decision":"yes","score":"88 points"}"#).score, Some(88));
        assert_eq!(parse_verdict_payload(r#"{"decision":"yes","score":150}"#).score, Some(100));
        assert_eq!(parse_verdict_payload(r#"{"decision":"yes","score":-5}"#).score, Some(0));
        assert_eq!(parse_verdict_payload(r#"{"decision":"yes","score":64.9}"#).score, Some(64));
    }

    #[test]
    fn test_parse_malformed_denies() {
        assert_eq!(parse_verdict_payload("not json"), AiVerdict::MALFORMED);
        assert_eq!(parse_verdict_payload(r#"{"decision": "yes", "score": 90,}"#), AiVerdict::MALFORMED);
        assert_eq!(parse_verdict_payload(""), AiVerdict::MALFORMED);
    }

    #[test]
    fn test_wire_score() {
        assert_eq!(AiVerdict::UNKNOWN.wire_score(), -1);
        assert_eq!(AiVerdict::MALFORMED.wire_score(), 0);
    }
}
