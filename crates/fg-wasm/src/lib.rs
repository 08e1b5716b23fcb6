//! WebAssembly bindings for FocusGate
//!
//! Exposes the pure parts of the decision engine (rule matching, rule path
//! normalization, interception URLs, AI payload parsing, focus score) to the
//! extension's JavaScript.

mod logger;

use std::sync::{OnceLock, RwLock};

use fg_core::interception::{interception_url as build_interception_url, parse_interception_url as parse_view_url};
use fg_core::rules::{is_blocked_in, matching_rule};
use fg_core::verdict::parse_verdict_payload;
use fg_core::{BlockReason, Mode, RuleGroup, ScoreHistory};
use wasm_bindgen::prelude::*;

static RULES: OnceLock<RwLock<Vec<RuleGroup>>> = OnceLock::new();

fn rules() -> &'static RwLock<Vec<RuleGroup>> {
    RULES.get_or_init(|| RwLock::new(Vec::new()))
}

fn set_field(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &key.into(), value);
}

fn groups_from_js(groups: &JsValue) -> Result<Vec<RuleGroup>, JsValue> {
    if groups.is_undefined() || groups.is_null() {
        return Ok(Vec::new());
    }
    let json: String = js_sys::JSON::stringify(groups)?.into();
    serde_json::from_str(&json).map_err(|e| JsValue::from_str(&format!("Invalid rule groups: {}", e)))
}

// =============================================================================
// Logging
// =============================================================================

/// Send engine logs to the console. `level` is one of
/// `error|warn|info|debug|trace` (default `info`).
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) {
    let filter = level
        .as_deref()
        .and_then(|l| l.parse().ok())
        .unwrap_or(log::LevelFilter::Info);
    logger::install(filter);
}

// =============================================================================
// Rules
// =============================================================================

/// Replace the loaded rule book (the `groups` storage value).
#[wasm_bindgen]
pub fn load_rules(groups: JsValue) -> Result<u32, JsValue> {
    let groups = groups_from_js(&groups)?;
    let count: usize = groups.iter().map(|g| g.rules.len()).sum();
    let mut loaded = rules().write().map_err(|_| JsValue::from_str("Rule book is poisoned"))?;
    *loaded = groups;
    log::debug!("Loaded {} rules", count);
    Ok(count as u32)
}

/// Whether `url` is blocked by the loaded rules under `mode`
/// (`hardcore|hybrid|ai`). AI mode never blocks by rule.
#[wasm_bindgen]
pub fn is_blocked(mode: &str, url: &str) -> bool {
    let mode = Mode::parse(mode).unwrap_or_default();
    match rules().read() {
        Ok(groups) => is_blocked_in(mode, url, &groups),
        Err(_) => false,
    }
}

/// Stateless check against an explicit rule book.
#[wasm_bindgen]
pub fn is_blocked_by(url: &str, groups: JsValue) -> Result<bool, JsValue> {
    Ok(fg_core::is_blocked(url, &groups_from_js(&groups)?))
}

/// The loaded rule matching `url`, as `{ name, path }`, or `null`.
#[wasm_bindgen]
pub fn matching_rule_for(url: &str) -> JsValue {
    let Ok(groups) = rules().read() else {
        return JsValue::NULL;
    };
    match matching_rule(url, &groups) {
        Some(rule) => {
            let result = js_sys::Object::new();
            set_field(&result, "name", &JsValue::from_str(&rule.label));
            set_field(&result, "path", &JsValue::from_str(&rule.path_fragment));
            result.into()
        }
        None => JsValue::NULL,
    }
}

/// Normalize user input into a rule path. Throws a message on invalid input.
#[wasm_bindgen]
pub fn normalize_rule_path(input: &str) -> Result<String, JsValue> {
    fg_core::normalize_rule_path(input).map_err(|e| JsValue::from_str(&e.to_string()))
}

// =============================================================================
// URLs
// =============================================================================

#[wasm_bindgen]
pub fn is_web_url(url: &str) -> bool {
    fg_core::url::is_web_url(url)
}

/// Lowercased host without `www.`, or `undefined`.
#[wasm_bindgen]
pub fn domain_of(url: &str) -> Option<String> {
    fg_core::url::domain_of(url)
}

/// Redirect target for a blocked page. `intent`/`title` are only used when
/// `reason` is `ai`.
#[wasm_bindgen]
pub fn interception_url(
    view_base: &str,
    original_url: &str,
    reason: &str,
    intent: Option<String>,
    title: Option<String>,
    tab_id: i32,
) -> Result<String, JsValue> {
    let reason = match reason {
        "hardcore" => BlockReason::Hardcore,
        "ai" => BlockReason::Ai {
            intent: intent.unwrap_or_default(),
            title: title.unwrap_or_else(|| fg_core::interception::UNKNOWN_TITLE.to_string()),
        },
        other => return Err(JsValue::from_str(&format!("Unknown block reason: {}", other))),
    };
    Ok(build_interception_url(view_base, original_url, &reason, tab_id))
}

/// `{ url, reason, intent?, title?, tabId? }` from an interception view URL,
/// or `null`.
#[wasm_bindgen]
pub fn parse_interception_url(url: &str) -> JsValue {
    let Some(request) = parse_view_url(url) else {
        return JsValue::NULL;
    };

    let result = js_sys::Object::new();
    set_field(&result, "url", &JsValue::from_str(&request.original_url));
    set_field(&result, "reason", &JsValue::from_str(request.reason.code()));
    if let BlockReason::Ai { intent, title } = &request.reason {
        set_field(&result, "intent", &JsValue::from_str(intent));
        set_field(&result, "title", &JsValue::from_str(title));
    }
    if let Some(tab_id) = request.tab_id {
        set_field(&result, "tabId", &JsValue::from(tab_id));
    }
    result.into()
}

// =============================================================================
// AI and scores
// =============================================================================

/// Parse a model answer into `{ allowed, score }`.
#[wasm_bindgen]
pub fn parse_ai_payload(raw: &str) -> JsValue {
    let verdict = parse_verdict_payload(raw);
    let result = js_sys::Object::new();
    set_field(&result, "allowed", &JsValue::from(verdict.allowed));
    set_field(&result, "score", &JsValue::from(verdict.wire_score()));
    result.into()
}

/// Rounded mean of the stored score history (last 100 kept), or
/// `undefined` when empty.
#[wasm_bindgen]
pub fn focus_score(scores: &[u8]) -> Option<u8> {
    let mut history = ScoreHistory::new();
    for &score in scores {
        history.record(score);
    }
    history.focus_score()
}
