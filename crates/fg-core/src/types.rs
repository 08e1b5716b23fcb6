//! Core type definitions for FocusGate
//!
//! These types map directly to the extension's storage keys and are used
//! throughout the decision engine. Field renames keep the on-disk (and
//! `chrome.storage`) layout stable.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Browser tab identifier.
pub type TabId = i32;

/// Group that collects rules added without an explicit group.
pub const UNCLASSIFIED_GROUP: &str = "Unclassified";

/// Name the extension's popup stores for the same group.
pub const LEGACY_UNCLASSIFIED_GROUP: &str = "未分类";

/// Whether `name` is the unclassified group under either stored name.
pub fn is_unclassified(name: &str) -> bool {
    name == UNCLASSIFIED_GROUP || name == LEGACY_UNCLASSIFIED_GROUP
}

// =============================================================================
// Modes
// =============================================================================

/// Blocking mode selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Mode {
    /// Rule-only blocking, no AI.
    Hardcore,
    /// Rules first, AI for everything else.
    #[default]
    Hybrid,
    /// AI judgment only (plus whitelist/passes).
    Ai,
}

impl Mode {
    /// Parse from the storage string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardcore" => Some(Self::Hardcore),
            "hybrid" => Some(Self::Hybrid),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }

    /// Whether this mode consults the AI verdict client at all.
    pub fn uses_ai(self) -> bool {
        !matches!(self, Self::Hardcore)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hardcore => "hardcore",
            Self::Hybrid => "hybrid",
            Self::Ai => "ai",
        })
    }
}

// =============================================================================
// Rules
// =============================================================================

/// A single blocking rule. Matches any URL containing `path_fragment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rule {
    /// Display label
    #[serde(rename = "name")]
    pub label: String,
    /// Normalized path fragment (no scheme, no leading `www.`)
    #[serde(rename = "path")]
    pub path_fragment: String,
}

/// A named group of rules. Grouping is cosmetic and never affects matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RuleGroup {
    #[serde(rename = "groupName")]
    pub name: String,
    #[serde(rename = "sites", default)]
    pub rules: Vec<Rule>,
}

// =============================================================================
// AI Provider
// =============================================================================

/// AI backend used for verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ProviderKind {
    #[default]
    Gemini,
    Openai,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Openai => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "openai" => Some(Self::Openai),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider selection and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProviderConfig {
    #[serde(rename = "ai_provider", default)]
    pub provider: ProviderKind,
    #[serde(rename = "api_key", default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,
}

impl ProviderConfig {
    /// Whether the selected provider has everything it needs to be called.
    pub fn is_configured(&self) -> bool {
        match self.provider {
            ProviderKind::Gemini => non_empty(&self.gemini_api_key).is_some(),
            ProviderKind::Openai => {
                non_empty(&self.openai_api_url).is_some()
                    && non_empty(&self.openai_api_key).is_some()
                    && non_empty(&self.openai_model).is_some()
            }
        }
    }

    /// Same credentials, different provider selection.
    pub fn with_provider(&self, provider: ProviderKind) -> Self {
        Self {
            provider,
            ..self.clone()
        }
    }
}

/// Last known health of a provider's API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApiStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiStatus {
    pub fn ok() -> Self {
        Self { success: true, message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Everything the decision engine reads from storage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settings {
    #[serde(rename = "current_mode", default)]
    pub mode: Mode,
    #[serde(rename = "ai_intent", default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Domains that are always allowed.
    #[serde(rename = "ai_permanent_whitelist", default)]
    pub permanent_whitelist: BTreeSet<String>,
    /// Full URL -> expiry (epoch milliseconds).
    #[serde(rename = "ai_temporary_pass", default)]
    #[ts(type = "Record<string, number>")]
    pub temporary_passes: BTreeMap<String, i64>,
}

impl Settings {
    /// The declared intent, if it is set and not blank.
    pub fn intent(&self) -> Option<&str> {
        non_empty(&self.intent)
    }
}

/// Partial settings update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(rename = "current_mode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(rename = "ai_intent", skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<RuleGroup>>,
    #[serde(rename = "ai_provider", skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    #[serde(rename = "api_key", skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,
    #[serde(rename = "ai_permanent_whitelist", skip_serializing_if = "Option::is_none")]
    pub permanent_whitelist: Option<BTreeSet<String>>,
    #[serde(rename = "ai_temporary_pass", skip_serializing_if = "Option::is_none")]
    pub temporary_passes: Option<BTreeMap<String, i64>>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply this patch onto `settings`.
    pub fn apply_to(self, settings: &mut Settings) {
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(intent) = self.intent {
            settings.intent = Some(intent);
        }
        if let Some(groups) = self.groups {
            settings.groups = groups;
        }
        if let Some(provider) = self.provider {
            settings.provider.provider = provider;
        }
        if let Some(key) = self.gemini_api_key {
            settings.provider.gemini_api_key = Some(key);
        }
        if let Some(url) = self.openai_api_url {
            settings.provider.openai_api_url = Some(url);
        }
        if let Some(key) = self.openai_api_key {
            settings.provider.openai_api_key = Some(key);
        }
        if let Some(model) = self.openai_model {
            settings.provider.openai_model = Some(model);
        }
        if let Some(whitelist) = self.permanent_whitelist {
            settings.permanent_whitelist = whitelist;
        }
        if let Some(passes) = self.temporary_passes {
            settings.temporary_passes = passes;
        }
    }
}

// =============================================================================
// Navigation
// =============================================================================

/// Tab load status as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// How long a user-granted pass lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PassDuration {
    /// One navigation on one tab.
    Once,
    /// One hour from now.
    Hour,
    /// Until the end of the current local day.
    Today,
    /// Forever (domain whitelist).
    Permanent,
}

impl PassDuration {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Some(Self::Once),
            "hour" => Some(Self::Hour),
            "today" => Some(Self::Today),
            "permanent" => Some(Self::Permanent),
            _ => None,
        }
    }
}

/// Why a navigation was sent to the interception view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "lowercase")]
#[ts(export)]
pub enum BlockReason {
    /// Matched a path rule.
    Hardcore,
    /// The AI judged the page irrelevant to the intent.
    Ai { intent: String, title: String },
}

impl BlockReason {
    /// Reason code as carried in the `reason` query parameter.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Hardcore => "hardcore",
            Self::Ai { .. } => "ai",
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
