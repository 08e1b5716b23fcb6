//! Storage contracts
//!
//! `SettingsStore` is the durable key-value store (mode, intent, rules,
//! provider config, whitelist, passes, score history, API status).
//! `SessionStore` holds one-shot passes and is cleared when the browser
//! session ends.
//!
//! Read-modify-write sequences built on these traits are not atomic across
//! concurrent writers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::history::ScoreHistory;
use crate::types::{ApiStatus, ProviderKind, Settings, SettingsPatch, TabId};

/// Storage key for the score history.
pub const SCORE_HISTORY_KEY: &str = "focus_scores_history";

/// Error type for storage access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(String),
    #[error("Stored data is invalid: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Session key for a tab's one-shot pass.
pub fn one_shot_key(tab_id: TabId) -> String {
    format!("oneTimePass_tab_{tab_id}")
}

/// Storage key for a provider's last validation result.
pub fn api_status_key(provider: ProviderKind) -> String {
    format!("api_status_{provider}")
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings, StoreError>;

    async fn update(&self, patch: SettingsPatch) -> Result<(), StoreError>;

    async fn scores(&self) -> Result<ScoreHistory, StoreError>;

    async fn save_scores(&self, history: &ScoreHistory) -> Result<(), StoreError>;

    async fn api_status(&self, provider: ProviderKind) -> Result<Option<ApiStatus>, StoreError>;

    async fn set_api_status(&self, provider: ProviderKind, status: &ApiStatus) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// URL authorized by the tab's one-shot pass, if any.
    async fn one_shot(&self, tab_id: TabId) -> Result<Option<String>, StoreError>;

    /// Create or overwrite the tab's one-shot pass.
    async fn set_one_shot(&self, tab_id: TabId, url: &str) -> Result<(), StoreError>;

    async fn remove_one_shot(&self, tab_id: TabId) -> Result<(), StoreError>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    settings: Settings,
    scores: ScoreHistory,
    api_status: HashMap<ProviderKind, ApiStatus>,
    session: HashMap<String, String>,
}

/// Process-lifetime store implementing both contracts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                settings,
                ..MemoryState::default()
            }),
        }
    }

    /// Drop all session entries, as a browser restart would.
    pub async fn clear_session(&self) {
        self.state.lock().await.session.clear();
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn update(&self, patch: SettingsPatch) -> Result<(), StoreError> {
        patch.apply_to(&mut self.state.lock().await.settings);
        Ok(())
    }

    async fn scores(&self) -> Result<ScoreHistory, StoreError> {
        Ok(self.state.lock().await.scores.clone())
    }

    async fn save_scores(&self, history: &ScoreHistory) -> Result<(), StoreError> {
        self.state.lock().await.scores = history.clone();
        Ok(())
    }

    async fn api_status(&self, provider: ProviderKind) -> Result<Option<ApiStatus>, StoreError> {
        Ok(self.state.lock().await.api_status.get(&provider).cloned())
    }

    async fn set_api_status(&self, provider: ProviderKind, status: &ApiStatus) -> Result<(), StoreError> {
        self.state.lock().await.api_status.insert(provider, status.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn one_shot(&self, tab_id: TabId) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.session.get(&one_shot_key(tab_id)).cloned())
    }

    async fn set_one_shot(&self, tab_id: TabId, url: &str) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .session
            .insert(one_shot_key(tab_id), url.to_string());
        Ok(())
    }

    async fn remove_one_shot(&self, tab_id: TabId) -> Result<(), StoreError> {
        self.state.lock().await.session.remove(&one_shot_key(tab_id));
        Ok(())
    }
}
