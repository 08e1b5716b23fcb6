//! Settings persisted as a single JSON document on disk.
//!
//! The document uses the extension's storage keys, so an exported
//! `chrome.storage.local` dump can be used as-is.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use fg_core::store::{api_status_key, SCORE_HISTORY_KEY};
use fg_core::{ApiStatus, ProviderKind, ScoreHistory, Settings, SettingsPatch, SettingsStore, StoreError};

/// [`SettingsStore`] over a JSON file. A missing file reads as empty
/// settings and is created on the first write.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_doc(&self) -> Result<Map<String, Value>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&text)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(StoreError::Corrupt(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn write_doc(&self, doc: Map<String, Value>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&Value::Object(doc))?;
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }

    /// Read-modify-write of the whole document.
    async fn edit<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<(), StoreError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_doc().await?;
        apply(&mut doc)?;
        self.write_doc(doc).await
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.read_doc().await?))?)
    }

    async fn update(&self, patch: SettingsPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let Value::Object(fields) = serde_json::to_value(&patch)? else {
            return Err(StoreError::Corrupt("settings patch is not an object".to_string()));
        };
        self.edit(|doc| {
            doc.extend(fields);
            Ok(())
        })
        .await
    }

    async fn scores(&self) -> Result<ScoreHistory, StoreError> {
        match self.read_doc().await?.remove(SCORE_HISTORY_KEY) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(ScoreHistory::new()),
        }
    }

    async fn save_scores(&self, history: &ScoreHistory) -> Result<(), StoreError> {
        let value = serde_json::to_value(history)?;
        self.edit(|doc| {
            doc.insert(SCORE_HISTORY_KEY.to_string(), value);
            Ok(())
        })
        .await
    }

    async fn api_status(&self, provider: ProviderKind) -> Result<Option<ApiStatus>, StoreError> {
        match self.read_doc().await?.remove(&api_status_key(provider)) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_api_status(&self, provider: ProviderKind, status: &ApiStatus) -> Result<(), StoreError> {
        let value = serde_json::to_value(status)?;
        self.edit(|doc| {
            doc.insert(api_status_key(provider), value);
            Ok(())
        })
        .await
    }
}
