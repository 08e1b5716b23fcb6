//! Inbound messages from the extension's views
//!
//! The interception view grants passes and sends tabs back; the settings
//! view validates provider credentials. Messages are JSON objects tagged by
//! their `action` field.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::engine::{DecisionEngine, EngineError};
use crate::passes::apply_grant;
use crate::types::{ApiStatus, PassDuration, ProviderConfig, ProviderKind, SettingsPatch, TabId};

/// A request sent to the background engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export)]
pub enum Message {
    /// Let the user through to `url`, then navigate there.
    GrantPass {
        url: String,
        /// Falls back to the sending tab when absent.
        #[serde(rename = "tabId", default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<TabId>,
        duration: PassDuration,
    },
    /// Leave the interception view: history back, or close the tab.
    GoBack {
        #[serde(rename = "tabId", default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<TabId>,
    },
    /// Check credentials for `provider` and persist the result.
    ValidateApi {
        provider: ProviderKind,
        settings: ProviderConfig,
    },
    /// Re-validate the stored provider configuration.
    RefreshApiStatus,
}

/// Response to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum Reply {
    Done,
    ApiStatus(ApiStatus),
    Error { message: String },
}

impl Reply {
    fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}

impl DecisionEngine {
    /// Dispatch one message. `sender_tab` is the tab the message came from,
    /// if any.
    pub async fn handle_message(&self, message: Message, sender_tab: Option<TabId>) -> Reply {
        log::debug!("message from tab {:?}: {:?}", sender_tab, message);
        let result = match message {
            Message::GrantPass { url, tab_id, duration } => match tab_id.or(sender_tab) {
                Some(tab_id) => self.grant_pass(tab_id, &url, duration).await.map(|()| Reply::Done),
                None => Err(EngineError::InvalidRequest("grant_pass needs a tab".to_string())),
            },
            Message::GoBack { tab_id } => match tab_id.or(sender_tab) {
                Some(tab_id) => self.go_back(tab_id).await.map(|()| Reply::Done),
                None => Err(EngineError::InvalidRequest("go_back needs a tab".to_string())),
            },
            Message::ValidateApi { provider, settings } => {
                Ok(Reply::ApiStatus(self.validate_api(&settings.with_provider(provider)).await))
            }
            Message::RefreshApiStatus => self.refresh_api_status().await.map(Reply::ApiStatus),
        };

        result.unwrap_or_else(|e| {
            log::warn!("message failed: {}", e);
            Reply::error(e)
        })
    }

    /// Record a pass for `url` and send the tab there.
    ///
    /// `once` passes live in the session store and cover the next
    /// navigation of `tab_id` to exactly `url`; the others are persisted in
    /// settings.
    pub async fn grant_pass(&self, tab_id: TabId, url: &str, duration: PassDuration) -> Result<(), EngineError> {
        if url.trim().is_empty() {
            return Err(EngineError::InvalidRequest("grant_pass needs a url".to_string()));
        }
        let inner = &self.inner;

        if duration == PassDuration::Once {
            inner.session.set_one_shot(tab_id, url).await?;
        } else {
            let mut settings = inner.settings.load().await?;
            apply_grant(
                &mut settings,
                url,
                duration,
                inner.clock.now_millis(),
                inner.clock.end_of_day_millis(),
            );
            let patch = if duration == PassDuration::Permanent {
                SettingsPatch {
                    permanent_whitelist: Some(settings.permanent_whitelist),
                    ..SettingsPatch::default()
                }
            } else {
                SettingsPatch {
                    temporary_passes: Some(settings.temporary_passes),
                    ..SettingsPatch::default()
                }
            };
            inner.settings.update(patch).await?;
        }

        log::info!("tab {}: {:?} pass granted for {}", tab_id, duration, url);
        inner.host.navigate(tab_id, url).await?;
        Ok(())
    }

    /// Step the tab back, closing it when there is nowhere to go.
    pub async fn go_back(&self, tab_id: TabId) -> Result<(), EngineError> {
        if !self.inner.host.go_back(tab_id).await? {
            log::debug!("tab {}: no history, closing", tab_id);
            self.inner.host.close(tab_id).await?;
        }
        Ok(())
    }

    /// Validate `config` against its provider and persist the outcome under
    /// that provider's status key.
    pub async fn validate_api(&self, config: &ProviderConfig) -> ApiStatus {
        let status = if !config.is_configured() {
            ApiStatus::failed(format!("{} is not configured", config.provider))
        } else {
            match self.inner.verdicts.validate(config).await {
                Ok(()) => ApiStatus::ok(),
                Err(e) => ApiStatus::failed(e.to_string()),
            }
        };

        if let Err(e) = self.inner.settings.set_api_status(config.provider, &status).await {
            log::warn!("Failed to store {} API status: {}", config.provider, e);
        }
        log::info!("{} API status: {:?}", config.provider, status);
        status
    }

    /// Validate the stored provider configuration.
    pub async fn refresh_api_status(&self) -> Result<ApiStatus, EngineError> {
        let settings = self.inner.settings.load().await?;
        Ok(self.validate_api(&settings.provider).await)
    }
}
