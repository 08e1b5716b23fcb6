//! Browser tab host contract.

use async_trait::async_trait;

use crate::types::{LoadStatus, TabId};

/// Error type for tab operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Tab {0} no longer exists")]
    TabGone(TabId),
    #[error("Tab operation failed: {0}")]
    Failed(String),
}

/// Live view of a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub tab_id: TabId,
    pub url: String,
    pub title: Option<String>,
    pub status: Option<LoadStatus>,
}

/// The browser's tab API as seen by the engine.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Current state of a tab, or `None` if it was closed.
    async fn tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>, HostError>;

    /// Replace the tab's location.
    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), HostError>;

    /// Step back in the tab's history. Returns false if there was no entry
    /// to go back to.
    async fn go_back(&self, tab_id: TabId) -> Result<bool, HostError>;

    async fn close(&self, tab_id: TabId) -> Result<(), HostError>;
}
