//! Terminal stand-ins for the browser: an in-memory tab table that prints
//! every navigation, and a verdict client that never calls out.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use fg_core::{
    AiVerdict, HostError, LoadStatus, ProviderConfig, TabHost, TabId, TabSnapshot, VerdictClient, VerdictError,
};

#[derive(Debug, Default)]
struct Tab {
    url: String,
    title: Option<String>,
    status: Option<LoadStatus>,
    back: Vec<String>,
}

/// In-memory tabs with per-tab history.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    tabs: Mutex<HashMap<TabId, Tab>>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn tabs(&self) -> MutexGuard<'_, HashMap<TabId, Tab>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record what the browser reports about a tab. A new URL pushes the
    /// previous one onto the tab's history.
    pub fn observe(&self, tab_id: TabId, url: &str, title: Option<&str>, status: Option<LoadStatus>) {
        let mut tabs = self.tabs();
        let tab = tabs.entry(tab_id).or_default();
        if tab.url != url {
            if !tab.url.is_empty() {
                let previous = std::mem::take(&mut tab.url);
                tab.back.push(previous);
            }
            tab.url = url.to_string();
            tab.title = None;
            tab.status = None;
        }
        if let Some(title) = title {
            tab.title = Some(title.to_string());
        }
        if status.is_some() {
            tab.status = status;
        }
    }

    pub fn remove(&self, tab_id: TabId) {
        self.tabs().remove(&tab_id);
    }
}

#[async_trait]
impl TabHost for ConsoleHost {
    async fn tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>, HostError> {
        Ok(self.tabs().get(&tab_id).map(|tab| TabSnapshot {
            tab_id,
            url: tab.url.clone(),
            title: tab.title.clone(),
            status: tab.status,
        }))
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), HostError> {
        if !self.tabs().contains_key(&tab_id) {
            return Err(HostError::TabGone(tab_id));
        }
        self.observe(tab_id, url, None, None);
        println!("tab {tab_id} -> {url}");
        Ok(())
    }

    async fn go_back(&self, tab_id: TabId) -> Result<bool, HostError> {
        let mut tabs = self.tabs();
        let tab = tabs.get_mut(&tab_id).ok_or(HostError::TabGone(tab_id))?;
        let Some(previous) = tab.back.pop() else {
            return Ok(false);
        };
        tab.url = previous;
        tab.title = None;
        tab.status = None;
        println!("tab {tab_id} <- {}", tab.url);
        Ok(true)
    }

    async fn close(&self, tab_id: TabId) -> Result<(), HostError> {
        self.remove(tab_id);
        println!("tab {tab_id} closed");
        Ok(())
    }
}

/// Verdict client for offline runs: never judges.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineVerdicts;

#[async_trait]
impl VerdictClient for OfflineVerdicts {
    async fn evaluate(&self, _title: &str, _intent: &str, _provider: &ProviderConfig) -> Result<AiVerdict, VerdictError> {
        Ok(AiVerdict::UNKNOWN)
    }

    async fn validate(&self, provider: &ProviderConfig) -> Result<(), VerdictError> {
        Err(VerdictError::NotConfigured(format!("{} (offline)", provider.provider)))
    }
}
