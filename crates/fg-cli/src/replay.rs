//! Replay of recorded browser events against the engine.
//!
//! A script is JSON Lines, one event per line. Blank lines and lines
//! starting with `#` are skipped.
//!
//! ```text
//! {"event":"tab_updated","tabId":1,"url":"https://example.com/","title":"Example","status":"complete"}
//! {"event":"committed","tabId":1,"url":"https://example.com/games","frameId":0}
//! {"event":"history","tabId":1,"url":"https://example.com/feed","frameId":0}
//! {"event":"message","sender":1,"message":{"action":"grant_pass","url":"https://example.com/","duration":"once"}}
//! {"event":"sleep","ms":800}
//! {"event":"removed","tabId":1}
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use fg_core::{
    DecisionEngine, HistoryStateUpdated, LoadStatus, Message, NavigationCommitted, TabId, TabUpdated,
};

use crate::host::ConsoleHost;

/// One scripted browser event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    TabUpdated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        status: Option<LoadStatus>,
        #[serde(rename = "titleChanged", default)]
        title_changed: bool,
    },
    Committed {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        url: String,
        #[serde(rename = "frameId", default)]
        frame_id: i32,
    },
    History {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        url: String,
        #[serde(rename = "frameId", default)]
        frame_id: i32,
    },
    Removed {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    Message {
        #[serde(default)]
        sender: Option<TabId>,
        message: Message,
    },
    Sleep {
        ms: u64,
    },
}

/// Parse a script. Errors carry the 1-based line number.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEvent>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", index + 1, e))
        })
        .collect()
}

/// Counters reported after a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub events: usize,
    pub armed: usize,
    pub fast_path: usize,
    pub messages: usize,
}

/// Feed `events` to the engine in order, then wait for pending evaluations.
pub async fn run(
    engine: &DecisionEngine,
    host: &Arc<ConsoleHost>,
    events: Vec<ScriptEvent>,
) -> Result<ReplayStats, String> {
    let mut stats = ReplayStats::default();

    for event in events {
        stats.events += 1;
        log::debug!("replay: {:?}", event);
        match event {
            ScriptEvent::TabUpdated {
                tab_id,
                url,
                title,
                status,
                title_changed,
            } => {
                host.observe(tab_id, &url, title.as_deref(), status);
                let update = TabUpdated {
                    tab_id,
                    url,
                    title,
                    status,
                    title_changed,
                };
                if engine.on_tab_updated(update).is_some() {
                    stats.armed += 1;
                }
            }
            ScriptEvent::Committed { tab_id, url, frame_id } => {
                if frame_id == 0 {
                    host.observe(tab_id, &url, None, Some(LoadStatus::Loading));
                }
                let decision = engine
                    .on_navigation_committed(NavigationCommitted { tab_id, url, frame_id })
                    .await
                    .map_err(|e| e.to_string())?;
                if let Some(decision) = decision {
                    stats.fast_path += 1;
                    println!("tab {tab_id}: {decision:?}");
                }
            }
            ScriptEvent::History { tab_id, url, frame_id } => {
                if frame_id == 0 {
                    host.observe(tab_id, &url, None, None);
                }
                if engine
                    .on_history_state_updated(HistoryStateUpdated { tab_id, url, frame_id })
                    .is_some()
                {
                    stats.armed += 1;
                }
            }
            ScriptEvent::Removed { tab_id } => {
                host.remove(tab_id);
                engine.on_tab_removed(tab_id).await;
            }
            ScriptEvent::Message { sender, message } => {
                stats.messages += 1;
                let reply = engine.handle_message(message, sender).await;
                println!("reply: {}", serde_json::to_string(&reply).map_err(|e| e.to_string())?);
            }
            ScriptEvent::Sleep { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }

    let config = engine.config();
    tokio::time::sleep(config.debounce_window + config.rearm_cooldown).await;
    Ok(stats)
}
