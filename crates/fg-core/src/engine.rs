//! Navigation Decision Engine
//!
//! Every top-level navigation ends here, either through the debounced path
//! (tab updates, title changes, history-state updates) or through the
//! immediate commit path used for rule-only blocking.
//!
//! Pipeline, each step a short-circuit:
//! 1. one-shot pass for the tab
//! 2. mode dispatch
//! 3. permanent whitelist / temporary pass (AI and hybrid modes)
//! 4. path rules (hardcore and hybrid modes)
//! 5. AI verdict (AI and hybrid modes)
//!
//! A redirect to the interception view is terminal for the evaluation.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::debounce::{ArmOutcome, Debouncer, DEFAULT_DEBOUNCE_WINDOW, DEFAULT_REARM_COOLDOWN};
use crate::history::TRUSTED_SCORE;
use crate::host::{HostError, TabHost};
use crate::interception::{interception_url, is_interception_url, UNKNOWN_TITLE};
use crate::passes::{check_pass, PassMatch};
use crate::rules::matching_rule;
use crate::store::{SessionStore, SettingsStore, StoreError};
use crate::types::{BlockReason, LoadStatus, Mode, Settings, TabId};
use crate::url::is_web_url;
use crate::verdict::{AiVerdict, VerdictClient};

/// Default location of the interception view.
pub const DEFAULT_INTERCEPTION_VIEW: &str = "chrome-extension://focusgate/interception.html";

// =============================================================================
// Configuration
// =============================================================================

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Quiet period before a tab's debounced evaluation runs.
    pub debounce_window: Duration,
    /// Minimum spacing between armed evaluations for the same tab.
    pub rearm_cooldown: Duration,
    /// Base URL of the interception view. URLs under it never trigger
    /// evaluation.
    pub interception_view: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            rearm_cooldown: DEFAULT_REARM_COOLDOWN,
            interception_view: DEFAULT_INTERCEPTION_VIEW.to_string(),
        }
    }
}

/// External collaborators the engine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<dyn SettingsStore>,
    pub session: Arc<dyn SessionStore>,
    pub verdicts: Arc<dyn VerdictClient>,
    pub host: Arc<dyn TabHost>,
    pub clock: Arc<dyn Clock>,
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// =============================================================================
// Events
// =============================================================================

/// `tabs.onUpdated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabUpdated {
    pub tab_id: TabId,
    pub url: String,
    pub title: Option<String>,
    /// Present when the update carried a status change.
    pub status: Option<LoadStatus>,
    pub title_changed: bool,
}

/// `webNavigation.onCommitted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationCommitted {
    pub tab_id: TabId,
    pub url: String,
    pub frame_id: i32,
}

/// `webNavigation.onHistoryStateUpdated` (single-page-app navigation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStateUpdated {
    pub tab_id: TabId,
    pub url: String,
    pub frame_id: i32,
}

/// Input to one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTrigger {
    pub tab_id: TabId,
    pub url: String,
    pub title: Option<String>,
    pub status: Option<LoadStatus>,
}

// =============================================================================
// Decisions
// =============================================================================

/// Why a navigation was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    OneShotPass,
    Whitelisted,
    TemporaryPass,
    NoRuleMatched,
    NoIntent,
    AiApproved,
    /// The AI could not judge (missing config, transport failure).
    AiUnavailable,
    /// The tab left the judged page (or closed) while the AI was answering.
    Superseded,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Redirect { reason: BlockReason, target: String },
}

impl Decision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

// =============================================================================
// Engine
// =============================================================================

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) debouncer: Debouncer,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) verdicts: Arc<dyn VerdictClient>,
    pub(crate) host: Arc<dyn TabHost>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// The per-navigation decision engine. Cheap to clone.
#[derive(Clone)]
pub struct DecisionEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let debouncer = Debouncer::new(config.debounce_window, config.rearm_cooldown);
        Self {
            inner: Arc::new(EngineInner {
                config,
                debouncer,
                settings: collaborators.settings,
                session: collaborators.session,
                verdicts: collaborators.verdicts,
                host: collaborators.host,
                clock: collaborators.clock,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Whether `url` is a page the engine judges at all.
    pub fn should_evaluate(&self, url: &str) -> bool {
        self.inner.should_evaluate(url)
    }

    /// Whether a debounced evaluation is waiting for `tab_id`.
    pub fn is_pending(&self, tab_id: TabId) -> bool {
        self.inner.debouncer.is_pending(tab_id)
    }

    /// Handle a tab update. Only status and title changes qualify.
    /// Must be called from within a tokio runtime.
    pub fn on_tab_updated(&self, event: TabUpdated) -> Option<ArmOutcome> {
        if event.status.is_none() && !event.title_changed {
            return None;
        }
        self.arm(NavigationTrigger {
            tab_id: event.tab_id,
            url: event.url,
            title: event.title,
            status: event.status,
        })
    }

    /// Handle a single-page-app navigation in the top frame.
    pub fn on_history_state_updated(&self, event: HistoryStateUpdated) -> Option<ArmOutcome> {
        if event.frame_id != 0 {
            return None;
        }
        self.arm(NavigationTrigger {
            tab_id: event.tab_id,
            url: event.url,
            title: None,
            status: None,
        })
    }

    /// Immediate rule check on commit, bypassing the debounce window.
    ///
    /// Only acts in hardcore mode, where no AI call is involved; other modes
    /// are left to the debounced path. Returns `None` when nothing was
    /// evaluated.
    pub async fn on_navigation_committed(&self, event: NavigationCommitted) -> Result<Option<Decision>, EngineError> {
        if event.frame_id != 0 || !self.inner.should_evaluate(&event.url) {
            return Ok(None);
        }

        let settings = self.inner.settings.load().await?;
        if settings.mode != Mode::Hardcore {
            return Ok(None);
        }

        let trigger = NavigationTrigger {
            tab_id: event.tab_id,
            url: event.url,
            title: None,
            status: None,
        };
        if let Some(decision) = self.inner.check_one_shot(&trigger).await? {
            return Ok(Some(decision));
        }
        let decision = match self.inner.apply_rules(&trigger, &settings).await? {
            Some(decision) => decision,
            None => Decision::Allow(AllowReason::NoRuleMatched),
        };
        log::debug!("tab {}: commit fast path -> {:?}", trigger.tab_id, decision);
        Ok(Some(decision))
    }

    /// Forget everything about a closed tab.
    pub async fn on_tab_removed(&self, tab_id: TabId) {
        if self.inner.debouncer.cancel(tab_id) {
            log::debug!("tab {}: closed, pending evaluation cancelled", tab_id);
        }
        if let Err(e) = self.inner.session.remove_one_shot(tab_id).await {
            log::warn!("tab {}: failed to drop one-shot pass: {}", tab_id, e);
        }
    }

    /// Run the pipeline for `trigger` now.
    pub async fn evaluate(&self, trigger: NavigationTrigger) -> Result<Decision, EngineError> {
        self.inner.evaluate(trigger).await
    }

    fn arm(&self, trigger: NavigationTrigger) -> Option<ArmOutcome> {
        if !self.inner.should_evaluate(&trigger.url) {
            log::trace!("tab {}: ignoring {}", trigger.tab_id, trigger.url);
            return None;
        }
        let inner = Arc::clone(&self.inner);
        let tab_id = trigger.tab_id;
        Some(
            self.inner
                .debouncer
                .schedule(tab_id, async move { inner.run_debounced(trigger).await }),
        )
    }
}

impl EngineInner {
    fn should_evaluate(&self, url: &str) -> bool {
        is_web_url(url) && !is_interception_url(&self.config.interception_view, url)
    }

    async fn run_debounced(&self, trigger: NavigationTrigger) {
        let tab_id = trigger.tab_id;
        let trigger = match self.refresh(trigger).await {
            Ok(Some(trigger)) => trigger,
            Ok(None) => return,
            Err(e) => {
                log::debug!("tab {}: evaluation aborted: {}", tab_id, e);
                return;
            }
        };

        match self.evaluate(trigger).await {
            Ok(decision) => log::debug!("tab {}: {:?}", tab_id, decision),
            Err(EngineError::Host(HostError::TabGone(_))) => {
                log::debug!("tab {}: closed during evaluation", tab_id);
            }
            Err(e) => log::warn!("tab {}: evaluation failed: {}", tab_id, e),
        }
    }

    /// Re-read the tab before a delayed evaluation. `None` when the tab is
    /// gone or now sits on an excluded URL (including the interception view).
    async fn refresh(&self, trigger: NavigationTrigger) -> Result<Option<NavigationTrigger>, HostError> {
        let Some(live) = self.host.tab(trigger.tab_id).await? else {
            log::debug!("tab {}: closed before evaluation", trigger.tab_id);
            return Ok(None);
        };
        if !self.should_evaluate(&live.url) {
            log::trace!("tab {}: now on {}, skipping", trigger.tab_id, live.url);
            return Ok(None);
        }
        if live.url != trigger.url {
            log::debug!("tab {}: moved on to {}", trigger.tab_id, live.url);
        }

        Ok(Some(NavigationTrigger {
            tab_id: trigger.tab_id,
            url: live.url,
            title: live.title.or(trigger.title),
            status: live.status.or(trigger.status),
        }))
    }

    pub(crate) async fn evaluate(&self, trigger: NavigationTrigger) -> Result<Decision, EngineError> {
        if let Some(decision) = self.check_one_shot(&trigger).await? {
            return Ok(decision);
        }

        let settings = self.settings.load().await?;
        let decision = match settings.mode {
            Mode::Hardcore => match self.apply_rules(&trigger, &settings).await? {
                Some(decision) => decision,
                None => Decision::Allow(AllowReason::NoRuleMatched),
            },
            Mode::Hybrid => {
                if let Some(decision) = self.apply_passes(&trigger, &settings).await {
                    decision
                } else if let Some(decision) = self.apply_rules(&trigger, &settings).await? {
                    decision
                } else {
                    self.apply_ai(&trigger, &settings).await?
                }
            }
            Mode::Ai => match self.apply_passes(&trigger, &settings).await {
                Some(decision) => decision,
                None => self.apply_ai(&trigger, &settings).await?,
            },
        };

        log::info!("[{}] tab {}: {} -> {:?}", settings.mode, trigger.tab_id, trigger.url, decision);
        Ok(decision)
    }

    /// Step 1. Allows on a matching pass (consuming it once the page has
    /// fully loaded); drops a stale pass and lets evaluation continue.
    pub(crate) async fn check_one_shot(&self, trigger: &NavigationTrigger) -> Result<Option<Decision>, EngineError> {
        let Some(pass_url) = self.session.one_shot(trigger.tab_id).await? else {
            return Ok(None);
        };

        if pass_url == trigger.url {
            if trigger.status == Some(LoadStatus::Complete) {
                self.session.remove_one_shot(trigger.tab_id).await?;
                log::info!("tab {}: one-shot pass for {} consumed", trigger.tab_id, pass_url);
            } else {
                log::debug!("tab {}: one-shot pass for {} honored", trigger.tab_id, pass_url);
            }
            return Ok(Some(Decision::Allow(AllowReason::OneShotPass)));
        }

        self.session.remove_one_shot(trigger.tab_id).await?;
        log::debug!(
            "tab {}: left {} while holding a pass, pass dropped",
            trigger.tab_id,
            pass_url
        );
        Ok(None)
    }

    async fn apply_passes(&self, trigger: &NavigationTrigger, settings: &Settings) -> Option<Decision> {
        let hit = check_pass(settings, &trigger.url, self.clock.now_millis())?;
        self.record_score(TRUSTED_SCORE).await;
        Some(Decision::Allow(match hit {
            PassMatch::Whitelisted => AllowReason::Whitelisted,
            PassMatch::TemporaryPass { .. } => AllowReason::TemporaryPass,
        }))
    }

    pub(crate) async fn apply_rules(
        &self,
        trigger: &NavigationTrigger,
        settings: &Settings,
    ) -> Result<Option<Decision>, EngineError> {
        let Some(rule) = matching_rule(&trigger.url, &settings.groups) else {
            return Ok(None);
        };
        log::info!(
            "tab {}: {} matched rule {:?} ({})",
            trigger.tab_id,
            trigger.url,
            rule.label,
            rule.path_fragment
        );
        self.redirect(trigger, BlockReason::Hardcore).await.map(Some)
    }

    async fn apply_ai(&self, trigger: &NavigationTrigger, settings: &Settings) -> Result<Decision, EngineError> {
        let Some(intent) = settings.intent() else {
            log::debug!("tab {}: no intent set, skipping AI check", trigger.tab_id);
            return Ok(Decision::Allow(AllowReason::NoIntent));
        };

        let title = trigger.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let verdict = match self
            .verdicts
            .evaluate(title.unwrap_or(&trigger.url), intent, &settings.provider)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                log::warn!("AI verdict unavailable for {}: {}", trigger.url, e);
                AiVerdict::UNKNOWN
            }
        };

        if let Some(score) = verdict.score {
            self.record_score(score).await;
        }

        if verdict.allowed {
            return Ok(Decision::Allow(if verdict.score.is_some() {
                AllowReason::AiApproved
            } else {
                AllowReason::AiUnavailable
            }));
        }

        if !self.still_on(trigger).await? {
            return Ok(Decision::Allow(AllowReason::Superseded));
        }

        let reason = BlockReason::Ai {
            intent: intent.to_string(),
            title: title.unwrap_or(UNKNOWN_TITLE).to_string(),
        };
        self.redirect(trigger, reason).await
    }

    /// Whether the tab still shows the page a verdict was asked about.
    async fn still_on(&self, trigger: &NavigationTrigger) -> Result<bool, HostError> {
        match self.host.tab(trigger.tab_id).await? {
            Some(live) if live.url == trigger.url => Ok(true),
            Some(live) => {
                log::debug!(
                    "tab {}: verdict for {} arrived after it moved to {}, not redirecting",
                    trigger.tab_id,
                    trigger.url,
                    live.url
                );
                Ok(false)
            }
            None => {
                log::debug!("tab {}: closed while the AI judged {}", trigger.tab_id, trigger.url);
                Ok(false)
            }
        }
    }

    async fn record_score(&self, score: u8) {
        let result = async {
            let mut history = self.settings.scores().await?;
            history.record(score);
            self.settings.save_scores(&history).await
        }
        .await;
        if let Err(e) = result {
            log::warn!("Failed to record focus score {}: {}", score, e);
        }
    }

    async fn redirect(&self, trigger: &NavigationTrigger, reason: BlockReason) -> Result<Decision, EngineError> {
        let target = interception_url(&self.config.interception_view, &trigger.url, &reason, trigger.tab_id);
        self.debouncer.cancel_pending(trigger.tab_id);
        self.host.navigate(trigger.tab_id, &target).await?;
        log::info!("tab {}: blocked ({}) {}", trigger.tab_id, reason.code(), trigger.url);
        Ok(Decision::Redirect { reason, target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::host::TabSnapshot;
    use crate::store::MemoryStore;
    use crate::types::{ProviderConfig, Rule, RuleGroup};
    use crate::verdict::VerdictError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct FakeHost {
        tabs: Mutex<HashMap<TabId, TabSnapshot>>,
        navigations: Mutex<Vec<(TabId, String)>>,
    }

    impl FakeHost {
        fn open(&self, tab_id: TabId, url: &str, title: Option<&str>) {
            self.tabs.lock().unwrap().insert(
                tab_id,
                TabSnapshot {
                    tab_id,
                    url: url.to_string(),
                    title: title.map(str::to_string),
                    status: None,
                },
            );
        }

        fn navigations(&self) -> Vec<(TabId, String)> {
            self.navigations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TabHost for FakeHost {
        async fn tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>, HostError> {
            Ok(self.tabs.lock().unwrap().get(&tab_id).cloned())
        }

        async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), HostError> {
            let mut tabs = self.tabs.lock().unwrap();
            let tab = tabs.get_mut(&tab_id).ok_or(HostError::TabGone(tab_id))?;
            tab.url = url.to_string();
            self.navigations.lock().unwrap().push((tab_id, url.to_string()));
            Ok(())
        }

        async fn go_back(&self, _tab_id: TabId) -> Result<bool, HostError> {
            Ok(false)
        }

        async fn close(&self, tab_id: TabId) -> Result<(), HostError> {
            self.tabs.lock().unwrap().remove(&tab_id);
            Ok(())
        }
    }

    struct ScriptedVerdicts {
        verdict: Option<AiVerdict>,
        calls: AtomicUsize,
    }

    impl ScriptedVerdicts {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VerdictClient for ScriptedVerdicts {
        async fn evaluate(&self, _title: &str, _intent: &str, _provider: &ProviderConfig) -> Result<AiVerdict, VerdictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
                .ok_or_else(|| VerdictError::Transport("connection refused".to_string()))
        }

        async fn validate(&self, _provider: &ProviderConfig) -> Result<(), VerdictError> {
            Ok(())
        }
    }

    struct Fixture {
        engine: DecisionEngine,
        store: Arc<MemoryStore>,
        host: Arc<FakeHost>,
        verdicts: Arc<ScriptedVerdicts>,
    }

    fn fixture(mode: Mode, intent: Option<&str>, verdict: Option<AiVerdict>) -> Fixture {
        let settings = Settings {
            mode,
            intent: intent.map(str::to_string),
            groups: vec![RuleGroup {
                name: "Games".to_string(),
                rules: vec![Rule {
                    label: "Chess".to_string(),
                    path_fragment: "example.com/games".to_string(),
                }],
            }],
            ..Settings::default()
        };
        let store = Arc::new(MemoryStore::with_settings(settings));
        let host = Arc::new(FakeHost::default());
        let verdicts = Arc::new(ScriptedVerdicts {
            verdict,
            calls: AtomicUsize::new(0),
        });
        let engine = DecisionEngine::new(
            EngineConfig::default(),
            Collaborators {
                settings: store.clone(),
                session: store.clone(),
                verdicts: verdicts.clone(),
                host: host.clone(),
                clock: Arc::new(ManualClock::new(NOW)),
            },
        );
        Fixture {
            engine,
            store,
            host,
            verdicts,
        }
    }

    fn trigger(tab_id: TabId, url: &str, title: Option<&str>, status: Option<LoadStatus>) -> NavigationTrigger {
        NavigationTrigger {
            tab_id,
            url: url.to_string(),
            title: title.map(str::to_string),
            status,
        }
    }

    #[tokio::test]
    async fn test_hardcore_rule_redirects() {
        let f = fixture(Mode::Hardcore, None, None);
        f.host.open(1, "https://example.com/games/chess", None);

        let decision = f
            .engine
            .evaluate(trigger(1, "https://example.com/games/chess", None, None))
            .await
            .unwrap();
        assert!(matches!(decision, Decision::Redirect { reason: BlockReason::Hardcore, .. }));

        let navigations = f.host.navigations();
        assert_eq!(navigations.len(), 1);
        assert!(navigations[0].1.contains("reason=hardcore"));
        assert!(navigations[0].1.ends_with("&tabId=1"));
    }

    #[tokio::test]
    async fn test_hardcore_never_calls_ai() {
        let f = fixture(Mode::Hardcore, Some("study"), Some(AiVerdict { allowed: false, score: Some(5) }));
        let decision = f
            .engine
            .evaluate(trigger(1, "https://news.example.org/", Some("News"), None))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow(AllowReason::NoRuleMatched));
        assert_eq!(f.verdicts.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_intent_allows_without_ai() {
        let f = fixture(Mode::Hybrid, Some("   "), Some(AiVerdict { allowed: false, score: Some(5) }));
        let decision = f
            .engine
            .evaluate(trigger(1, "https://news.example.org/", Some("News"), None))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow(AllowReason::NoIntent));
        assert_eq!(f.verdicts.calls(), 0);
        assert!(f.store.scores().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ai_deny_redirects_and_records() {
        let f = fixture(Mode::Ai, Some("learn rust"), Some(AiVerdict { allowed: false, score: Some(12) }));
        f.host.open(4, "https://video.example.net/watch", None);

        let decision = f
            .engine
            .evaluate(trigger(4, "https://video.example.net/watch", None, None))
            .await
            .unwrap();
        match decision {
            Decision::Redirect {
                reason: BlockReason::Ai { intent, title },
                target,
            } => {
                assert_eq!(intent, "learn rust");
                assert_eq!(title, UNKNOWN_TITLE);
                assert!(target.contains("reason=ai&intent=learn%20rust"));
            }
            other => panic!("unexpected decision {other:?}"),
        }
        assert_eq!(f.store.scores().await.unwrap().latest(), Some(12));
    }

    #[tokio::test]
    async fn test_ai_deny_for_departed_page_does_not_redirect() {
        let f = fixture(Mode::Ai, Some("learn rust"), Some(AiVerdict { allowed: false, score: Some(12) }));
        f.host.open(4, "https://docs.example.org/book", None);

        let decision = f
            .engine
            .evaluate(trigger(4, "https://video.example.net/watch", Some("Clip"), None))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow(AllowReason::Superseded));
        assert!(f.host.navigations().is_empty());

        let closed = f
            .engine
            .evaluate(trigger(5, "https://video.example.net/watch", Some("Clip"), None))
            .await
            .unwrap();
        assert_eq!(closed, Decision::Allow(AllowReason::Superseded));
    }

    #[tokio::test]
    async fn test_ai_mode_ignores_rules() {
        let f = fixture(Mode::Ai, Some("chess study"), Some(AiVerdict { allowed: true, score: Some(90) }));
        let decision = f
            .engine
            .evaluate(trigger(1, "https://example.com/games/chess", Some("Chess openings"), None))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow(AllowReason::AiApproved));
        assert_eq!(f.verdicts.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_allow() {
        let f = fixture(Mode::Hybrid, Some("learn rust"), None);
        let decision = f
            .engine
            .evaluate(trigger(1, "https://news.example.org/", Some("News"), None))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow(AllowReason::AiUnavailable));
        assert_eq!(f.verdicts.calls(), 1);
        assert!(f.store.scores().await.unwrap().is_empty());
        assert!(f.host.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_one_shot_consumed_on_complete() {
        let f = fixture(Mode::Hardcore, None, None);
        let url = "https://example.com/games/chess";
        f.store.set_one_shot(2, url).await.unwrap();

        let loading = f
            .engine
            .evaluate(trigger(2, url, None, Some(LoadStatus::Loading)))
            .await
            .unwrap();
        assert_eq!(loading, Decision::Allow(AllowReason::OneShotPass));
        assert_eq!(f.store.one_shot(2).await.unwrap().as_deref(), Some(url));

        let complete = f
            .engine
            .evaluate(trigger(2, url, None, Some(LoadStatus::Complete)))
            .await
            .unwrap();
        assert_eq!(complete, Decision::Allow(AllowReason::OneShotPass));
        assert_eq!(f.store.one_shot(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stale_one_shot_is_dropped() {
        let f = fixture(Mode::Hardcore, None, None);
        f.store.set_one_shot(2, "https://example.com/games/chess").await.unwrap();

        let decision = f
            .engine
            .evaluate(trigger(2, "https://docs.example.org/", None, None))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow(AllowReason::NoRuleMatched));
        assert_eq!(f.store.one_shot(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_fast_path_hardcore_only() {
        let f = fixture(Mode::Hardcore, None, None);
        f.host.open(1, "https://example.com/games/go", None);
        let decision = f
            .engine
            .on_navigation_committed(NavigationCommitted {
                tab_id: 1,
                url: "https://example.com/games/go".to_string(),
                frame_id: 0,
            })
            .await
            .unwrap();
        assert!(decision.is_some_and(|d| d.is_redirect()));

        let f = fixture(Mode::Hybrid, None, None);
        let decision = f
            .engine
            .on_navigation_committed(NavigationCommitted {
                tab_id: 1,
                url: "https://example.com/games/go".to_string(),
                frame_id: 0,
            })
            .await
            .unwrap();
        assert_eq!(decision, None);
    }

    #[tokio::test]
    async fn test_subframe_and_excluded_urls_ignored() {
        let f = fixture(Mode::Hardcore, None, None);
        let subframe = f
            .engine
            .on_navigation_committed(NavigationCommitted {
                tab_id: 1,
                url: "https://example.com/games/go".to_string(),
                frame_id: 3,
            })
            .await
            .unwrap();
        assert_eq!(subframe, None);

        assert!(!f.engine.should_evaluate("chrome://extensions"));
        assert!(!f.engine.should_evaluate(&format!("{DEFAULT_INTERCEPTION_VIEW}?url=x")));
        assert!(f.engine.should_evaluate("http://localhost:8080/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_tab_update_not_armed() {
        let f = fixture(Mode::Hardcore, None, None);
        let outcome = f.engine.on_tab_updated(TabUpdated {
            tab_id: 1,
            url: "https://example.com/games/go".to_string(),
            title: None,
            status: None,
            title_changed: false,
        });
        assert_eq!(outcome, None);
        assert!(!f.engine.is_pending(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_update_redirects_once() {
        let f = fixture(Mode::Hardcore, None, None);
        let url = "https://example.com/games/go";
        f.host.open(1, url, Some("Go"));

        for status in [Some(LoadStatus::Loading), None, Some(LoadStatus::Complete)] {
            f.engine.on_tab_updated(TabUpdated {
                tab_id: 1,
                url: url.to_string(),
                title: Some("Go".to_string()),
                status,
                title_changed: status.is_none(),
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(f.engine.is_pending(1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.host.navigations().len(), 1);
        assert!(!f.engine.is_pending(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_tab_evaluates_nothing() {
        let f = fixture(Mode::Hardcore, None, None);
        let url = "https://example.com/games/go";
        f.host.open(1, url, None);
        f.store.set_one_shot(1, "https://elsewhere.example.org/").await.unwrap();

        f.engine.on_history_state_updated(HistoryStateUpdated {
            tab_id: 1,
            url: url.to_string(),
            frame_id: 0,
        });
        f.host.close(1).await.unwrap();
        f.engine.on_tab_removed(1).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(f.host.navigations().is_empty());
        assert_eq!(f.store.one_shot(1).await.unwrap(), None);
    }
}
