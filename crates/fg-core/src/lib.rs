//! FocusGate Core Library
//!
//! This crate provides the navigation decision engine for the FocusGate
//! browser extension. Every top-level navigation a tab makes is funneled
//! through the engine, which decides whether to let it through or to send
//! the tab to the interception view.
//!
//! # Architecture
//!
//! Browser signals (tab updates, commits, single-page-app history updates)
//! are coalesced per tab by the debouncer. The surviving trigger is evaluated
//! against the current settings: one-shot passes first, then the mode's
//! pipeline of whitelist/pass lookups, path rules and the AI verdict.
//! Side effects (redirects, score recording, pass consumption) happen at most
//! once per logical navigation.
//!
//! # Modules
//!
//! - `types`: Settings, rules, modes and the other shared data types
//! - `url`: Allocation-light URL helpers and query encoding
//! - `rules`: Path-fragment rule matcher and rule book editing
//! - `passes`: Permanent whitelist and temporary/one-shot pass logic
//! - `history`: Bounded focus score history
//! - `clock`: Wall clock abstraction
//! - `debounce`: Per-tab debouncer and re-arm cooldown
//! - `interception`: Interception view URL building and parsing
//! - `store`: Settings/session storage contracts and the in-memory store
//! - `host`: Browser tab host contract
//! - `verdict`: AI verdict contract and payload parsing
//! - `engine`: The decision engine
//! - `message`: Inbound message protocol from extension views

pub mod clock;
pub mod debounce;
pub mod engine;
pub mod history;
pub mod host;
pub mod interception;
pub mod message;
pub mod passes;
pub mod rules;
pub mod store;
pub mod types;
pub mod url;
pub mod verdict;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{ArmOutcome, Cooldown, Debouncer};
pub use engine::{
    AllowReason, Collaborators, Decision, DecisionEngine, EngineConfig, EngineError,
    HistoryStateUpdated, NavigationCommitted, NavigationTrigger, TabUpdated,
};
pub use history::ScoreHistory;
pub use host::{HostError, TabHost, TabSnapshot};
pub use message::{Message, Reply};
pub use rules::{is_blocked, is_blocked_in, normalize_rule_path, RuleError};
pub use store::{MemoryStore, SessionStore, SettingsStore, StoreError};
pub use types::{
    ApiStatus, BlockReason, LoadStatus, Mode, PassDuration, ProviderConfig, ProviderKind, Rule,
    RuleGroup, Settings, SettingsPatch, TabId,
};
pub use verdict::{AiVerdict, VerdictClient, VerdictError};
