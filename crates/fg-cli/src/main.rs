//! FocusGate CLI
//!
//! Inspect and edit FocusGate settings, and drive the decision engine from
//! the terminal against a settings file.

mod host;
mod replay;
mod store;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::runtime::Runtime;

use fg_ai::{AiClient, Endpoints};
use fg_core::passes::{check_pass, clear_temporary_passes, clear_whitelist, purge_expired, PassMatch};
use fg_core::rules::{add_rule, matching_rule, reclassify, rule_count, sorted_view};
use fg_core::{
    Clock, Collaborators, DecisionEngine, EngineConfig, LoadStatus, MemoryStore, Mode, NavigationTrigger,
    PassDuration, ProviderKind, SettingsPatch, SettingsStore, SystemClock, VerdictClient,
};

use crate::host::{ConsoleHost, OfflineVerdicts};
use crate::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "fg")]
#[command(about = "FocusGate settings and decision engine tools")]
struct Cli {
    /// Settings file (extension storage layout)
    #[arg(short, long, global = true, default_value = "focusgate.json")]
    settings: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debounce window for navigation events, in milliseconds
    #[arg(long, global = true, default_value_t = 750)]
    debounce_ms: u64,

    /// Minimum spacing between evaluations of one tab, in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    cooldown_ms: u64,

    /// Interception view base URL
    #[arg(long, global = true, default_value = fg_core::engine::DEFAULT_INTERCEPTION_VIEW)]
    interception_view: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report how a URL would be treated without running the AI
    Check {
        url: String,
    },

    /// Run one full evaluation for a URL
    Eval {
        url: String,

        /// Page title given to the AI
        #[arg(short, long)]
        title: Option<String>,

        #[arg(long, default_value_t = 1)]
        tab_id: i32,

        /// Never call an AI provider
        #[arg(long)]
        offline: bool,
    },

    /// Replay a JSON Lines event script through the engine
    Replay {
        script: String,

        /// Never call an AI provider
        #[arg(long)]
        offline: bool,
    },

    /// Grant a pass for a URL
    Grant {
        url: String,

        #[arg(short, long, value_enum, default_value_t = DurationArg::Hour)]
        duration: DurationArg,
    },

    /// Manage blocking rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Show the focus score
    Score,

    /// Clear stored passes
    Clear {
        #[arg(value_enum)]
        target: ClearTarget,
    },

    /// Show or set the blocking mode
    Mode {
        #[arg(value_enum)]
        mode: Option<ModeArg>,
    },

    /// Show or set the declared intent
    Intent {
        text: Option<String>,
    },

    /// Provider API tools
    Api {
        #[command(subcommand)]
        action: ApiAction,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// List rules by group
    List,
    /// Add a rule
    Add {
        /// Site path, e.g. example.com/games
        path: String,

        #[arg(short, long)]
        label: String,

        #[arg(short, long)]
        group: Option<String>,
    },
    /// Move an unclassified rule into a group
    Move {
        path: String,
        group: String,
    },
}

#[derive(Subcommand)]
enum ApiAction {
    /// Validate the stored (or given) provider and store the result
    Validate {
        #[arg(short, long, value_enum)]
        provider: Option<ProviderArg>,
    },
    /// List chat models offered by the OpenAI-compatible endpoint
    Models,
}

#[derive(Clone, Copy, ValueEnum)]
enum DurationArg {
    Once,
    Hour,
    Today,
    Permanent,
}

impl From<DurationArg> for PassDuration {
    fn from(arg: DurationArg) -> Self {
        match arg {
            DurationArg::Once => Self::Once,
            DurationArg::Hour => Self::Hour,
            DurationArg::Today => Self::Today,
            DurationArg::Permanent => Self::Permanent,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Hardcore,
    Hybrid,
    Ai,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Hardcore => Self::Hardcore,
            ModeArg::Hybrid => Self::Hybrid,
            ModeArg::Ai => Self::Ai,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Gemini,
    Openai,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Gemini => Self::Gemini,
            ProviderArg::Openai => Self::Openai,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ClearTarget {
    /// The permanent whitelist
    Whitelist,
    /// All temporary passes
    Passes,
    /// Only expired temporary passes
    Expired,
}

fn main() {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let store = Arc::new(JsonFileStore::new(&cli.settings));
    log::debug!("settings file: {}", store.path().display());
    let config = EngineConfig {
        debounce_window: Duration::from_millis(cli.debounce_ms),
        rearm_cooldown: Duration::from_millis(cli.cooldown_ms),
        interception_view: cli.interception_view,
    };

    let result = match cli.command {
        Commands::Check { url } => cmd_check(&store, &url),
        Commands::Eval {
            url,
            title,
            tab_id,
            offline,
        } => cmd_eval(&config, store, &url, title, tab_id, offline),
        Commands::Replay { script, offline } => cmd_replay(&config, store, &script, offline),
        Commands::Grant { url, duration } => cmd_grant(&config, store, &url, duration.into()),
        Commands::Rules { action } => cmd_rules(&store, action),
        Commands::Score => cmd_score(&store),
        Commands::Clear { target } => cmd_clear(&store, target),
        Commands::Mode { mode } => cmd_mode(&store, mode.map(Mode::from)),
        Commands::Intent { text } => cmd_intent(&store, text),
        Commands::Api { action } => cmd_api(&config, store, action),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn runtime() -> Result<Runtime, String> {
    Runtime::new().map_err(|e| format!("Failed to start runtime: {}", e))
}

fn verdict_client(offline: bool) -> Result<Arc<dyn VerdictClient>, String> {
    if offline {
        return Ok(Arc::new(OfflineVerdicts));
    }
    let client = AiClient::new(Endpoints::default()).map_err(|e| e.to_string())?;
    Ok(Arc::new(client))
}

fn engine(
    config: &EngineConfig,
    store: Arc<JsonFileStore>,
    host: Arc<ConsoleHost>,
    offline: bool,
) -> Result<DecisionEngine, String> {
    Ok(DecisionEngine::new(
        config.clone(),
        Collaborators {
            settings: store,
            session: Arc::new(MemoryStore::new()),
            verdicts: verdict_client(offline)?,
            host,
            clock: Arc::new(SystemClock),
        },
    ))
}

fn format_millis(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

fn cmd_check(store: &JsonFileStore, url: &str) -> Result<(), String> {
    let settings = runtime()?
        .block_on(store.load())
        .map_err(|e| e.to_string())?;
    let now = SystemClock.now_millis();

    println!("URL:      {}", url);
    println!("Mode:     {}", settings.mode);
    println!("Domain:   {}", fg_core::url::domain_of(url).unwrap_or_else(|| "-".to_string()));

    if !fg_core::url::is_web_url(url) {
        println!("Result:   not evaluated (not an http(s) page)");
        return Ok(());
    }

    let pass = check_pass(&settings, url, now);
    match pass {
        Some(PassMatch::Whitelisted) => println!("Pass:     permanent whitelist"),
        Some(PassMatch::TemporaryPass { expires_at }) => {
            println!("Pass:     temporary, until {}", format_millis(expires_at))
        }
        None => println!("Pass:     none"),
    }

    let rule = matching_rule(url, &settings.groups);
    match rule {
        Some(rule) => println!("Rule:     {} ({})", rule.label, rule.path_fragment),
        None => println!("Rule:     none"),
    }

    let outcome = match settings.mode {
        Mode::Hardcore if rule.is_some() => "blocked by rule",
        Mode::Hardcore => "allowed",
        _ if pass.is_some() => "allowed by pass",
        Mode::Hybrid if rule.is_some() => "blocked by rule",
        _ if settings.intent().is_none() => "allowed (no intent set)",
        _ => "decided by AI",
    };
    println!("Result:   {}", outcome);
    Ok(())
}

fn cmd_eval(
    config: &EngineConfig,
    store: Arc<JsonFileStore>,
    url: &str,
    title: Option<String>,
    tab_id: i32,
    offline: bool,
) -> Result<(), String> {
    let host = Arc::new(ConsoleHost::new());
    host.observe(tab_id, url, title.as_deref(), Some(LoadStatus::Complete));

    runtime()?.block_on(async {
        let engine = engine(config, store, host, offline)?;
        if !engine.should_evaluate(url) {
            return Err(format!("'{}' is not evaluated (not an http(s) page)", url));
        }
        let decision = engine
            .evaluate(NavigationTrigger {
                tab_id,
                url: url.to_string(),
                title,
                status: Some(LoadStatus::Complete),
            })
            .await
            .map_err(|e| e.to_string())?;
        println!("{:?}", decision);
        Ok(())
    })
}

fn cmd_replay(config: &EngineConfig, store: Arc<JsonFileStore>, script: &str, offline: bool) -> Result<(), String> {
    let text = std::fs::read_to_string(script).map_err(|e| format!("Failed to read '{}': {}", script, e))?;
    let events = replay::parse_script(&text).map_err(|e| format!("{}: {}", script, e))?;
    let host = Arc::new(ConsoleHost::new());

    let stats = runtime()?.block_on(async {
        let engine = engine(config, store, host.clone(), offline)?;
        replay::run(&engine, &host, events).await
    })?;

    println!(
        "Replayed {} events ({} armed, {} fast-path decisions, {} messages)",
        stats.events, stats.armed, stats.fast_path, stats.messages
    );
    Ok(())
}

fn cmd_grant(config: &EngineConfig, store: Arc<JsonFileStore>, url: &str, duration: PassDuration) -> Result<(), String> {
    if duration == PassDuration::Once {
        return Err("'once' passes only live for a browser session".to_string());
    }
    let host = Arc::new(ConsoleHost::new());
    host.observe(0, "about:blank", None, None);

    runtime()?.block_on(async {
        let engine = engine(config, store, host, true)?;
        engine.grant_pass(0, url, duration).await.map_err(|e| e.to_string())
    })?;
    println!("Granted {:?} pass for {}", duration, url);
    Ok(())
}

fn cmd_rules(store: &JsonFileStore, action: RulesAction) -> Result<(), String> {
    runtime()?.block_on(async {
        let mut groups = store.load().await.map_err(|e| e.to_string())?.groups;

        match action {
            RulesAction::List => {
                for group in sorted_view(&groups) {
                    println!("{} ({})", group.name, group.rules.len());
                    for rule in &group.rules {
                        println!("  {:<24} {}", rule.label, rule.path_fragment);
                    }
                }
                println!("{} rules", rule_count(&groups));
                return Ok(());
            }
            RulesAction::Add { path, label, group } => {
                let stored = add_rule(&mut groups, group.as_deref(), &label, &path).map_err(|e| e.to_string())?;
                println!("Added {}", stored);
            }
            RulesAction::Move { path, group } => {
                reclassify(&mut groups, &path, &group).map_err(|e| e.to_string())?;
                println!("Moved {} to {}", path, group);
            }
        }

        store
            .update(SettingsPatch {
                groups: Some(groups),
                ..SettingsPatch::default()
            })
            .await
            .map_err(|e| e.to_string())
    })
}

fn cmd_score(store: &JsonFileStore) -> Result<(), String> {
    let history = runtime()?
        .block_on(store.scores())
        .map_err(|e| e.to_string())?;

    match history.focus_score() {
        Some(score) => {
            println!("Focus score: {}", score);
            println!("  Samples:  {}", history.len());
            if let Some(latest) = history.latest() {
                println!("  Latest:   {}", latest);
            }
        }
        None => println!("Focus score: - (no samples yet)"),
    }
    Ok(())
}

fn cmd_clear(store: &JsonFileStore, target: ClearTarget) -> Result<(), String> {
    runtime()?.block_on(async {
        let mut settings = store.load().await.map_err(|e| e.to_string())?;
        let patch = match target {
            ClearTarget::Whitelist => {
                println!("Removed {} whitelist entries", clear_whitelist(&mut settings));
                SettingsPatch {
                    permanent_whitelist: Some(settings.permanent_whitelist),
                    ..SettingsPatch::default()
                }
            }
            ClearTarget::Passes | ClearTarget::Expired => {
                let removed = match target {
                    ClearTarget::Expired => purge_expired(&mut settings, SystemClock.now_millis()),
                    _ => clear_temporary_passes(&mut settings),
                };
                println!("Removed {} temporary passes", removed);
                SettingsPatch {
                    temporary_passes: Some(settings.temporary_passes),
                    ..SettingsPatch::default()
                }
            }
        };
        store.update(patch).await.map_err(|e| e.to_string())
    })
}

fn cmd_mode(store: &JsonFileStore, mode: Option<Mode>) -> Result<(), String> {
    runtime()?.block_on(async {
        match mode {
            Some(mode) => {
                store
                    .update(SettingsPatch {
                        mode: Some(mode),
                        ..SettingsPatch::default()
                    })
                    .await
                    .map_err(|e| e.to_string())?;
                println!("Mode set to {}", mode);
            }
            None => println!("{}", store.load().await.map_err(|e| e.to_string())?.mode),
        }
        Ok(())
    })
}

fn cmd_intent(store: &JsonFileStore, text: Option<String>) -> Result<(), String> {
    runtime()?.block_on(async {
        match text {
            Some(text) => {
                let text = text.trim().to_string();
                store
                    .update(SettingsPatch {
                        intent: Some(text.clone()),
                        ..SettingsPatch::default()
                    })
                    .await
                    .map_err(|e| e.to_string())?;
                if text.is_empty() {
                    println!("Intent cleared");
                } else {
                    println!("Intent set to {:?}", text);
                }
            }
            None => {
                let settings = store.load().await.map_err(|e| e.to_string())?;
                println!("{}", settings.intent().unwrap_or("(none)"));
            }
        }
        Ok(())
    })
}

fn cmd_api(config: &EngineConfig, store: Arc<JsonFileStore>, action: ApiAction) -> Result<(), String> {
    runtime()?.block_on(async {
        match action {
            ApiAction::Validate { provider } => {
                let settings = store.load().await.map_err(|e| e.to_string())?;
                let provider_config = match provider {
                    Some(provider) => settings.provider.with_provider(provider.into()),
                    None => settings.provider,
                };
                let engine = engine(config, store, Arc::new(ConsoleHost::new()), false)?;
                let status = engine.validate_api(&provider_config).await;
                match status.message {
                    Some(message) if !status.success => {
                        println!("{}: failed ({})", provider_config.provider, message)
                    }
                    _ => println!("{}: ok", provider_config.provider),
                }
            }
            ApiAction::Models => {
                let settings = store.load().await.map_err(|e| e.to_string())?;
                let client = AiClient::new(Endpoints::default()).map_err(|e| e.to_string())?;
                let models = client.list_models(&settings.provider).await.map_err(|e| e.to_string())?;
                if models.is_empty() {
                    println!("No chat models found");
                }
                for model in models {
                    println!("{}", model);
                }
            }
        }
        Ok(())
    })
}
