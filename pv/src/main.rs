//! Pivot - mood/budget/location plan composer
//!
//! CLI entry point for composing, editing and sharing event plans.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use pivot::account::AccountSession;
use pivot::cli::{CheckAction, Cli, Command};
use pivot::comments::CommentThread;
use pivot::config::{Config, SearchProvider};
use pivot::controller::{IgnoreReason, ReplaceOutcome, SearchOutcome};
use pivot::domain::{Candidate, EventIdentity, StartPoint, VIBES, find_preset};
use pivot::search::{LocationLookup, builtin_places, create_geocoder, create_search};
use pivot::session::{Reference, SessionDeps, SessionManager, SessionSettings};
use pivot::{geo, scoring};
use pivotstore::{DisabledStore, FileCache, KvRestStore, LocalCache, RecordStore};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pivot")
        .join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("pivot.log")).context("Failed to create log file")?;
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Everything a command needs, built once from config
struct App {
    config: Config,
    deps: SessionDeps,
    catalog: Option<Vec<Candidate>>,
}

impl App {
    fn from_config(config: Config) -> Result<Self> {
        let search_config = config.search.resolve()?;
        let storage = config.storage.resolve()?;

        let cache: Arc<dyn LocalCache> = Arc::new(
            FileCache::open(&storage.cache_dir)
                .with_context(|| format!("Failed to open cache at {}", storage.cache_dir.display()))?,
        );
        let store: Arc<dyn RecordStore> = match (&storage.kv_url, &storage.kv_token) {
            (Some(url), Some(token)) => Arc::new(KvRestStore::new(url, token.clone(), storage.timeout)?),
            _ => {
                debug!("App::from_config: no durable store configured");
                Arc::new(DisabledStore)
            }
        };
        let search = create_search(&search_config)?;
        let catalog = (search_config.provider == SearchProvider::Catalog).then(builtin_places);
        let settings = SessionSettings::from_config(&config, &search_config);

        Ok(Self {
            deps: SessionDeps {
                search,
                store,
                cache,
                settings,
            },
            config,
            catalog,
        })
    }

    async fn open(&self, event: &str) -> Result<SessionManager> {
        let reference = Reference::parse(event);
        if reference.identity().is_none() && reference.snapshot.is_none() {
            return Err(eyre!("Not an event path or share link: {}", event));
        }
        let mut session = SessionManager::open(&reference, self.deps.clone()).await;
        if let Some(places) = &self.catalog {
            session.remember(places.iter().cloned());
        }
        info!(source = %session.source(), "opened {}", reference.path);
        Ok(session)
    }

    fn identity(&self, event: &str) -> Result<EventIdentity> {
        Reference::parse(event)
            .identity()
            .ok_or_else(|| eyre!("Not an event path: {}", event))
    }

    fn accounts(&self) -> AccountSession {
        AccountSession::new(self.deps.cache.clone())
    }

    fn lookup(&self) -> LocationLookup {
        LocationLookup::new(create_geocoder(&self.config.geocode.resolve()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let app = App::from_config(config)?;
    debug!(command = ?cli.command, "main: dispatching command");

    match cli.command {
        Command::New { owner, name } => cmd_new(&app, &owner, &name).await,
        Command::Show { event } => {
            let session = app.open(&event).await?;
            print_session(&session);
            Ok(())
        }
        Command::Build { event } => cmd_search(&app, &event, false).await,
        Command::Pivot { event } => cmd_search(&app, &event, true).await,
        Command::Keep { event, id } => {
            let mut session = app.open(&event).await?;
            let kept = session.toggle_keep(&id)?;
            let label = if kept { "Kept".green() } else { "Unkept".yellow() };
            println!("{} {}", label, venue_name(&session, &id));
            session.flush().await;
            Ok(())
        }
        Command::Replace { event, alternate, slot } => cmd_replace(&app, &event, &alternate, slot).await,
        Command::Prefs {
            event,
            vibes,
            price,
            start,
        } => cmd_prefs(&app, &event, vibes, price, start).await,
        Command::Share { event, live } => {
            let session = app.open(&event).await?;
            println!("{}", session.share_link(live)?);
            Ok(())
        }
        Command::Check { event, action } => cmd_check(&app, &event, action).await,
        Command::Note { event, text } => {
            let mut session = app.open(&event).await?;
            session.set_notes(&text)?;
            session.flush().await;
            println!("{} Notes saved", "✓".green());
            Ok(())
        }
        Command::Link { event, name, url } => {
            let mut session = app.open(&event).await?;
            session.set_link(&name, url.as_deref())?;
            session.flush().await;
            println!("{} Link {} {}", "✓".green(), name, if url.is_some() { "set" } else { "cleared" });
            Ok(())
        }
        Command::Comment { event, text, name } => {
            let thread = CommentThread::new(app.deps.store.clone(), &app.identity(&event)?);
            let account = app.accounts().restore();
            let comment = thread.post(&name, &text, account.as_ref()).await?;
            println!("{} {}: {}", "✓".green(), comment.name.cyan(), comment.text);
            Ok(())
        }
        Command::Comments { event } => {
            let thread = CommentThread::new(app.deps.store.clone(), &app.identity(&event)?);
            for comment in thread.list().await? {
                let when = chrono::DateTime::from_timestamp_millis(comment.ts)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{} {}: {}", when.dimmed(), comment.name.cyan(), comment.text);
            }
            Ok(())
        }
        Command::Geocode { query } => {
            let lookup = app.lookup().geocode(&query).await;
            if let Some(notice) = lookup.notice {
                println!("{} {}", "!".yellow(), notice);
            }
            for place in lookup.items {
                println!("{} {}", place.label, place.location.maps_url().dimmed());
            }
            Ok(())
        }
        Command::SignIn { token } => {
            let accounts = app.accounts();
            let account = match token {
                Some(token) => Some(accounts.sign_in(&token)?),
                None => accounts.restore(),
            };
            match account {
                Some(account) => println!("Signed in as {}", account.name.cyan()),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::SignOut => {
            app.accounts().sign_out();
            println!("Signed out");
            Ok(())
        }
    }
}

async fn cmd_new(app: &App, owner: &str, name: &str) -> Result<()> {
    debug!(%owner, %name, "cmd_new: called");
    let mut session = SessionManager::new_event(owner, name, app.deps.clone());
    if let Some(places) = &app.catalog {
        session.remember(places.iter().cloned());
    }
    let outcome = session.build().await;
    report_search(&outcome);
    session.flush().await;
    if let Some(event) = &session.state().event {
        println!("{} Created {}", "✓".green(), event.path().cyan());
    }
    print_session(&session);
    Ok(())
}

async fn cmd_search(app: &App, event: &str, pivot: bool) -> Result<()> {
    debug!(%event, pivot, "cmd_search: called");
    let mut session = app.open(event).await?;
    let outcome = if pivot { session.pivot().await } else { session.build().await };
    report_search(&outcome);
    session.flush().await;
    print_session(&session);
    Ok(())
}

async fn cmd_replace(app: &App, event: &str, alternate: &str, slot: Option<usize>) -> Result<()> {
    debug!(%event, %alternate, ?slot, "cmd_replace: called");
    let mut session = app.open(event).await?;
    let target = match slot {
        Some(0) => return Err(eyre!("Slots are numbered from 1")),
        Some(n) => Some(n - 1),
        None => None,
    };
    match session.replace(alternate, target) {
        ReplaceOutcome::Applied { slot, displaced } => {
            println!(
                "{} Slot {}: {} replaces {}",
                "✓".green(),
                slot + 1,
                venue_name(&session, alternate),
                venue_name(&session, &displaced)
            );
            session.flush().await;
            print_session(&session);
        }
        ReplaceOutcome::AwaitingSlot { open_slots, .. } => {
            let slots: Vec<String> = open_slots.iter().map(|s| (s + 1).to_string()).collect();
            println!("Several slots are open; pass --slot {}", slots.join("|"));
        }
        ReplaceOutcome::Rejected(notice) => println!("{} {}", "!".yellow(), notice),
        ReplaceOutcome::Ignored(reason) => {
            let why = match reason {
                IgnoreReason::AlreadyInPlan => "already in the plan",
                IgnoreReason::SlotLocked => "that slot is kept",
                IgnoreReason::InvalidSlot => "no such slot",
                IgnoreReason::UnknownCandidate => "not an alternate",
                IgnoreReason::NothingPending => "nothing to replace",
            };
            println!("{} Nothing changed: {}", "!".yellow(), why);
        }
    }
    Ok(())
}

async fn cmd_prefs(
    app: &App,
    event: &str,
    vibes: Option<Vec<String>>,
    price: Option<i64>,
    start: Option<String>,
) -> Result<()> {
    debug!(%event, ?vibes, ?price, ?start, "cmd_prefs: called");
    if let Some(unknown) = vibes.iter().flatten().find(|v| !VIBES.contains(&v.as_str())) {
        return Err(eyre!("Unknown vibe '{}'; choose from {}", unknown, VIBES.join(", ")));
    }
    let mut session = app.open(event).await?;
    if let Some(vibes) = vibes {
        session.set_vibes(&vibes)?;
    }
    if let Some(price) = price {
        session.set_price_cap(price)?;
    }
    if let Some(start) = start {
        let point = resolve_start(app, &start).await?;
        println!("Start: {}", point.label.cyan());
        session.set_start(Some(point))?;
    }
    session.flush().await;
    let profile = &session.state().profile;
    println!(
        "{} Vibes: {}  Price: {}",
        "✓".green(),
        profile.vibes.join(", "),
        "$".repeat(profile.price_cap as usize)
    );
    Ok(())
}

async fn resolve_start(app: &App, text: &str) -> Result<StartPoint> {
    if let Some(preset) = find_preset(text) {
        return Ok(preset);
    }
    let lookup = app.lookup().geocode(text).await;
    if let Some(notice) = &lookup.notice {
        println!("{} {}", "!".yellow(), notice);
    }
    lookup
        .items
        .first()
        .map(|place| place.to_start())
        .ok_or_else(|| eyre!("No location found for '{}'", text))
}

async fn cmd_check(app: &App, event: &str, action: CheckAction) -> Result<()> {
    let mut session = app.open(event).await?;
    match action {
        CheckAction::Add { text } => match session.add_item(&text)? {
            Some(id) => println!("{} Added {}", "✓".green(), id.dimmed()),
            None => println!("{} Item text is empty", "!".yellow()),
        },
        CheckAction::Toggle { id } => match session.toggle_item(&id)? {
            Some(done) => println!("{} {}", "✓".green(), if done { "Done" } else { "Not done" }),
            None => println!("{} No item {}", "!".yellow(), id),
        },
        CheckAction::Remove { id } => {
            if session.remove_item(&id)? {
                println!("{} Removed", "✓".green());
            } else {
                println!("{} No item {}", "!".yellow(), id);
            }
        }
    }
    session.flush().await;
    Ok(())
}

fn report_search(outcome: &SearchOutcome) {
    if let Some(notice) = outcome.notice() {
        println!("{} {}", "!".yellow(), notice);
    }
}

fn venue_name(session: &SessionManager, id: &str) -> String {
    session
        .candidate(id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn print_session(session: &SessionManager) {
    let state = session.state();
    let now = session.now();

    if let Some(event) = &state.event {
        println!("{} {}", event.display_name.bold(), event.path().dimmed());
    }
    let start = state.profile.start.as_ref();
    println!(
        "Vibes: {}  Price: {}  Start: {}",
        state.profile.vibes.join(", "),
        "$".repeat(state.profile.price_cap as usize),
        start.map(|s| s.label.as_str()).unwrap_or("-")
    );

    println!("\n{}", "Plan".bold());
    if state.plan.is_empty() {
        println!("  (empty; run `pv build`)");
    }
    for (i, id) in state.plan.iter().enumerate() {
        let pin = if state.is_locked(id) { "★".yellow() } else { " ".normal() };
        match session.candidate(id) {
            Some(c) => {
                let score = scoring::score(c, &state.profile, now);
                let walk = geo::minutes_walk(score.distance_miles)
                    .map(|m| format!("{}m walk", m))
                    .unwrap_or_default();
                println!(
                    "  {} {}. {} {} {} {}",
                    pin,
                    i + 1,
                    c.name.cyan(),
                    c.price_symbol().dimmed(),
                    scoring::display_status(c, now),
                    walk.dimmed()
                );
                let reasons = scoring::pick_reasons(c, &score);
                if !reasons.is_empty() {
                    println!("       {}", reasons.join(" · ").yellow());
                }
            }
            None => println!("  {} {}. {}", pin, i + 1, id),
        }
    }

    if !state.alternates.is_empty() {
        println!("\n{}", "Alternates".bold());
        for id in &state.alternates {
            println!("  {} {}", id.dimmed(), venue_name(session, id));
        }
    }

    if !state.checklist.is_empty() {
        println!("\n{}", "Checklist".bold());
        for item in &state.checklist {
            let mark = if item.done { "[x]".green() } else { "[ ]".normal() };
            println!("  {} {} {}", mark, item.text, item.id.dimmed());
        }
    }
    for (name, url) in &state.links {
        println!("{}: {}", name, url);
    }
    if !state.notes.is_empty() {
        println!("\n{}\n{}", "Notes".bold(), state.notes);
    }
}
