use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes_feed::config::Config;
use bytes_feed::content::{ContentSource, EditorChat, GeminiSource};
use bytes_feed::feed::{
    BatchFetcher, FeedController, FeedItem, FeedOptions, LoadMoreOutcome, TopicPlanner,
};
use bytes_feed::preferences::{
    ContentConstraints, PreferenceStore, ReadingDensity, Tone, UserPreferences,
};
use bytes_feed::storage::{Database, DatabaseError};
use bytes_feed::util::{display_width, strip_control_chars, truncate_to_width};

/// Column budget for printed cards.
const CARD_WIDTH: usize = 96;

/// Get the config directory path (~/.config/bytes/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("bytes");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "bytes-feed", about = "Topic-driven news bytes in your terminal")]
struct Args {
    /// Config file (default: ~/.config/bytes/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Preferences database (default: ~/.config/bytes/bytes.db)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Complete onboarding: store topics and reading preferences
    Onboard {
        /// Topic to follow (repeatable). Prefix with "Custom:" for free text.
        #[arg(long = "topic", value_name = "TOPIC", required = true)]
        topics: Vec<String>,

        /// Name to greet you by
        #[arg(long)]
        name: Option<String>,

        /// ultra-quick, brief-summaries or deep-dives
        #[arg(long, default_value = "brief-summaries")]
        density: ReadingDensity,

        /// straight-facts, more-explanation or context-and-opinion
        #[arg(long, default_value = "straight-facts")]
        tone: Tone,

        /// Content filter to enable (repeatable): no-clickbait, fewer-celebrity,
        /// expert-sources, safe-mode. Omit to keep the defaults.
        #[arg(long = "constraint", value_name = "NAME")]
        constraints: Vec<String>,
    },

    /// Load the feed and print it
    Feed {
        /// Extra load-more rounds after the initial stream settles
        #[arg(long, default_value_t = 0, value_name = "N")]
        more: usize,

        /// Only print items whose title, summary or publisher contain TERM
        #[arg(long, value_name = "TERM")]
        search: Option<String>,

        /// Print items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Follow or unfollow a topic
    Topic {
        topic: String,
    },

    /// Ask the editor about the current feed
    Ask {
        question: String,
    },

    /// Forget stored preferences (onboarding runs again)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if (args.config.is_none() || args.db.is_none()) && !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        set_private_dir_permissions(&config_dir);
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "Config resolved");

    let db_path = args.db.clone().unwrap_or_else(|| config_dir.join("bytes.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of bytes-feed appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };
    let store = PreferenceStore::new(db);

    match args.command {
        Command::Onboard {
            topics,
            name,
            density,
            tone,
            constraints,
        } => onboard(&store, topics, name, density, tone, &constraints).await,
        Command::Feed {
            more,
            search,
            json,
        } => {
            let prefs = load_preferences(&store).await;
            let source = build_source(&config)?;
            let controller = build_controller(&config, source, &prefs);
            run_feed(&controller, more).await;

            let items = match search.as_deref() {
                Some(term) => controller.search(term),
                None => controller.feed(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_cards(&items, prefs.display_name.as_deref());
            }
            Ok(())
        }
        Command::Topic { topic } => {
            let prefs = store
                .toggle_topic(&topic)
                .await
                .context("Failed to update topics")?;
            let verb = if prefs.has_topic(&topic) {
                "Following"
            } else {
                "Unfollowed"
            };
            println!("{} {}", verb, topic.trim());
            println!("Topics: {}", describe_topics(&prefs));
            Ok(())
        }
        Command::Ask { question } => {
            let prefs = load_preferences(&store).await;
            let source = build_source(&config)?;
            let controller = build_controller(&config, source.clone(), &prefs);
            run_feed(&controller, 0).await;

            let mut chat = EditorChat::new(source);
            let reply = chat.ask(&controller.feed(), &question).await;
            println!("{}", strip_control_chars(&reply));
            Ok(())
        }
        Command::Reset => {
            if store.clear().await.context("Failed to clear preferences")? {
                println!("Preferences cleared. Run `bytes-feed onboard` to start again.");
            } else {
                println!("No stored preferences.");
            }
            Ok(())
        }
    }
}

#[cfg(unix)]
fn set_private_dir_permissions(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o700);
    if let Err(e) = std::fs::set_permissions(dir, perms) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Failed to set config directory permissions to 0700"
        );
    }
}

#[cfg(not(unix))]
fn set_private_dir_permissions(_dir: &Path) {}

async fn onboard(
    store: &PreferenceStore,
    topics: Vec<String>,
    name: Option<String>,
    density: ReadingDensity,
    tone: Tone,
    constraints: &[String],
) -> Result<()> {
    let mut prefs = UserPreferences::with_topics(&topics);
    prefs.display_name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    prefs.reading_density = density;
    prefs.tone = tone;

    if !constraints.is_empty() {
        let mut selected = ContentConstraints {
            no_clickbait: false,
            fewer_celebrity: false,
            expert_sources: false,
            safe_mode: false,
        };
        for name in constraints {
            if !selected.set(name, true) {
                anyhow::bail!(
                    "Unknown constraint '{}' (expected one of: {})",
                    name,
                    ContentConstraints::NAMES.join(", ")
                );
            }
        }
        prefs.content_constraints = selected;
    }

    store
        .save(&prefs)
        .await
        .context("Failed to save preferences")?;
    println!("Onboarding complete.");
    println!("Topics: {}", describe_topics(&prefs));
    println!("Style: {}, {}", prefs.reading_density, prefs.tone);
    Ok(())
}

/// Stored preferences, falling back to defaults on first run or if the
/// stored document cannot be read.
async fn load_preferences(store: &PreferenceStore) -> UserPreferences {
    match store.load().await {
        Ok(Some(prefs)) => prefs,
        Ok(None) => {
            tracing::info!("No stored preferences, using the default plan");
            UserPreferences::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load preferences, using defaults");
            UserPreferences::default()
        }
    }
}

fn build_source(config: &Config) -> Result<Arc<GeminiSource>> {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .context("Failed to build HTTP client")?;
    let source = GeminiSource::from_config(client, config).context("Invalid API settings")?;
    if !source.is_available() {
        eprintln!("No API key set (GEMINI_API_KEY); showing bundled stories.");
    }
    Ok(Arc::new(source))
}

fn build_controller(
    config: &Config,
    source: Arc<GeminiSource>,
    prefs: &UserPreferences,
) -> FeedController {
    let fetcher = BatchFetcher::new(source, config.items_per_batch)
        .with_guidance(prefs.prompt_guidance());
    let controller = FeedController::new(
        fetcher,
        TopicPlanner::from_config(config),
        FeedOptions::from_config(config),
    );
    controller.set_topics(prefs.topics.clone());
    controller
}

async fn run_feed(controller: &FeedController, more: usize) {
    controller.start(true).await;
    controller.wait_idle().await;

    for _ in 0..more {
        match controller.load_more().await {
            LoadMoreOutcome::Loaded { index, admitted } => {
                tracing::info!(batch = index, admitted = admitted, "Loaded more");
            }
            LoadMoreOutcome::Skipped => {}
        }
    }
}

fn describe_topics(prefs: &UserPreferences) -> String {
    if prefs.topics.is_empty() {
        "(none, using defaults)".to_string()
    } else {
        prefs.topics.join(", ")
    }
}

fn print_cards(items: &[FeedItem], name: Option<&str>) {
    if let Some(name) = name {
        println!("Good to see you, {}.\n", strip_control_chars(name));
    }
    if items.is_empty() {
        println!("Nothing here yet. Try again in a moment.");
        return;
    }

    let number_width = items.len().to_string().len();
    let indent = " ".repeat(number_width + 2);
    let body_width = CARD_WIDTH.saturating_sub(display_width(&indent));

    for (i, item) in items.iter().enumerate() {
        let title = strip_control_chars(&item.title);
        println!(
            "{:>width$}. {}",
            i + 1,
            truncate_to_width(&title, body_width),
            width = number_width
        );
        println!(
            "{}{} · {} · {} · {} · ♥ {}",
            indent,
            strip_control_chars(&item.publisher_name),
            strip_control_chars(&item.category),
            item.published_label,
            item.read_time,
            item.like_count
        );
        println!(
            "{}{}",
            indent,
            truncate_to_width(&strip_control_chars(&item.body), body_width)
        );
        if let Some(link) = &item.source_link {
            println!("{}{}", indent, link);
        }
        println!();
    }
}
