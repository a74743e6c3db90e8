//! Agent Memory CLI - inspect and edit an agent's persistent memory

mod commands;

use agent_memory::config::{self, MemoryConfig};
use agent_memory::{MemoryStore, StorePath};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "agent-memory")]
#[command(version)]
#[command(about = "Persistent memory for AI agents - facts, lessons and entities")]
#[command(long_about = r#"
Agent Memory keeps what an agent learns across sessions:
  • Facts, deduplicated and searchable, with supersession history
  • Lessons from past actions and their outcomes
  • Entities with free-form attributes

Example usage:
  agent-memory remember "The staging DB is on port 5433" --tag infra
  agent-memory recall staging
  agent-memory learn --action "deploy" --outcome failure --insight "run migrations first"
  agent-memory stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (":memory:" for a throwaway store)
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how many facts, lessons and entities are stored
    Stats {
        /// Also verify the search index against the facts table
        #[arg(long)]
        check: bool,

        /// Rebuild the search index
        #[arg(long)]
        repair: bool,
    },

    /// Remember a fact
    Remember {
        /// Fact text
        #[arg(required = true)]
        text: Vec<String>,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Confidence between 0 and 1
        #[arg(long, default_value = "1.0")]
        confidence: f64,

        /// Link the fact to an entity
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Search live facts
    Recall {
        /// Search text
        #[arg(required = true)]
        text: Vec<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Replace a fact with new content, keeping the old one as history
    Supersede {
        /// Id of the fact being replaced
        id: i64,

        /// Replacement text
        #[arg(required = true)]
        text: Vec<String>,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Confidence between 0 and 1
        #[arg(long, default_value = "1.0")]
        confidence: f64,

        /// Link the fact to an entity
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Show a fact and everything that replaced it
    History {
        /// Fact id
        id: i64,
    },

    /// Record a lesson
    Learn {
        /// What was done
        #[arg(long)]
        action: String,

        /// Situation it was done in
        #[arg(long)]
        context: Option<String>,

        /// success, failure, or free text
        #[arg(long)]
        outcome: String,

        /// What was learned
        #[arg(long)]
        insight: String,
    },

    /// List lessons, newest first
    Lessons {
        /// Only lessons whose context contains this text
        #[arg(long)]
        context: Option<String>,

        /// Only lessons with this outcome
        #[arg(long)]
        outcome: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Track and inspect entities
    Entity {
        #[command(subcommand)]
        command: EntityCommand,
    },

    /// Remove stale, rarely used facts
    Cleanup {
        /// Remove facts not accessed for this many days
        #[arg(long)]
        max_age_days: Option<i64>,

        /// Only remove facts accessed at most this many times
        #[arg(long)]
        min_access_count: Option<u32>,

        /// Leave superseded facts alone
        #[arg(long)]
        live_only: bool,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum EntityCommand {
    /// Create an entity or replace its attributes
    Track {
        id: String,

        /// Attribute as key=value; values are parsed as JSON when possible
        #[arg(short, long = "set", value_parser = parse_attribute)]
        attributes: Vec<(String, Value)>,
    },

    /// Merge attributes into an entity
    Update {
        id: String,

        /// Attribute as key=value; values are parsed as JSON when possible
        #[arg(short, long = "set", value_parser = parse_attribute)]
        attributes: Vec<(String, Value)>,
    },

    /// Show an entity
    Get {
        id: String,

        /// Include linked facts
        #[arg(short, long)]
        facts: bool,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err("attribute key must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

pub fn emit_success(output_mode: OutputMode, command: &str, data: Value) -> anyhow::Result<()> {
    debug_assert!(!output_mode.is_human());
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn emit_failure(output_mode: OutputMode, err: &anyhow::Error) {
    if output_mode.is_human() {
        agent_memory::ui::error(&format!("{:#}", err));
    } else {
        let envelope = serde_json::json!({ "ok": false, "error": format!("{:#}", err) });
        println!("{}", envelope);
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(err) = run(cli, output_mode) {
        emit_failure(output_mode, &err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Version => return commands::run_version(output_mode),
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            return commands::run_init(&path, force, output_mode);
        }
        _ => {}
    }

    let store_path = match &cli.database {
        Some(db) => StorePath::from(db.as_str()),
        None => config.store_path()?,
    };
    tracing::debug!("Opening memory store at {}", store_path);
    let mut store = MemoryStore::open(store_path)?;

    dispatch(&mut store, cli.command, &config, output_mode)?;

    store.close()?;
    Ok(())
}

fn dispatch(
    store: &mut MemoryStore,
    command: Commands,
    config: &MemoryConfig,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Stats { check, repair } => commands::run_stats(store, check, repair, output_mode),

        Commands::Remember { text, tags, confidence, entity } => {
            let options = commands::remember_options(tags, confidence, entity);
            commands::run_remember(store, &text.join(" "), options, output_mode)
        }

        Commands::Recall { text, limit } => {
            let limit = limit.or(config.recall_limit).unwrap_or(10);
            commands::run_recall(store, &text.join(" "), limit, output_mode)
        }

        Commands::Supersede { id, text, tags, confidence, entity } => {
            let options = commands::remember_options(tags, confidence, entity);
            commands::run_supersede(store, id, &text.join(" "), options, output_mode)
        }

        Commands::History { id } => commands::run_history(store, id, output_mode),

        Commands::Learn { action, context, outcome, insight } => {
            commands::run_learn(store, &action, context.as_deref(), &outcome, &insight, output_mode)
        }

        Commands::Lessons { context, outcome, limit } => {
            commands::run_lessons(store, context, outcome.as_deref(), limit, output_mode)
        }

        Commands::Entity { command } => commands::run_entity(store, command, output_mode),

        Commands::Cleanup { max_age_days, min_access_count, live_only } => {
            let mut policy = config.retention_policy()?;
            if let Some(days) = max_age_days {
                policy.max_age = config::retention_age(days)?;
            }
            if let Some(count) = min_access_count {
                policy.min_access_count = count;
            }
            if live_only {
                policy.include_superseded = false;
            }
            commands::run_cleanup(store, &policy, output_mode)
        }

        Commands::Version | Commands::Init { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_attribute() {
        assert_eq!(parse_attribute("x=1").unwrap(), ("x".to_string(), Value::from(1)));
        assert_eq!(
            parse_attribute("role=admin").unwrap(),
            ("role".to_string(), Value::String("admin".into()))
        );
        assert_eq!(
            parse_attribute("url=http://a=b").unwrap(),
            ("url".to_string(), Value::String("http://a=b".into()))
        );
        assert!(parse_attribute("novalue").is_err());
        assert!(parse_attribute("=1").is_err());
    }

    #[test]
    fn test_remember_joins_words() {
        let cli = Cli::try_parse_from(["agent-memory", "remember", "Paris", "is", "nice", "-t", "geo"]).unwrap();
        match cli.command {
            Commands::Remember { text, tags, .. } => {
                assert_eq!(text.join(" "), "Paris is nice");
                assert_eq!(tags, vec!["geo".to_string()]);
            }
            _ => panic!("expected remember"),
        }
    }
}
