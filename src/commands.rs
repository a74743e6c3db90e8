use crate::{EntityCommand, OutputMode, emit_success};
use agent_memory::config::{self, MemoryConfig};
use agent_memory::ui::{self, Icons, header, section, stats_table, success};
use agent_memory::{
    Attributes, LessonQuery, MemoryStore, Outcome, RememberOptions, RetentionPolicy,
};
use owo_colors::OwoColorize;
use serde_json::{Value, json};
use std::path::Path;

pub fn remember_options(tags: Vec<String>, confidence: f64, entity: Option<String>) -> RememberOptions {
    RememberOptions {
        tags,
        confidence,
        entity,
    }
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        println!(
            "{} {}",
            "Agent Memory".bold().style(ui::theme().info.clone()),
            format!("Version {}", env!("CARGO_PKG_VERSION")).bold()
        );
    } else {
        let data = json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

pub fn run_init(path: &Path, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let defaults = RetentionPolicy::default();
    let config = MemoryConfig {
        database: Some(config::default_database_path()?.display().to_string()),
        recall_limit: Some(10),
        retention: config::RetentionConfig {
            max_age_days: Some(defaults.max_age.num_days()),
            min_access_count: Some(defaults.min_access_count),
            include_superseded: Some(defaults.include_superseded),
        },
    };
    config::write_config(path, &config, force)?;

    if output_mode.is_human() {
        success(&format!("Wrote {}", path.display()));
    } else {
        emit_success(output_mode, "init", json!({ "path": path.display().to_string() }))?;
    }
    Ok(())
}

pub fn run_stats(store: &mut MemoryStore, check: bool, repair: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    if repair {
        store.rebuild_index()?;
    }
    let stats = store.stats()?;
    let index = if check || repair { Some(store.check_index()?) } else { None };

    if !output_mode.is_human() {
        let mut data = serde_json::to_value(stats)?;
        if let Some(report) = index {
            data["index"] = serde_json::to_value(report)?;
        }
        return emit_success(output_mode, "stats", data);
    }

    header(&format!("Agent Memory Statistics ({})", store.path()));
    println!("{}", stats_table(&stats));

    if let Some(report) = index {
        section("Search index");
        ui::summary_row("facts:", &report.facts.to_string());
        ui::summary_row("indexed:", &report.indexed.to_string());
        if report.is_consistent() {
            success("Index is consistent");
        } else {
            ui::warn(&format!(
                "{} facts missing from the index, {} orphaned entries (run with --repair)",
                report.missing, report.orphaned
            ));
        }
    }
    Ok(())
}

pub fn run_remember(
    store: &mut MemoryStore,
    text: &str,
    options: RememberOptions,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let id = store.remember(text, options)?;

    if output_mode.is_human() {
        success(&format!("Remembered fact #{}", id));
    } else {
        emit_success(output_mode, "remember", json!({ "id": id }))?;
    }
    Ok(())
}

pub fn run_recall(store: &mut MemoryStore, query: &str, limit: usize, output_mode: OutputMode) -> anyhow::Result<()> {
    let results = store.recall(query, limit)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "recall", serde_json::to_value(&results)?);
    }

    ui::status(Icons::SEARCH, "Recall", &format!("'{}' (limit: {})", query, limit));
    if results.is_empty() {
        println!("{} No matching facts.", Icons::EMPTY);
    }
    for hit in &results {
        ui::fact_line(&hit.fact, Some(hit.rank));
    }
    Ok(())
}

pub fn run_supersede(
    store: &mut MemoryStore,
    old_id: i64,
    text: &str,
    options: RememberOptions,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let new_id = store.supersede(old_id, text, options)?;

    if output_mode.is_human() {
        success(&format!("Fact #{} superseded by #{}", old_id, new_id));
    } else {
        emit_success(output_mode, "supersede", json!({ "old_id": old_id, "new_id": new_id }))?;
    }
    Ok(())
}

pub fn run_history(store: &MemoryStore, id: i64, output_mode: OutputMode) -> anyhow::Result<()> {
    let chain = store.fact_history(id)?;
    if chain.is_empty() {
        anyhow::bail!("fact #{} not found", id);
    }

    if !output_mode.is_human() {
        return emit_success(output_mode, "history", serde_json::to_value(&chain)?);
    }

    header(&format!("History of fact #{}", id));
    for fact in &chain {
        ui::fact_line(fact, None);
    }
    Ok(())
}

pub fn run_learn(
    store: &mut MemoryStore,
    action: &str,
    context: Option<&str>,
    outcome: &str,
    insight: &str,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let outcome: Outcome = outcome.parse()?;
    let id = store.learn(action, context, outcome, insight)?;

    if output_mode.is_human() {
        success(&format!("Recorded lesson #{}", id));
    } else {
        emit_success(output_mode, "learn", json!({ "id": id }))?;
    }
    Ok(())
}

pub fn run_lessons(
    store: &MemoryStore,
    context: Option<String>,
    outcome: Option<&str>,
    limit: usize,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let query = LessonQuery {
        context,
        outcome: outcome.map(str::parse).transpose()?,
        limit,
    };
    let lessons = store.get_lessons(&query)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "lessons", serde_json::to_value(&lessons)?);
    }

    ui::status(Icons::BOOK, "Lessons", &lessons.len().to_string());
    if lessons.is_empty() {
        println!("{} No lessons recorded.", Icons::EMPTY);
    }
    for lesson in &lessons {
        ui::lesson_line(lesson);
    }
    Ok(())
}

pub fn run_entity(store: &mut MemoryStore, command: EntityCommand, output_mode: OutputMode) -> anyhow::Result<()> {
    match command {
        EntityCommand::Track { id, attributes } => {
            store.track_entity(&id, to_attributes(attributes))?;
            report_entity_write(store, &id, "track", output_mode)
        }
        EntityCommand::Update { id, attributes } => {
            store.update_entity(&id, to_attributes(attributes))?;
            report_entity_write(store, &id, "update", output_mode)
        }
        EntityCommand::Get { id, facts } => {
            let Some(entity) = store.get_entity(&id, facts)? else {
                if output_mode.is_human() {
                    println!("{} No entity named {:?}.", Icons::EMPTY, id);
                    return Ok(());
                }
                return emit_success(output_mode, "entity", Value::Null);
            };

            if output_mode.is_human() {
                ui::entity_block(&entity);
                Ok(())
            } else {
                emit_success(output_mode, "entity", serde_json::to_value(&entity)?)
            }
        }
    }
}

fn report_entity_write(store: &MemoryStore, id: &str, command: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        success(&format!("Entity {:?} saved", id));
        return Ok(());
    }
    let entity = store.get_entity(id, false)?;
    emit_success(output_mode, command, serde_json::to_value(&entity)?)
}

fn to_attributes(pairs: Vec<(String, Value)>) -> Attributes {
    pairs.into_iter().collect()
}

pub fn run_cleanup(store: &mut MemoryStore, policy: &RetentionPolicy, output_mode: OutputMode) -> anyhow::Result<()> {
    let removed = store.cleanup_with(policy)?;

    if output_mode.is_human() {
        ui::status(
            Icons::DEL,
            "Cleanup",
            &format!(
                "older than {} days, accessed at most {} times{}",
                policy.max_age.num_days(),
                policy.min_access_count,
                if policy.include_superseded { "" } else { " (live facts only)" }
            ),
        );
        success(&format!("Removed {} facts", removed));
    } else {
        emit_success(output_mode, "cleanup", json!({ "removed": removed }))?;
    }
    Ok(())
}
