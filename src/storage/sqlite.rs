//! SQLite storage implementation

use std::collections::HashSet;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use crate::config::{self, StorePath};
use crate::entity::{self, Attributes, Entity};
use crate::fact::{self, Fact, FactMatch, ListOptions, RememberOptions};
use crate::lesson::{Lesson, LessonQuery, Outcome};
use crate::{Error, Result};
use super::{schema, search};

/// Columns selected for every fact read, in `FactRow` order
pub(crate) const FACT_COLUMNS: &str =
    "id, content, tags, confidence, entity_id, created_at, accessed_at, access_count, superseded_by, hash";

/// SQLite-backed persistent memory for an agent.
///
/// Owns a single connection. Every mutating operation runs in its own
/// transaction, so a fact and its search index entry are always committed
/// together. The connection is released when the store is dropped or
/// explicitly [`close`](MemoryStore::close)d.
pub struct MemoryStore {
    pub(crate) conn: Connection,
    path: StorePath,
}

impl MemoryStore {
    /// Open a store (creates the database file and its directory if needed)
    pub fn open(path: impl Into<StorePath>) -> Result<Self> {
        let path = path.into();
        let conn = match &path {
            StorePath::InMemory => Connection::open_in_memory()?,
            StorePath::File(file) => {
                config::ensure_db_dir(file)?;
                let conn = Connection::open(file)?;
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                tracing::debug!("Opened {} (journal_mode={})", file.display(), mode);
                conn
            }
        };

        let store = Self { conn, path };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a non-persistent store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(StorePath::InMemory)
    }

    /// Open the store at `~/.agent-memory/memory.db`
    pub fn open_default() -> Result<Self> {
        Self::open(StorePath::default_location()?)
    }

    /// Where this store lives
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Close the connection, surfacing any error from SQLite.
    ///
    /// Dropping the store closes it as well, but swallows the error.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Storage(e))
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Fact Operations ==========

    /// Store a fact and return its id.
    ///
    /// Re-stating known content (ignoring case and surrounding whitespace)
    /// does not insert a new row: the existing fact's access bookkeeping is
    /// bumped and its id returned.
    pub fn remember(&mut self, content: &str, options: RememberOptions) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let id = remember_in(&tx, content, &options, now())?;
        tx.commit()?;
        Ok(id)
    }

    /// Full-text search over live facts, best match first.
    ///
    /// Every returned fact has its `accessed_at`/`access_count` bumped in the
    /// same transaction; the returned values already reflect the bump.
    pub fn recall(&mut self, query: &str, limit: usize) -> Result<Vec<FactMatch>> {
        let Some(match_query) = search::build_match_query(query) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let tx = self.conn.transaction()?;
        let hits = search::search_live(&tx, &match_query, limit)?;
        let accessed_at = now();

        let mut results = Vec::with_capacity(hits.len());
        for (row, rank) in hits {
            let fact_id = row.id;
            let mut fact = match row.into_fact() {
                Ok(fact) => fact,
                Err(e) => {
                    tracing::warn!(fact_id, error = %e, "Skipping undecodable fact");
                    continue;
                }
            };
            touch_fact(&tx, fact.id, accessed_at)?;
            fact.accessed_at = accessed_at;
            fact.access_count = fact.access_count.saturating_add(1);
            results.push(FactMatch::new(fact, rank));
        }
        tx.commit()?;

        tracing::debug!("Recalled {} facts for {:?}", results.len(), query);
        Ok(results)
    }

    /// Replace `old_id` with new content, keeping the old row for history.
    ///
    /// An unknown `old_id` is a no-op link and an already superseded fact is
    /// re-pointed at the new one. A fact may only be superseded by a newer
    /// one: if the content deduplicates onto a fact created no later than
    /// `old_id` (reverting to an earlier value, say), nothing is written and
    /// `Error::InvalidInput` is returned.
    pub fn supersede(&mut self, old_id: i64, new_content: &str, options: RememberOptions) -> Result<i64> {
        let tx = self.conn.transaction()?;

        let old: Option<(String, Option<i64>)> = tx
            .query_row(
                "SELECT created_at, superseded_by FROM facts WHERE id = ?1",
                [old_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let old_created_at = old
            .as_ref()
            .map(|(raw, _)| parse_timestamp(&format!("fact #{old_id}"), raw))
            .transpose()?;

        // A fresh replacement always sorts after the fact it replaces
        let mut at = now();
        if let Some(created_at) = old_created_at {
            if at <= created_at {
                at = created_at + chrono::Duration::microseconds(1);
            }
        }
        let new_id = remember_in(&tx, new_content, &options, at)?;

        if new_id == old_id {
            tracing::debug!(fact_id = old_id, "Replacement is the same fact, not linking");
            tx.commit()?;
            return Ok(new_id);
        }

        let previous = old.and_then(|(_, superseded_by)| superseded_by);
        match old_created_at {
            None => tracing::warn!(fact_id = old_id, "Superseding unknown fact"),
            Some(old_created_at) => {
                let raw: String =
                    tx.query_row("SELECT created_at FROM facts WHERE id = ?1", [new_id], |row| row.get(0))?;
                let new_created_at = parse_timestamp(&format!("fact #{new_id}"), &raw)?;
                if new_created_at <= old_created_at {
                    return Err(Error::InvalidInput(format!(
                        "fact #{new_id} is not newer than fact #{old_id} and cannot supersede it"
                    )));
                }
                if let Some(prev) = previous.filter(|prev| *prev != new_id) {
                    tracing::warn!(fact_id = old_id, previous = prev, new = new_id, "Re-linking superseded fact");
                }
            }
        }

        tx.execute(
            "UPDATE facts SET superseded_by = ?1 WHERE id = ?2",
            params![new_id, old_id],
        )?;
        tx.commit()?;
        Ok(new_id)
    }

    /// Get a fact by id, live or superseded
    pub fn get_fact(&self, id: i64) -> Result<Option<Fact>> {
        let sql = format!("SELECT {FACT_COLUMNS} FROM facts WHERE id = ?1");
        let row = self.conn.query_row(&sql, [id], FactRow::from_row).optional()?;
        row.map(FactRow::into_fact).transpose()
    }

    /// List facts newest first, without touching access bookkeeping
    pub fn list_facts(&self, options: ListOptions) -> Result<Vec<Fact>> {
        let sql = format!(
            "SELECT {FACT_COLUMNS} FROM facts
             WHERE (?1 OR superseded_by IS NULL)
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![options.include_superseded, options.limit as i64], FactRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(decode_facts(rows))
    }

    /// Follow the supersession chain forward from `id`.
    ///
    /// The fact itself comes first and the current (live) version last.
    /// Stops early at a missing link.
    pub fn fact_history(&self, id: i64) -> Result<Vec<Fact>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if !seen.insert(current) {
                tracing::warn!(fact_id = current, "Supersession cycle");
                break;
            }
            let Some(fact) = self.get_fact(current)? else {
                break;
            };
            next = fact.superseded_by;
            chain.push(fact);
        }

        Ok(chain)
    }

    /// Count live facts
    pub fn count_facts(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM facts WHERE superseded_by IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== Lesson Operations ==========

    /// Record a lesson. Lessons are never deduplicated.
    pub fn learn(&mut self, action: &str, context: Option<&str>, outcome: Outcome, insight: &str) -> Result<i64> {
        require_text("action", action)?;
        require_text("insight", insight)?;
        let outcome = outcome.normalize()?;

        self.conn.execute(
            r#"
            INSERT INTO lessons (action, context, outcome, insight, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![action, context, outcome.as_str(), insight, format_timestamp(now())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get lessons newest first, optionally filtered by context substring and outcome
    pub fn get_lessons(&self, query: &LessonQuery) -> Result<Vec<Lesson>> {
        let context_pattern = query
            .context
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!("%{}%", escape_like(c)));
        let outcome = query.outcome.clone().map(Outcome::normalize).transpose()?;
        let outcome = outcome.as_ref().map(Outcome::as_str);

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, action, context, outcome, insight, created_at, applied_count
            FROM lessons
            WHERE (?1 IS NULL OR context LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR outcome = ?2)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt
            .query_map(params![context_pattern, outcome, query.limit as i64], LessonRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lessons = rows
            .into_iter()
            .filter_map(|row| {
                let lesson_id = row.id;
                row.into_lesson()
                    .map_err(|e| tracing::warn!(lesson_id, error = %e, "Skipping undecodable lesson"))
                    .ok()
            })
            .collect();

        Ok(lessons)
    }

    /// Count all lessons
    pub fn count_lessons(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM lessons", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Entity Operations ==========

    /// Insert an entity or replace its attribute bag.
    ///
    /// A `"name"` attribute is lifted out of the bag into the entity's name.
    /// On first insert the name defaults to `id`; on replace an absent name
    /// keeps the stored one.
    pub fn track_entity(&mut self, id: &str, attributes: Attributes) -> Result<()> {
        let tx = self.conn.transaction()?;
        track_in(&tx, id, attributes, now())?;
        tx.commit()?;
        Ok(())
    }

    /// Shallow-merge attributes into an entity, creating it if absent
    pub fn update_entity(&mut self, id: &str, attributes: Attributes) -> Result<()> {
        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row("SELECT attributes FROM entities WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        match existing {
            Some(raw) => {
                let mut merged = decode_attributes(id, &raw)?;
                let mut update = attributes;
                let name = entity::take_name(&mut update);
                entity::merge_attributes(&mut merged, update);

                tx.execute(
                    r#"
                    UPDATE entities
                    SET name = COALESCE(?1, name), attributes = ?2, updated_at = ?3
                    WHERE id = ?4
                    "#,
                    params![name, encode_attributes(&merged)?, format_timestamp(now()), id],
                )?;
            }
            None => track_in(&tx, id, attributes, now())?,
        }

        tx.commit()?;
        Ok(())
    }

    /// Get an entity by id. `None` means not found.
    ///
    /// With `include_facts`, live facts linked to the entity are attached,
    /// newest first.
    pub fn get_entity(&self, id: &str, include_facts: bool) -> Result<Option<Entity>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, attributes, created_at, updated_at FROM entities WHERE id = ?1",
                [id],
                EntityRow::from_row,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut entity = row.into_entity()?;
        if include_facts {
            entity.facts = Some(self.entity_facts(id)?);
        }
        Ok(Some(entity))
    }

    /// Live facts linked to an entity, newest first
    fn entity_facts(&self, entity_id: &str) -> Result<Vec<Fact>> {
        let sql = format!(
            "SELECT {FACT_COLUMNS} FROM facts
             WHERE entity_id = ?1 AND superseded_by IS NULL
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([entity_id], FactRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(decode_facts(rows))
    }

    /// Count all entities
    pub fn count_entities(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get memory statistics (superseded facts are not counted)
    pub fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats {
            facts: self.count_facts()?,
            lessons: self.count_lessons()?,
            entities: self.count_entities()?,
        })
    }
}

/// Memory statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub facts: usize,
    pub lessons: usize,
    pub entities: usize,
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Memory Statistics:")?;
        writeln!(f, "  Facts: {}", self.facts)?;
        writeln!(f, "  Lessons: {}", self.lessons)?;
        writeln!(f, "  Entities: {}", self.entities)
    }
}

// ========== Row Decoding ==========

/// Raw fact row as stored; decoded by [`FactRow::into_fact`]
#[derive(Debug)]
pub(crate) struct FactRow {
    pub id: i64,
    content: String,
    tags: String,
    confidence: f64,
    entity_id: Option<String>,
    created_at: String,
    accessed_at: String,
    access_count: u32,
    superseded_by: Option<i64>,
    hash: String,
}

impl FactRow {
    /// Read the leading `FACT_COLUMNS` of a row
    pub(crate) fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            tags: row.get(2)?,
            confidence: row.get(3)?,
            entity_id: row.get(4)?,
            created_at: row.get(5)?,
            accessed_at: row.get(6)?,
            access_count: row.get(7)?,
            superseded_by: row.get(8)?,
            hash: row.get(9)?,
        })
    }

    pub(crate) fn into_fact(self) -> Result<Fact> {
        let record = format!("fact #{}", self.id);
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| Error::decode(&record, format!("bad tags: {e}")))?;

        Ok(Fact {
            id: self.id,
            content: self.content,
            tags,
            confidence: self.confidence,
            entity_id: self.entity_id,
            created_at: parse_timestamp(&record, &self.created_at)?,
            accessed_at: parse_timestamp(&record, &self.accessed_at)?,
            access_count: self.access_count,
            superseded_by: self.superseded_by,
            content_hash: self.hash,
        })
    }
}

struct LessonRow {
    id: i64,
    action: String,
    context: Option<String>,
    outcome: String,
    insight: String,
    created_at: String,
    applied_count: u32,
}

impl LessonRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            action: row.get(1)?,
            context: row.get(2)?,
            outcome: row.get(3)?,
            insight: row.get(4)?,
            created_at: row.get(5)?,
            applied_count: row.get(6)?,
        })
    }

    fn into_lesson(self) -> Result<Lesson> {
        let record = format!("lesson #{}", self.id);
        let outcome: Outcome = self
            .outcome
            .parse()
            .map_err(|e| Error::decode(&record, e))?;

        Ok(Lesson {
            id: self.id,
            action: self.action,
            context: self.context,
            outcome,
            insight: self.insight,
            created_at: parse_timestamp(&record, &self.created_at)?,
            applied_count: self.applied_count,
        })
    }
}

struct EntityRow {
    id: String,
    name: String,
    attributes: String,
    created_at: String,
    updated_at: String,
}

impl EntityRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            attributes: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_entity(self) -> Result<Entity> {
        let record = format!("entity {:?}", self.id);
        Ok(Entity {
            attributes: decode_attributes(&self.id, &self.attributes)?,
            created_at: parse_timestamp(&record, &self.created_at)?,
            updated_at: parse_timestamp(&record, &self.updated_at)?,
            id: self.id,
            name: self.name,
            facts: None,
        })
    }
}

/// Decode fact rows, skipping (and logging) the ones that fail
fn decode_facts(rows: Vec<FactRow>) -> Vec<Fact> {
    rows.into_iter()
        .filter_map(|row| {
            let fact_id = row.id;
            row.into_fact()
                .map_err(|e| tracing::warn!(fact_id, error = %e, "Skipping undecodable fact"))
                .ok()
        })
        .collect()
}

fn decode_attributes(entity_id: &str, raw: &str) -> Result<Attributes> {
    serde_json::from_str(raw)
        .map_err(|e| Error::decode(format!("entity {entity_id:?}"), format!("bad attributes: {e}")))
}

fn encode_attributes(attributes: &Attributes) -> Result<String> {
    serde_json::to_string(attributes)
        .map_err(|e| Error::InvalidInput(format!("unencodable attributes: {e}")))
}

// ========== Shared Write Paths ==========

/// Current time at the precision timestamps are stored with
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC text, so SQL string comparison is chronological
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn parse_timestamp(record: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::decode(record, format!("bad timestamp {raw:?}: {e}")))
}

fn remember_in(conn: &Connection, content: &str, options: &RememberOptions, at: DateTime<Utc>) -> Result<i64> {
    let hash = fact::content_hash(content);

    let existing: Option<i64> = conn
        .query_row("SELECT id FROM facts WHERE hash = ?1", [&hash], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        touch_fact(conn, id, at)?;
        tracing::debug!(fact_id = id, "Duplicate fact, bumped access");
        return Ok(id);
    }

    let tags = serde_json::to_string(&options.tags)
        .map_err(|e| Error::InvalidInput(format!("unencodable tags: {e}")))?;
    let ts = format_timestamp(at);

    conn.execute(
        r#"
        INSERT INTO facts (content, tags, confidence, entity_id, created_at, accessed_at, access_count, hash)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5, 0, ?6)
        "#,
        params![content, tags, options.confidence, options.entity, ts, hash],
    )?;
    let id = conn.last_insert_rowid();
    search::index_fact(conn, id, content, &options.tags)?;

    tracing::debug!(fact_id = id, "Remembered new fact");
    Ok(id)
}

fn touch_fact(conn: &Connection, id: i64, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE facts SET accessed_at = ?1, access_count = access_count + 1 WHERE id = ?2",
        params![format_timestamp(at), id],
    )?;
    Ok(())
}

fn track_in(conn: &Connection, id: &str, mut attributes: Attributes, at: DateTime<Utc>) -> Result<()> {
    let explicit_name = entity::take_name(&mut attributes);
    let name = explicit_name.clone().unwrap_or_else(|| id.to_string());
    let ts = format_timestamp(at);

    conn.execute(
        r#"
        INSERT INTO entities (id, name, attributes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT(id) DO UPDATE SET
            name = COALESCE(?5, entities.name),
            attributes = excluded.attributes,
            updated_at = excluded.updated_at
        "#,
        params![id, name, encode_attributes(&attributes)?, ts, explicit_name],
    )?;
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("lesson {field} must not be empty")));
    }
    Ok(())
}

/// Escape `LIKE` wildcards so the pattern matches literally
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
