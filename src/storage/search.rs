//! Full-text index over fact content and tags
//!
//! `facts_fts` is a standalone FTS5 table whose rowid is the fact id.
//! It is written only through [`index_fact`] and [`remove_fact`], which the
//! content store calls inside the same transaction as the row change.

use std::sync::OnceLock;
use regex::Regex;
use rusqlite::{Connection, params};
use crate::Result;
use super::sqlite::FactRow;

static TOKEN: OnceLock<Regex> = OnceLock::new();

fn token_pattern() -> &'static Regex {
    TOKEN.get_or_init(|| Regex::new(r"\w+").expect("static token regex"))
}

/// Add a fact to the index
pub(crate) fn index_fact(conn: &Connection, id: i64, content: &str, tags: &[String]) -> Result<()> {
    conn.execute(
        "INSERT INTO facts_fts (rowid, content, tags) VALUES (?1, ?2, ?3)",
        params![id, content, tags.join(" ")],
    )?;
    Ok(())
}

/// Remove a fact from the index
pub(crate) fn remove_fact(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM facts_fts WHERE rowid = ?1", [id])?;
    Ok(())
}

/// Turn free text into an FTS5 query.
///
/// Each word becomes a quoted prefix term (`"pari"*`) and terms are OR-ed,
/// so punctuation never reaches the FTS5 parser and partial words still
/// match. Returns `None` when the text has no words.
pub fn build_match_query(query: &str) -> Option<String> {
    let terms: Vec<String> = token_pattern()
        .find_iter(query)
        .map(|m| format!("\"{}\"*", m.as_str()))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Ranked search over live facts. Lower rank is a better match.
pub(crate) fn search_live(conn: &Connection, match_query: &str, limit: usize) -> Result<Vec<(FactRow, f64)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT f.id, f.content, f.tags, f.confidence, f.entity_id, f.created_at,
               f.accessed_at, f.access_count, f.superseded_by, f.hash, facts_fts.rank
        FROM facts_fts
        JOIN facts f ON f.id = facts_fts.rowid
        WHERE facts_fts MATCH ?1 AND f.superseded_by IS NULL
        ORDER BY facts_fts.rank, f.id DESC
        LIMIT ?2
        "#,
    )?;

    let hits = stmt
        .query_map(params![match_query, limit as i64], |row| {
            Ok((FactRow::from_row(row)?, row.get::<_, f64>(10)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(hits)
}

/// Index health, as compared with the facts table
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IndexReport {
    pub facts: usize,
    pub indexed: usize,
    /// Facts with no index entry
    pub missing: usize,
    /// Index entries with no fact
    pub orphaned: usize,
}

impl IndexReport {
    pub fn is_consistent(&self) -> bool {
        self.missing == 0 && self.orphaned == 0
    }
}

/// Compare the index against the facts table
pub(crate) fn verify_consistency(conn: &Connection) -> Result<IndexReport> {
    let count = |sql: &str| -> Result<usize> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    };

    Ok(IndexReport {
        facts: count("SELECT COUNT(*) FROM facts")?,
        indexed: count("SELECT COUNT(*) FROM facts_fts")?,
        missing: count("SELECT COUNT(*) FROM facts WHERE id NOT IN (SELECT rowid FROM facts_fts)")?,
        orphaned: count("SELECT COUNT(*) FROM facts_fts WHERE rowid NOT IN (SELECT id FROM facts)")?,
    })
}

/// Drop and re-create every index entry from the facts table
pub(crate) fn rebuild(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM facts_fts", [])?;

    let mut stmt = conn.prepare("SELECT id, content, tags FROM facts")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for (id, content, raw_tags) in &rows {
        // Tags that fail to decode are indexed as raw text
        let tags: Vec<String> = serde_json::from_str(raw_tags).unwrap_or_else(|_| vec![raw_tags.clone()]);
        index_fact(conn, *id, content, &tags)?;
    }

    Ok(rows.len())
}
