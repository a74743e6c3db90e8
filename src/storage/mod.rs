//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - facts(id, content, tags, confidence, entity_id, created_at, accessed_at, access_count, superseded_by, hash)
//! - facts_fts(content, tags), an FTS5 index keyed by fact id
//! - lessons(id, action, context, outcome, insight, created_at, applied_count)
//! - entities(id, name, attributes, created_at, updated_at)

pub mod retention;
pub mod schema;
pub mod search;
pub mod sqlite;

pub use retention::RetentionPolicy;
pub use search::IndexReport;
pub use sqlite::{MemoryStats, MemoryStore};
