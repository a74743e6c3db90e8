//! # Agent Memory - Persistent memory for AI agents
//!
//! An embedded, SQLite-backed store that an autonomous process uses to
//! accumulate knowledge across long-running sessions.
//!
//! Agent Memory provides:
//! - Facts with content deduplication and supersession chains
//! - Full-text recall over live facts (FTS5, BM25 ranking)
//! - A lesson log of actions, outcomes and insights
//! - An entity registry with merge-update attribute bags
//! - Explicit, caller-driven retention sweeps
//!
//! ```rust,no_run
//! use agent_memory::{MemoryStore, RememberOptions};
//!
//! let mut store = MemoryStore::open_in_memory()?;
//! let id = store.remember("Paris is the capital of France", RememberOptions::default())?;
//! let hits = store.recall("paris", 10)?;
//! assert_eq!(hits[0].fact.id, id);
//! # Ok::<(), agent_memory::Error>(())
//! ```

pub mod config;
pub mod entity;
pub mod fact;
pub mod lesson;
pub mod output;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use config::{MemoryConfig, StorePath};
pub use entity::{Attributes, Entity};
pub use fact::{Fact, FactMatch, ListOptions, RememberOptions};
pub use lesson::{Lesson, LessonQuery, Outcome};
pub use storage::{MemoryStats, MemoryStore, RetentionPolicy};

/// Result type alias for Agent Memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Agent Memory operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {record}: {message}")]
    Decode { record: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn decode(record: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Decode {
            record: record.into(),
            message: message.to_string(),
        }
    }
}
