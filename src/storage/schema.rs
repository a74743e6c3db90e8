//! Database schema definitions

/// SQL to create the facts table
pub const CREATE_FACTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    confidence REAL NOT NULL DEFAULT 1.0,
    entity_id TEXT,
    created_at TEXT NOT NULL,
    accessed_at TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    superseded_by INTEGER,
    hash TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the full-text index over fact content and tags.
/// Rows are keyed by `rowid = facts.id` and maintained by explicit writes.
pub const CREATE_FACTS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS facts_fts USING fts5(
    content,
    tags,
    tokenize = 'unicode61'
)
"#;

/// SQL to create the lessons table
pub const CREATE_LESSONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS lessons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    context TEXT,
    outcome TEXT NOT NULL,
    insight TEXT NOT NULL,
    created_at TEXT NOT NULL,
    applied_count INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the entities table
pub const CREATE_ENTITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_facts_entity ON facts(entity_id)",
    "CREATE INDEX IF NOT EXISTS idx_facts_accessed ON facts(accessed_at)",
    "CREATE INDEX IF NOT EXISTS idx_facts_superseded ON facts(superseded_by)",
    "CREATE INDEX IF NOT EXISTS idx_lessons_created ON lessons(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_lessons_outcome ON lessons(outcome)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_FACTS_TABLE,
        CREATE_FACTS_FTS_TABLE,
        CREATE_LESSONS_TABLE,
        CREATE_ENTITIES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
