//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: worlds, statements, chunks, FTS5",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Cascade scan indexes for blank-node deletion",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS worlds (
    world_id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT,
    is_public INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_worlds_account ON worlds(account_id);

-- Quad source of truth. The composite key makes duplicate ingestion a
-- silent no-op (INSERT OR IGNORE); world_id is part of the key so identical
-- quads in different worlds never collide.
CREATE TABLE IF NOT EXISTS statements (
    statement_id INTEGER PRIMARY KEY AUTOINCREMENT,
    world_id TEXT NOT NULL REFERENCES worlds(world_id),
    subject TEXT NOT NULL,
    predicate TEXT NOT NULL,
    object TEXT NOT NULL,
    graph TEXT NOT NULL,
    term_type TEXT NOT NULL,
    object_language TEXT NOT NULL DEFAULT '',
    object_datatype TEXT NOT NULL DEFAULT '',
    UNIQUE(world_id, subject, predicate, object, graph, term_type, object_language, object_datatype)
);

CREATE INDEX IF NOT EXISTS idx_statements_graph ON statements(world_id, graph);

-- Derived text fragments. statement_id is a weak back-reference: deleting
-- the statement deletes the chunk (FK cascade is the backstop; the sync
-- engine removes index entries explicitly in the same transaction).
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id INTEGER PRIMARY KEY AUTOINCREMENT,
    world_id TEXT NOT NULL,
    statement_id INTEGER REFERENCES statements(statement_id) ON DELETE CASCADE,
    content TEXT,
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_chunks_statement ON chunks(statement_id);
CREATE INDEX IF NOT EXISTS idx_chunks_world ON chunks(world_id);

-- FTS5 full-text index over chunk content. rowid == chunk_id; maintained
-- only by the chunk/index sync engine, never by triggers, so the vector
-- index can be staged in the same write scope.
CREATE VIRTUAL TABLE IF NOT EXISTS chunk_fts USING fts5(
    content,
    tokenize='porter ascii'
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Cascade scan indexes
/// The cascading delete engine scans statements by subject and probes for
/// blank-node objects; both paths need covering indexes.
const MIGRATION_V2_UP: &str = r#"
CREATE INDEX IF NOT EXISTS idx_statements_subject ON statements(world_id, subject);

CREATE INDEX IF NOT EXISTS idx_statements_blank_object
    ON statements(world_id, object)
    WHERE term_type = 'blank_node';

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles the multi-statement SQL
            conn.execute_batch(migration.up)?;

            applied += 1;
        }
    }

    Ok(applied)
}
