//! Model module - core data types
//!
//! RDF terms, quads/statements, derived chunks, and world records, plus the
//! summary types returned by store operations.

mod statement;
mod term;
mod world;

pub use statement::{Chunk, Quad, Statement};
pub use term::{ParseTermKindError, Term, TermKind, SKOLEM_PREFIX};
pub use world::World;

use serde::{Deserialize, Serialize};

// ============================================================================
// INGEST SUMMARY
// ============================================================================

/// Outcome of a batch quad ingestion.
///
/// Duplicate quads are skipped silently and counted separately — duplicate
/// ingestion is a no-op, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Statements newly inserted.
    pub inserted: i64,
    /// Statements skipped because an identical row already existed.
    pub duplicates: i64,
    /// Chunks derived from literal objects in this batch.
    pub chunks_created: i64,
}

// ============================================================================
// SEARCH HIT
// ============================================================================

/// One fused search result.
///
/// Carries the originating statement id so consumers can traverse back into
/// the graph from a text match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Matched chunk.
    pub chunk_id: i64,
    /// Statement the chunk was derived from, if still known.
    pub statement_id: Option<i64>,
    /// Fused RRF score (descending).
    pub score: f32,
}

// ============================================================================
// STORE STATS
// ============================================================================

/// Per-world row counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStats {
    /// Total statements in the world.
    pub statements: i64,
    /// Total chunks in the world.
    pub chunks: i64,
    /// Chunks with an attached embedding.
    pub chunks_with_embeddings: i64,
}
