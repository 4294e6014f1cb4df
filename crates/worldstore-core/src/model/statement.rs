//! Statements and chunks.
//!
//! A [`Quad`] is the caller-facing input; a [`Statement`] is the stored,
//! id-bearing form. A [`Chunk`] is the searchable text fragment derived
//! from a statement's literal object.

use serde::{Deserialize, Serialize};

use super::term::Term;

// ============================================================================
// QUAD (INGESTION INPUT)
// ============================================================================

/// A quad submitted for ingestion.
///
/// Blank-node terms carry caller-local labels; the skolemizer rewrites them
/// during ingestion. An optional pre-computed embedding vector rides along
/// for the chunk derived from a literal object — the store never computes
/// embeddings itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quad {
    /// Subject term (never a literal).
    pub subject: Term,
    /// Predicate term (never a literal).
    pub predicate: Term,
    /// Object term.
    pub object: Term,
    /// Graph term (never a literal).
    pub graph: Term,
    /// Pre-computed embedding for the object literal's chunk, if any.
    pub embedding: Option<Vec<f32>>,
}

impl Quad {
    /// Quad in an explicit graph.
    pub fn new(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
            embedding: None,
        }
    }

    /// Quad in the default graph.
    pub fn in_default_graph(subject: Term, predicate: Term, object: Term) -> Self {
        Self::new(subject, predicate, object, Term::DefaultGraph)
    }

    /// Attach a pre-computed embedding for the derived chunk.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

// ============================================================================
// STATEMENT (STORED QUAD)
// ============================================================================

/// A stored quad with its store-assigned identity.
///
/// Immutable once created: updates are delete + insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// Store-assigned integer identity.
    pub id: i64,
    /// Owning world.
    pub world_id: String,
    /// Subject term.
    pub subject: Term,
    /// Predicate term.
    pub predicate: Term,
    /// Object term.
    pub object: Term,
    /// Graph term.
    pub graph: Term,
}

// ============================================================================
// CHUNK
// ============================================================================

/// A searchable text fragment derived from a statement's object literal.
///
/// The back-reference to the statement is weak: deleting the statement
/// deletes the chunk, never the other way around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Store-assigned integer identity (also the FTS rowid and vector key).
    pub id: i64,
    /// Owning world.
    pub world_id: String,
    /// Source statement, if still known.
    pub statement_id: Option<i64>,
    /// Indexed text. Mirrors the full-text index exactly at all times.
    pub content: Option<String>,
    /// Pre-computed embedding, if attached.
    pub embedding: Option<Vec<f32>>,
}
