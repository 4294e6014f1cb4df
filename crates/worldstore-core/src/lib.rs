//! # Worldstore Core
//!
//! Persistent statement & chunk store for world-partitioned RDF graph data:
//!
//! - **Quad persistence**: subject/predicate/object/graph rows in SQLite,
//!   idempotent batch ingestion, world-scoped uniqueness
//! - **Skolemization**: blank-node labels rewritten to stable `urn:uuid:`
//!   URIs at the ingestion boundary
//! - **Derived chunks**: a text chunk per literal object, kept in lockstep
//!   with an FTS5 keyword index and a per-world USearch HNSW vector index
//! - **Hybrid Search**: RRF fusion of keyword (BM25/FTS5) + vector rankings
//! - **Cascading delete**: removing a statement reclaims the blank-node
//!   substructure hanging off it, chunks and index entries included
//! - **Write scopes**: every mutation is all-or-nothing across the tables
//!   and both indexes, and publishes an invalidation signal on commit
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use worldstore_core::{Quad, Store, StoreConfig, Term};
//!
//! // Open a store (uses default platform-specific location)
//! let store = Store::open(None, StoreConfig::default())?;
//!
//! let world = store.create_world("acct-1", "demo", None, false)?;
//!
//! // Ingest quads; blank nodes are skolemized, literals become chunks
//! let quads = vec![Quad::in_default_graph(
//!     Term::named("http://example.org/alice"),
//!     Term::named("http://example.org/note"),
//!     Term::literal("Alice prefers morning meetings"),
//! )];
//! let summary = store.insert_quads(&world.world_id, &quads)?;
//!
//! // Hybrid search over derived chunks
//! let hits = store.search_chunks(&world.world_id, "morning meetings", None, 60.0, 10)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Build SQLite from source with FTS5
//! - `encryption`: SQLCipher at-rest encryption, keyed via the
//!   `WORLDSTORE_ENCRYPTION_KEY` environment variable

#![cfg_attr(docsrs, feature(doc_cfg))]
// Only warn about missing docs for public items exported from the crate root
// Internal struct fields and enum variants don't need documentation
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod model;
pub mod search;
pub mod skolem;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Model types
pub use model::{
    Chunk, IngestSummary, ParseTermKindError, Quad, SearchHit, Statement, Term, TermKind, World,
    WorldStats, SKOLEM_PREFIX,
};

// Skolemization
pub use skolem::{is_skolem_uri, Skolemizer};

// Storage layer
pub use storage::{IndexIntegrityReport, Result, Store, StoreConfig, StoreError};

// Search
pub use search::{
    reciprocal_rank_fusion, sanitize_fts5_query, FusionConfig, VectorIndex, VectorIndexConfig,
    VectorIndexStats, VectorSearchError, DEFAULT_DIMENSIONS, DEFAULT_RRF_K,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Chunk, IngestSummary, Quad, Result, SearchHit, Statement, Store, StoreConfig, StoreError,
        Term, TermKind, World,
    };

    pub use crate::{FusionConfig, VectorIndex, DEFAULT_RRF_K};
}
