//! Search Module
//!
//! - FTS5 keyword query sanitization
//! - HNSW vector index (USearch), one per world
//! - Reciprocal Rank Fusion of the two rankings

mod hybrid;
mod keyword;
mod vector;

pub use hybrid::{reciprocal_rank_fusion, FusionConfig, DEFAULT_RRF_K};

pub use keyword::sanitize_fts5_query;

pub use vector::{
    VectorIndex, VectorIndexConfig, VectorIndexStats, VectorSearchError, DEFAULT_CONNECTIVITY,
    DEFAULT_DIMENSIONS,
};
