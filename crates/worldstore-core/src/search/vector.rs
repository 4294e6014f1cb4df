//! HNSW vector index.
//!
//! USearch-backed approximate nearest neighbor index, keyed directly by
//! chunk id. The store keeps one index per world so a similarity lookup can
//! never cross a world boundary.

use std::collections::HashSet;

use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default embedding dimensions.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// HNSW connectivity parameter (higher = better recall, more memory).
pub const DEFAULT_CONNECTIVITY: usize = 16;

/// HNSW expansion factor for index building.
pub const DEFAULT_EXPANSION_ADD: usize = 128;

/// HNSW expansion factor for search (higher = better recall, slower).
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Vector index error types.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorSearchError {
    /// Failed to create the index.
    #[error("index creation failed: {0}")]
    IndexCreation(String),
    /// Failed to add a vector.
    #[error("failed to add vector: {0}")]
    IndexAdd(String),
    /// Failed to search.
    #[error("search failed: {0}")]
    IndexSearch(String),
    /// Dimension mismatch.
    #[error("invalid dimensions: expected {0}, got {1}")]
    InvalidDimensions(usize, usize),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for a vector index.
#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    /// Number of dimensions.
    pub dimensions: usize,
    /// HNSW connectivity parameter.
    pub connectivity: usize,
    /// Expansion factor for adding vectors.
    pub expansion_add: usize,
    /// Expansion factor for searching.
    pub expansion_search: usize,
    /// Distance metric.
    pub metric: MetricKind,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            metric: MetricKind::Cos,
        }
    }
}

impl VectorIndexConfig {
    /// Config with a specific dimensionality, other knobs at defaults.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }
}

/// Index statistics.
#[derive(Debug, Clone)]
pub struct VectorIndexStats {
    /// Total number of vectors.
    pub total_vectors: usize,
    /// Vector dimensions.
    pub dimensions: usize,
    /// HNSW connectivity.
    pub connectivity: usize,
    /// Estimated memory usage in bytes.
    pub memory_bytes: usize,
}

// ============================================================================
// VECTOR INDEX
// ============================================================================

/// HNSW vector index keyed by chunk id.
pub struct VectorIndex {
    index: Index,
    config: VectorIndexConfig,
    keys: HashSet<i64>,
}

impl VectorIndex {
    /// Create a new vector index.
    pub fn with_config(config: VectorIndexConfig) -> Result<Self, VectorSearchError> {
        let options = IndexOptions {
            dimensions: config.dimensions,
            metric: config.metric,
            quantization: ScalarKind::F32,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };

        let index =
            Index::new(&options).map_err(|e| VectorSearchError::IndexCreation(e.to_string()))?;

        Ok(Self {
            index,
            config,
            keys: HashSet::new(),
        })
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Dimensions of the index.
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Whether a chunk id is present.
    pub fn contains(&self, chunk_id: i64) -> bool {
        self.keys.contains(&chunk_id)
    }

    /// Reserve capacity. usearch requires reserve() before add() to avoid
    /// segfaults, so `upsert` grows capacity as needed.
    pub fn reserve(&self, capacity: usize) -> Result<(), VectorSearchError> {
        self.index
            .reserve(capacity)
            .map_err(|e| VectorSearchError::IndexCreation(format!("failed to reserve: {e}")))
    }

    /// Insert or replace the vector for a chunk id.
    pub fn upsert(&mut self, chunk_id: i64, vector: &[f32]) -> Result<(), VectorSearchError> {
        if vector.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.config.dimensions,
                vector.len(),
            ));
        }

        let key = chunk_id as u64;

        if self.keys.contains(&chunk_id) {
            self.index
                .remove(key)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            self.reserve(self.index.size() + 1)?;
            self.index
                .add(key, vector)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            return Ok(());
        }

        let capacity = self.index.capacity();
        let size = self.index.size();
        if size >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.reserve(new_capacity)?;
        }

        self.index
            .add(key, vector)
            .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
        self.keys.insert(chunk_id);

        Ok(())
    }

    /// Remove a chunk id. Returns whether it was present.
    pub fn remove(&mut self, chunk_id: i64) -> Result<bool, VectorSearchError> {
        if self.keys.remove(&chunk_id) {
            self.index
                .remove(chunk_id as u64)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Nearest neighbors for a query vector, best first.
    ///
    /// Scores are similarities (1 - cosine distance).
    pub fn search(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(i64, f32)>, VectorSearchError> {
        if query.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.config.dimensions,
                query.len(),
            ));
        }

        if self.is_empty() {
            return Ok(vec![]);
        }

        let results = self
            .index
            .search(query, limit)
            .map_err(|e| VectorSearchError::IndexSearch(e.to_string()))?;

        let mut hits = Vec::with_capacity(results.keys.len());
        for (key, distance) in results.keys.iter().zip(results.distances.iter()) {
            hits.push((*key as i64, 1.0 - distance));
        }

        Ok(hits)
    }

    /// All chunk ids currently indexed.
    pub fn chunk_ids(&self) -> Vec<i64> {
        self.keys.iter().copied().collect()
    }

    /// Index statistics.
    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            total_vectors: self.len(),
            dimensions: self.config.dimensions,
            connectivity: self.config.connectivity,
            memory_bytes: self.index.serialized_length(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: usize = 16;

    fn test_index() -> VectorIndex {
        VectorIndex::with_config(VectorIndexConfig::with_dimensions(DIMS)).unwrap()
    }

    fn test_vector(seed: f32) -> Vec<f32> {
        (0..DIMS)
            .map(|i| ((i as f32 + seed) / DIMS as f32).sin())
            .collect()
    }

    #[test]
    fn test_index_creation() {
        let index = test_index();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), DIMS);
    }

    #[test]
    fn test_upsert_and_search() {
        let mut index = test_index();

        index.upsert(1, &test_vector(1.0)).unwrap();
        index.upsert(2, &test_vector(2.0)).unwrap();
        index.upsert(3, &test_vector(100.0)).unwrap();

        assert_eq!(index.len(), 3);
        assert!(index.contains(1));
        assert!(!index.contains(999));

        let results = index.search(&test_vector(1.0), 3).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn test_remove() {
        let mut index = test_index();
        index.upsert(1, &test_vector(1.0)).unwrap();
        assert!(index.remove(1).unwrap());
        assert!(!index.contains(1));
        assert!(!index.remove(1).unwrap());
    }

    #[test]
    fn test_upsert_replaces() {
        let mut index = test_index();
        index.upsert(1, &test_vector(1.0)).unwrap();
        index.upsert(1, &test_vector(2.0)).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut index = test_index();
        let wrong: Vec<f32> = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            index.upsert(1, &wrong),
            Err(VectorSearchError::InvalidDimensions(DIMS, 3))
        ));
    }

    #[test]
    fn test_stats() {
        let mut index = test_index();
        index.upsert(1, &test_vector(1.0)).unwrap();

        let stats = index.stats();
        assert_eq!(stats.total_vectors, 1);
        assert_eq!(stats.dimensions, DIMS);
    }
}
