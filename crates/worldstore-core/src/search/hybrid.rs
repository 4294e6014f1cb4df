//! Hybrid ranking (keyword + vector, Reciprocal Rank Fusion)
//!
//! Fuses independently ranked result lists using the RRF formula:
//! score(d) = sum of 1/(k + rank(d)) across the lists d appears in.
//!
//! RRF is effective because:
//! - It normalizes across different scoring scales
//! - It rewards items appearing in multiple result lists
//! - The k parameter (typically 60) dampens rank-1 dominance

use std::collections::HashMap;

/// Default RRF smoothing constant.
pub const DEFAULT_RRF_K: f32 = 60.0;

// ============================================================================
// FUSION
// ============================================================================

/// Reciprocal Rank Fusion over two ranked chunk-id lists.
///
/// Each input list is ordered best-first; the item at position 0 has rank 1.
/// A chunk absent from one list contributes nothing from that source. The
/// output is sorted by descending fused score, ties broken by ascending
/// chunk id for determinism.
///
/// `k` must be positive; callers validate it before fusing (a non-positive
/// value is a configuration error, not a ranking input).
pub fn reciprocal_rank_fusion(
    keyword_ranked: &[i64],
    vector_ranked: &[i64],
    k: f32,
) -> Vec<(i64, f32)> {
    debug_assert!(k > 0.0, "RRF constant must be positive");

    let mut scores: HashMap<i64, f32> = HashMap::new();

    for (position, id) in keyword_ranked.iter().enumerate() {
        *scores.entry(*id).or_default() += 1.0 / (k + (position + 1) as f32);
    }
    for (position, id) in vector_ranked.iter().enumerate() {
        *scores.entry(*id).or_default() += 1.0 / (k + (position + 1) as f32);
    }

    let mut results: Vec<(i64, f32)> = scores.into_iter().collect();
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    results
}

// ============================================================================
// FUSION CONFIGURATION
// ============================================================================

/// Tunables for hybrid search.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// RRF smoothing constant (higher = more uniform weighting).
    pub k: f32,
    /// Over-fetch factor applied to each source before fusion.
    pub source_limit_multiplier: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_RRF_K,
            source_limit_multiplier: 2,
        }
    }
}

impl FusionConfig {
    /// Effective per-source fetch size for a target result count.
    pub fn effective_source_limit(&self, target_limit: usize) -> usize {
        target_limit.saturating_mul(self.source_limit_multiplier)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_worked_example() {
        // Full-text ranks {X:1, Y:2}, vector ranks {Y:1, Z:2}, k = 60:
        // score(Y) = 1/61 + 1/61, score(X) = 1/61, score(Z) = 1/62.
        let (x, y, z) = (10, 20, 30);
        let results = reciprocal_rank_fusion(&[x, y], &[y, z], 60.0);

        assert_eq!(results[0].0, y);
        assert_eq!(results[1].0, x);
        assert_eq!(results[2].0, z);

        assert!((results[0].1 - 2.0 / 61.0).abs() < 1e-6);
        assert!((results[1].1 - 1.0 / 61.0).abs() < 1e-6);
        assert!((results[2].1 - 1.0 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_with_empty_keyword_list() {
        let results = reciprocal_rank_fusion(&[], &[7], 60.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 7);
        assert!((results[0].1 - 1.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_ties_break_by_ascending_id() {
        // Both ids appear at rank 1 in exactly one list: identical scores.
        let results = reciprocal_rank_fusion(&[9], &[3], 60.0);
        assert_eq!(results[0].0, 3);
        assert_eq!(results[1].0, 9);
        assert_eq!(results[0].1, results[1].1);
    }

    #[test]
    fn test_rrf_unequal_list_lengths() {
        let keyword = vec![1, 2, 3, 4, 5];
        let vector = vec![5];
        let results = reciprocal_rank_fusion(&keyword, &vector, 60.0);
        assert_eq!(results.len(), 5);
        // 5 is rank 5 in keyword and rank 1 in vector: 1/65 + 1/61 beats
        // 1's single 1/61.
        assert_eq!(results[0].0, 5);
    }

    #[test]
    fn test_effective_source_limit() {
        let config = FusionConfig::default();
        assert_eq!(config.effective_source_limit(10), 20);
    }
}
