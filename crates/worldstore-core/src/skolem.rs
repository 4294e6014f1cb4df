//! Blank-node skolemization.
//!
//! A [`Skolemizer`] lives for exactly one ingestion call. It maps caller-local
//! blank-node labels to stable `urn:uuid:` URIs: repeated references to the
//! same label within one batch resolve to the same URI, and the map is
//! dropped with the skolemizer, so a reused label in a later call gets a
//! fresh URI. Once committed, a skolem URI is the node's permanent identity
//! and is never re-minted.

use std::collections::HashMap;

use uuid::Uuid;

use crate::model::SKOLEM_PREFIX;

/// Whether a value lies in the reserved skolem URI space.
///
/// Debugging aid only — stored term classification comes from the
/// `term_type` column, never from prefix sniffing.
pub fn is_skolem_uri(value: &str) -> bool {
    value.starts_with(SKOLEM_PREFIX)
}

/// Ingestion-scoped blank-node label resolver.
#[derive(Debug, Default)]
pub struct Skolemizer {
    assigned: HashMap<String, String>,
}

impl Skolemizer {
    /// Fresh skolemizer for one ingestion call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a local label to its stable skolem URI, minting one on first
    /// sight. Labels that are already skolem URIs pass through unchanged —
    /// a committed identity is never re-skolemized.
    pub fn resolve(&mut self, local_label: &str) -> String {
        if is_skolem_uri(local_label) {
            return local_label.to_string();
        }
        self.assigned
            .entry(local_label.to_string())
            .or_insert_with(|| format!("{SKOLEM_PREFIX}{}", Uuid::new_v4()))
            .clone()
    }

    /// Number of distinct labels resolved so far.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Whether any labels have been resolved.
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label_same_uri_within_one_call() {
        let mut sk = Skolemizer::new();
        let a = sk.resolve("b1");
        let b = sk.resolve("b1");
        assert_eq!(a, b);
        assert_eq!(sk.len(), 1);
    }

    #[test]
    fn test_distinct_labels_get_distinct_uris() {
        let mut sk = Skolemizer::new();
        let a = sk.resolve("b1");
        let b = sk.resolve("b2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_reuse_across_calls() {
        let mut first = Skolemizer::new();
        let mut second = Skolemizer::new();
        assert_ne!(first.resolve("b1"), second.resolve("b1"));
    }

    #[test]
    fn test_minted_uris_stay_in_reserved_space() {
        let mut sk = Skolemizer::new();
        assert!(is_skolem_uri(&sk.resolve("b1")));
    }

    #[test]
    fn test_committed_identity_passes_through() {
        let mut sk = Skolemizer::new();
        let committed = "urn:uuid:0a0f7a3e-57a1-4a96-9f13-8a4f1a6bfe11";
        assert_eq!(sk.resolve(committed), committed);
        assert!(sk.is_empty());
    }
}
