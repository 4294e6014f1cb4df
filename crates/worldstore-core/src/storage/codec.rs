//! Term codec.
//!
//! Encoding and decoding between [`Term`] values and the plain-text row
//! fields stored in SQLite columns. `term_type` describes the object
//! position and is authoritative on decode. Subject, predicate, and graph
//! are stored as bare strings; their kind is recovered from the reserved
//! skolem URI space, which the skolemizer guarantees named nodes can never
//! occupy. Embeddings are stored as little-endian f32 BLOBs.

use crate::model::{Term, TermKind};
use crate::skolem::is_skolem_uri;

use super::sqlite::{Result, StoreError};

// ============================================================================
// TERM ENCODING
// ============================================================================

/// Row fields for the object position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EncodedTerm {
    /// Stored textual value.
    pub value: String,
    /// Kind tag for the `term_type` column.
    pub kind: TermKind,
    /// Language tag, empty string when absent.
    pub language: String,
    /// Datatype URI, empty string when absent.
    pub datatype: String,
}

/// Encode a term for the object position. Total: every term kind has a row
/// representation.
pub(crate) fn encode_object(term: &Term) -> EncodedTerm {
    match term {
        Term::NamedNode { uri } => EncodedTerm {
            value: uri.clone(),
            kind: TermKind::NamedNode,
            language: String::new(),
            datatype: String::new(),
        },
        Term::Literal {
            lexical,
            language,
            datatype,
        } => EncodedTerm {
            value: lexical.clone(),
            kind: TermKind::Literal,
            language: language.clone().unwrap_or_default(),
            datatype: datatype.clone().unwrap_or_default(),
        },
        Term::BlankNode { value } => EncodedTerm {
            value: value.clone(),
            kind: TermKind::BlankNode,
            language: String::new(),
            datatype: String::new(),
        },
        Term::DefaultGraph => EncodedTerm {
            value: String::new(),
            kind: TermKind::DefaultGraph,
            language: String::new(),
            datatype: String::new(),
        },
    }
}

/// Encode a term for the subject or predicate position. Literals are
/// structurally forbidden there.
pub(crate) fn encode_node(term: &Term, position: &str) -> Result<String> {
    match term {
        Term::NamedNode { uri } => Ok(uri.clone()),
        Term::BlankNode { value } => Ok(value.clone()),
        Term::Literal { .. } => Err(StoreError::ConstraintViolation(format!(
            "literal term in {position} position"
        ))),
        Term::DefaultGraph => Err(StoreError::ConstraintViolation(format!(
            "default graph term in {position} position"
        ))),
    }
}

/// Encode a term for the graph position. The default graph is stored as the
/// empty string; literals are forbidden.
pub(crate) fn encode_graph(term: &Term) -> Result<String> {
    match term {
        Term::DefaultGraph => Ok(String::new()),
        Term::NamedNode { uri } => Ok(uri.clone()),
        Term::BlankNode { value } => Ok(value.clone()),
        Term::Literal { .. } => Err(StoreError::ConstraintViolation(
            "literal term in graph position".to_string(),
        )),
    }
}

// ============================================================================
// TERM DECODING
// ============================================================================

/// Decode the object position from its row fields. Exact inverse of
/// [`encode_object`] on well-formed rows: language is preferred when
/// non-empty, then datatype, else a plain string literal.
pub(crate) fn decode_object(
    value: String,
    kind: TermKind,
    language: &str,
    datatype: &str,
) -> Term {
    match kind {
        TermKind::NamedNode => Term::NamedNode { uri: value },
        TermKind::BlankNode => Term::BlankNode { value },
        TermKind::DefaultGraph => Term::DefaultGraph,
        TermKind::Literal => {
            if !language.is_empty() {
                Term::lang_literal(value, language)
            } else if !datatype.is_empty() {
                Term::typed_literal(value, datatype)
            } else {
                Term::literal(value)
            }
        }
    }
}

/// Decode a subject or predicate value.
pub(crate) fn decode_node(value: String) -> Term {
    if is_skolem_uri(&value) {
        Term::BlankNode { value }
    } else {
        Term::NamedNode { uri: value }
    }
}

/// Decode a graph value. Empty string is the default graph.
pub(crate) fn decode_graph(value: String) -> Term {
    if value.is_empty() {
        Term::DefaultGraph
    } else {
        decode_node(value)
    }
}

// ============================================================================
// EMBEDDING ENCODING
// ============================================================================

/// Encode an embedding as a little-endian f32 BLOB.
pub(crate) fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode an embedding BLOB. Returns `None` on a torn blob.
pub(crate) fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SKOLEM_PREFIX;

    fn round_trip(term: Term) {
        let enc = encode_object(&term);
        let back = decode_object(enc.value, enc.kind, &enc.language, &enc.datatype);
        assert_eq!(back, term);
    }

    #[test]
    fn test_object_round_trip_all_kinds() {
        round_trip(Term::named("http://example.org/s"));
        round_trip(Term::literal("plain"));
        round_trip(Term::lang_literal("bonjour", "fr"));
        round_trip(Term::typed_literal(
            "42",
            "http://www.w3.org/2001/XMLSchema#integer",
        ));
        round_trip(Term::blank(format!(
            "{SKOLEM_PREFIX}2c12ad87-6a1f-4a61-b0cf-4a4f6a8ef0d2"
        )));
        round_trip(Term::DefaultGraph);
    }

    #[test]
    fn test_language_preferred_over_datatype() {
        // Defensive decode of a malformed row carrying both tags.
        let term = decode_object(
            "hola".to_string(),
            TermKind::Literal,
            "es",
            "http://www.w3.org/2001/XMLSchema#string",
        );
        assert_eq!(term, Term::lang_literal("hola", "es"));
    }

    #[test]
    fn test_literal_rejected_in_node_positions() {
        let lit = Term::literal("nope");
        assert!(matches!(
            encode_node(&lit, "subject"),
            Err(StoreError::ConstraintViolation(_))
        ));
        assert!(matches!(
            encode_graph(&lit),
            Err(StoreError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_graph_default_is_empty_string() {
        assert_eq!(encode_graph(&Term::DefaultGraph).unwrap(), "");
        assert_eq!(decode_graph(String::new()), Term::DefaultGraph);
    }

    #[test]
    fn test_node_decode_uses_reserved_space() {
        let skolem = format!("{SKOLEM_PREFIX}9adf1a40-1111-4e86-9a70-1d4f6f2b6a01");
        assert!(decode_node(skolem).is_blank());
        assert!(!decode_node("http://example.org/x".to_string()).is_blank());
    }

    #[test]
    fn test_embedding_round_trip() {
        let vector = vec![0.5_f32, -1.25, 3.0];
        let bytes = encode_embedding(&vector);
        assert_eq!(decode_embedding(&bytes).unwrap(), vector);
    }

    #[test]
    fn test_torn_embedding_blob() {
        assert!(decode_embedding(&[0u8, 1, 2]).is_none());
    }
}
