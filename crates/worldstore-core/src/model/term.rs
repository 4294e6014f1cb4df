//! RDF term model.
//!
//! Terms are a closed tagged enum so every encode/decode site has to match
//! exhaustively; a new term kind is a compile error, not a runtime surprise.

use serde::{Deserialize, Serialize};

/// Reserved URI space for skolemized blank nodes.
///
/// Every skolem URI the store mints starts with this prefix. The stored
/// `term_type` column stays authoritative for term classification; the
/// prefix is a debugging aid and the namespace guarantee that skolem URIs
/// can never collide with legitimate named nodes.
pub const SKOLEM_PREFIX: &str = "urn:uuid:";

// ============================================================================
// TERM
// ============================================================================

/// An RDF term in subject, predicate, object, or graph position.
///
/// In a [`Quad`](crate::model::Quad) submitted for ingestion, a `BlankNode`
/// value is a caller-local label (e.g. `"b1"`). The skolemizer rewrites it
/// to a stable `urn:uuid:` URI before anything touches the database; stored
/// statements only ever contain skolemized blank nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Term {
    /// A named node (IRI).
    NamedNode {
        /// The node's IRI.
        uri: String,
    },
    /// A literal value with at most one of language or datatype.
    Literal {
        /// Lexical form.
        lexical: String,
        /// Language tag (e.g. "en"), exclusive with `datatype`.
        language: Option<String>,
        /// Datatype IRI, exclusive with `language`.
        datatype: Option<String>,
    },
    /// A blank node, identified by its skolem URI once stored.
    BlankNode {
        /// Local label before skolemization, skolem URI after.
        value: String,
    },
    /// The default graph.
    DefaultGraph,
}

impl Term {
    /// Named node from an IRI.
    pub fn named(uri: impl Into<String>) -> Self {
        Term::NamedNode { uri: uri.into() }
    }

    /// Plain string literal (no language, no datatype).
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            language: None,
            datatype: None,
        }
    }

    /// Language-tagged literal.
    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    /// Datatype-tagged literal.
    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }

    /// Blank node with a local label or skolem URI.
    pub fn blank(value: impl Into<String>) -> Self {
        Term::BlankNode {
            value: value.into(),
        }
    }

    /// The kind tag stored in the `term_type` column.
    pub fn kind(&self) -> TermKind {
        match self {
            Term::NamedNode { .. } => TermKind::NamedNode,
            Term::Literal { .. } => TermKind::Literal,
            Term::BlankNode { .. } => TermKind::BlankNode,
            Term::DefaultGraph => TermKind::DefaultGraph,
        }
    }

    /// Whether this term is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    /// Whether this term is a blank node.
    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode { .. })
    }
}

// ============================================================================
// TERM KIND
// ============================================================================

/// Closed set of term kinds, persisted in the `term_type` column.
///
/// Authoritative on decode: the URI shape of a value is never used to
/// classify a stored object term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TermKind {
    /// Named node (IRI).
    NamedNode,
    /// Literal with optional language or datatype.
    Literal,
    /// Skolemized blank node.
    BlankNode,
    /// The default graph.
    DefaultGraph,
}

impl std::fmt::Display for TermKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermKind::NamedNode => write!(f, "named_node"),
            TermKind::Literal => write!(f, "literal"),
            TermKind::BlankNode => write!(f, "blank_node"),
            TermKind::DefaultGraph => write!(f, "default_graph"),
        }
    }
}

/// Error for an unrecognized `term_type` tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown term type: {0}")]
pub struct ParseTermKindError(pub String);

impl std::str::FromStr for TermKind {
    type Err = ParseTermKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "named_node" => Ok(TermKind::NamedNode),
            "literal" => Ok(TermKind::Literal),
            "blank_node" => Ok(TermKind::BlankNode),
            "default_graph" => Ok(TermKind::DefaultGraph),
            other => Err(ParseTermKindError(other.to_string())),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_constructors_are_exclusive() {
        let plain = Term::literal("hello");
        let lang = Term::lang_literal("hello", "en");
        let typed = Term::typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer");

        match plain {
            Term::Literal {
                language, datatype, ..
            } => {
                assert!(language.is_none());
                assert!(datatype.is_none());
            }
            _ => panic!("expected literal"),
        }
        match lang {
            Term::Literal {
                language, datatype, ..
            } => {
                assert_eq!(language.as_deref(), Some("en"));
                assert!(datatype.is_none());
            }
            _ => panic!("expected literal"),
        }
        match typed {
            Term::Literal {
                language, datatype, ..
            } => {
                assert!(language.is_none());
                assert!(datatype.is_some());
            }
            _ => panic!("expected literal"),
        }
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in [
            TermKind::NamedNode,
            TermKind::Literal,
            TermKind::BlankNode,
            TermKind::DefaultGraph,
        ] {
            let tag = kind.to_string();
            assert_eq!(tag.parse::<TermKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_tag_is_an_error() {
        assert!("quad".parse::<TermKind>().is_err());
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Term::named("http://example.org/s").kind(), TermKind::NamedNode);
        assert_eq!(Term::literal("x").kind(), TermKind::Literal);
        assert_eq!(Term::blank("b1").kind(), TermKind::BlankNode);
        assert_eq!(Term::DefaultGraph.kind(), TermKind::DefaultGraph);
    }
}
