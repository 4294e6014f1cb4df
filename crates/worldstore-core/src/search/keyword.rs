//! FTS5 query sanitization.

/// Sanitize raw user text into a safe FTS5 MATCH expression.
///
/// Each whitespace-separated token is stripped of quote characters and
/// wrapped in double quotes, so FTS5 operators (`AND`, `OR`, `NEAR`, `*`,
/// `^`, column filters) in user input are matched as plain words instead of
/// being interpreted. Returns an empty string when no tokens survive;
/// callers treat that as "no keyword results".
pub fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| token.replace('"', ""))
        .filter(|token| !token.is_empty())
        .map(|token| format!("\"{token}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
