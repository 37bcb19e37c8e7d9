//! Query-text normalization for the PostgreSQL dialect.
//!
//! Workload queries are written against a generic dialect; before execution
//! they get PostgreSQL-compatible limit clauses, interval literals, and
//! aliases on derived tables (PostgreSQL rejects unaliased subqueries).

use regex::Regex;
use std::sync::LazyLock;

/// Alias token injected after unaliased derived tables.
const SUBQUERY_ALIAS: &str = "alias123";

static SUBQUERY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(from|,)[ \t\n]*\(").expect("valid subquery pattern"));

static INTERVAL_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([0-9]+) days\)").expect("valid interval pattern"));

/// Rewrite a workload query so PostgreSQL accepts it.
pub fn rewrite_query_text(text: &str) -> String {
    let text = text.replace(";\nlimit ", " limit ").replace("limit -1", "");
    let text = INTERVAL_DAYS.replace_all(&text, " interval '${1} days')");
    add_subquery_aliases(&text)
}

/// Inject `as alias123` after every derived table that lacks an alias.
///
/// Scans for `from (` / `, (` case-insensitively, balances the parenthesized
/// expression with a depth counter, and inspects the token after the closing
/// parenthesis: a closing delimiter, comma, or one of a small set of clause
/// keywords means no alias is present. Insertions are applied back-to-front
/// so earlier offsets stay valid.
fn add_subquery_aliases(query_text: &str) -> String {
    // All offsets are byte positions into `query_text` itself; paren bytes
    // never occur inside UTF-8 continuation sequences, so walking raw bytes
    // is safe even for multibyte literals.
    let bytes = query_text.as_bytes();

    let mut positions = Vec::new();
    for opening in SUBQUERY_OPEN.find_iter(query_text) {
        // Depth starts at 1: the match already consumed the opening paren.
        let mut depth = 1usize;
        let mut pos = opening.end();
        while depth > 0 && pos < bytes.len() {
            match bytes[pos] {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            pos += 1;
        }
        if depth > 0 {
            // Unbalanced text; leave it for the backend to reject.
            continue;
        }

        let next_word = query_text[pos..]
            .trim_start()
            .split([' ', '\n'])
            .next()
            .unwrap_or("");
        let unaliased = matches!(next_word.bytes().next(), Some(b')' | b','))
            || ["limit", "group", "order", "where"]
                .iter()
                .any(|kw| next_word.eq_ignore_ascii_case(kw));
        if unaliased {
            positions.push(pos);
        }
    }

    let mut rewritten = query_text.to_string();
    positions.sort_unstable();
    for &pos in positions.iter().rev() {
        rewritten.insert_str(pos, &format!(" as {} ", SUBQUERY_ALIAS));
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clause_normalization() {
        assert_eq!(
            rewrite_query_text("select * from orders;\nlimit 10"),
            "select * from orders limit 10"
        );
        assert_eq!(
            rewrite_query_text("select * from orders limit -1"),
            "select * from orders "
        );
    }

    #[test]
    fn test_interval_literal_rewrite() {
        assert_eq!(
            rewrite_query_text("select * from lineitem where l_shipdate <= (date '1998-12-01' - 90 days)"),
            "select * from lineitem where l_shipdate <= (date '1998-12-01' - interval '90 days')"
        );
    }

    #[test]
    fn test_alias_injected_before_limit() {
        assert_eq!(
            rewrite_query_text("select * from (select 1) limit 5"),
            "select * from (select 1) as alias123  limit 5"
        );
    }

    #[test]
    fn test_alias_injected_at_closing_delimiter() {
        let rewritten = rewrite_query_text("select * from (select a from (select 1 a)) t");
        assert_eq!(
            rewritten,
            "select * from (select a from (select 1 a) as alias123 ) t"
        );
    }

    #[test]
    fn test_aliased_subquery_untouched() {
        let text = "select * from (select 1) as t where t.x > 0";
        assert_eq!(rewrite_query_text(text), text);
    }

    #[test]
    fn test_alias_injection_is_idempotent() {
        let once = rewrite_query_text("select * from (select 1) limit 5");
        let twice = rewrite_query_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_nested_parentheses_balanced() {
        let rewritten =
            rewrite_query_text("select * from (select max((a + b)) from t) where x = 1");
        assert_eq!(
            rewritten,
            "select * from (select max((a + b)) from t) as alias123  where x = 1"
        );
    }

    #[test]
    fn test_comma_separated_derived_table() {
        let rewritten = rewrite_query_text("select * from t, (select 1) where x = 1");
        assert_eq!(
            rewritten,
            "select * from t, (select 1) as alias123  where x = 1"
        );
    }

    #[test]
    fn test_uppercase_query_gets_alias() {
        let rewritten = rewrite_query_text("SELECT * FROM (SELECT 1) LIMIT 5");
        assert_eq!(rewritten, "SELECT * FROM (SELECT 1) as alias123  LIMIT 5");
    }

    #[test]
    fn test_multibyte_literal_keeps_insertion_point() {
        // A multibyte literal ahead of the closing parenthesis must not shift
        // the insertion offset.
        let rewritten = rewrite_query_text("select * from (select 'İstanbul') limit 5");
        assert_eq!(
            rewritten,
            "select * from (select 'İstanbul') as alias123  limit 5"
        );
    }

    #[test]
    fn test_multibyte_text_after_subquery_is_untouched() {
        // The token right after the subquery starts with a multibyte
        // character; inspecting it must not split a character or panic.
        let text = "select * from (select 'İ')élimit 5";
        assert_eq!(rewrite_query_text(text), text);
    }
}
