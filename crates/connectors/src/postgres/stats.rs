//! Parsing and summarizing of catalog column statistics.
//!
//! `pg_stats` exposes most-common-value lists and histogram boundaries as
//! `anyarray`; they arrive here cast to their `{...}` text form and are
//! parsed without a full array-literal grammar (double-quoted elements and
//! backslash escapes are enough for statistics output).

use crate::models::ColumnStatistics;
use std::cmp::Ordering;

/// Parse a PostgreSQL array literal (`{a,b,"c,d"}`) into its elements.
pub fn parse_array_literal(text: &str) -> Vec<String> {
    let inner = text
        .trim()
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(text);
    if inner.is_empty() {
        return Vec::new();
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' if !in_quotes => {
                elements.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    elements.push(current);
    elements
}

/// Summarize a most-common-value list: sorted, then first/middle/last.
pub fn summarize_most_common(mut values: Vec<String>) -> Option<ColumnStatistics> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| compare_values(a, b));
    Some(ColumnStatistics {
        minimum: values.first()?.clone(),
        median: values.get(values.len() / 2)?.clone(),
        maximum: values.last()?.clone(),
    })
}

/// Summarize histogram boundaries: the catalog already orders them, so
/// first/middle/last are taken as-is.
pub fn summarize_histogram(values: &[String]) -> Option<ColumnStatistics> {
    if values.is_empty() {
        return None;
    }
    Some(ColumnStatistics {
        minimum: values.first()?.clone(),
        median: values.get(values.len() / 2)?.clone(),
        maximum: values.last()?.clone(),
    })
}

/// Numeric-aware ordering: catalog values arrive as text, and `"10" < "2"`
/// lexically would pick nonsense boundaries for numeric columns.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Quote a textual/date boundary value for substitution into a partitioning
/// statement.
///
/// Strips quote and whitespace artifacts the catalog wraps around the value,
/// then dollar-quotes it with a delimiter not occurring in the value itself.
pub fn quote_boundary(raw: &str) -> String {
    let value = raw.replace('"', "");
    let value = value.trim();

    let mut delimiter = "$$".to_string();
    let mut tag = 0u32;
    while value.contains(&delimiter) {
        tag += 1;
        delimiter = format!("$b{}$", tag);
    }
    format!("{delimiter}{value}{delimiter}")
}

/// Double-quote an identifier when it would otherwise be taken for a keyword
/// or break the lexer.
pub fn quote_identifier(name: &str) -> String {
    let reserved = matches!(name, "order" | "group" | "user" | "select" | "from" | "where");
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if reserved || !plain {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_array_literal() {
        assert_eq!(parse_array_literal("{1,2,3}"), owned(&["1", "2", "3"]));
        assert_eq!(parse_array_literal("{}"), Vec::<String>::new());
        assert_eq!(
            parse_array_literal(r#"{plain,"with, comma","with \"quote\""}"#),
            owned(&["plain", "with, comma", "with \"quote\""])
        );
    }

    #[test]
    fn test_most_common_value_summary() {
        let stats = summarize_most_common(owned(&["3", "1", "4", "1", "5"])).unwrap();
        // Sorted: [1, 1, 3, 4, 5]; the median is the middle entry.
        assert_eq!(stats.minimum, "1");
        assert_eq!(stats.median, "3");
        assert_eq!(stats.maximum, "5");
    }

    #[test]
    fn test_most_common_values_sort_numerically() {
        let stats = summarize_most_common(owned(&["10", "2", "33", "4", "5"])).unwrap();
        assert_eq!(stats.minimum, "2");
        assert_eq!(stats.median, "5");
        assert_eq!(stats.maximum, "33");
    }

    #[test]
    fn test_histogram_summary() {
        let stats = summarize_histogram(&owned(&["10", "20", "30", "40", "50"])).unwrap();
        assert_eq!(stats.minimum, "10");
        assert_eq!(stats.median, "30");
        assert_eq!(stats.maximum, "50");
    }

    #[test]
    fn test_empty_distributions() {
        assert!(summarize_most_common(Vec::new()).is_none());
        assert!(summarize_histogram(&[]).is_none());
    }

    #[test]
    fn test_boundary_quoting_strips_artifacts() {
        assert_eq!(quote_boundary("\"1995-03-15\" "), "$$1995-03-15$$");
        assert_eq!(quote_boundary("  MACHINERY"), "$$MACHINERY$$");
    }

    #[test]
    fn test_boundary_quoting_survives_embedded_dollars() {
        let quoted = quote_boundary("price in $$ signs");
        assert_eq!(quoted, "$b1$price in $$ signs$b1$");

        let quoted = quote_boundary("nested $b1$ and $$");
        assert_eq!(quoted, "$b2$nested $b1$ and $$$b2$");
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_identifier("l_shipdate"), "l_shipdate");
        assert_eq!(quote_identifier("order"), "\"order\"");
        assert_eq!(quote_identifier("Weird Name"), "\"Weird Name\"");
    }
}
