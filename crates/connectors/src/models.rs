//! Candidate descriptors exchanged with the selection algorithm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-point distribution summary of a column, as opaque catalog values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub minimum: String,
    pub median: String,
    pub maximum: String,
}

/// A table column, with type and statistics resolved lazily from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub table: String,
    pub name: String,
    /// Declared SQL type, fetched on the first statistics request.
    pub data_type: Option<String>,
    /// Populated by the statistics extractor; required before the column can
    /// drive a partition simulation.
    pub statistics: Option<ColumnStatistics>,
}

impl Column {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            data_type: None,
            statistics: None,
        }
    }

    /// Whether range boundaries for this column must be quoted as literals.
    pub fn is_text_or_date(&self) -> bool {
        match &self.data_type {
            Some(ty) => {
                let ty = ty.to_ascii_lowercase();
                ty.contains("char") || ty.contains("text") || ty.contains("date")
                    || ty.contains("time")
            }
            None => false,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// An index candidate: owning table plus an ordered column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub table: String,
    pub columns: Vec<String>,
    /// Size in bytes, set only after real creation (never by simulation).
    pub estimated_size: Option<u64>,
}

impl Index {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            estimated_size: None,
        }
    }

    /// Derived physical identifier used when the index is really created.
    pub fn physical_name(&self) -> String {
        format!("{}_{}_idx", self.table, self.columns.join("_"))
    }

    /// Column list in DDL form.
    pub fn joined_column_names(&self) -> String {
        self.columns.join(",")
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.table, self.columns.join(","))
    }
}

/// A range-partitioning candidate over a single column.
///
/// The boundary values live in the column's statistics; simulating the
/// partition before those are populated is a caller error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    pub table: String,
    pub column: Column,
}

impl Partition {
    pub fn new(table: impl Into<String>, column: Column) -> Self {
        Self {
            table: table.into(),
            column,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.table, self.column)
    }
}

/// One workload query: a sequential identifier plus raw text that may carry
/// auxiliary view definitions ahead of the terminal select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: u64,
    pub text: String,
}

impl Query {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Opaque identifier of a live hypothetical index.
///
/// Returned by `simulate_index` and required verbatim to drop the object; the
/// backend never hands out the same identifier for two concurrently-live
/// hypothetical indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulatedIndexHandle(u32);

impl SimulatedIndexHandle {
    pub fn new(oid: u32) -> Self {
        Self(oid)
    }

    pub fn as_oid(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SimulatedIndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_physical_name() {
        let index = Index::new(
            "lineitem",
            vec!["l_shipdate".to_string(), "l_partkey".to_string()],
        );
        assert_eq!(index.physical_name(), "lineitem_l_shipdate_l_partkey_idx");
        assert_eq!(index.joined_column_names(), "l_shipdate,l_partkey");
    }

    #[test]
    fn test_text_or_date_detection() {
        let mut column = Column::new("orders", "o_orderdate");
        assert!(!column.is_text_or_date());

        column.data_type = Some("date".to_string());
        assert!(column.is_text_or_date());

        column.data_type = Some("character varying".to_string());
        assert!(column.is_text_or_date());

        column.data_type = Some("timestamp without time zone".to_string());
        assert!(column.is_text_or_date());

        column.data_type = Some("integer".to_string());
        assert!(!column.is_text_or_date());
    }

    #[test]
    fn test_handle_display_roundtrip() {
        let handle = SimulatedIndexHandle::new(13543);
        assert_eq!(handle.to_string(), "13543");
        assert_eq!(handle.as_oid(), 13543);
    }
}
