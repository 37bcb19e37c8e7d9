//! # Error Contexts
//!
//! Structured metadata for errors to enable programmatic analysis by the
//! selection algorithm driving the evaluation.

use serde::{Deserialize, Serialize};

/// Structured context attached to an error.
///
/// Each variant provides specific fields relevant to that error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for workload execution failures (WHATIF-2002, 2003, 2004)
    Query {
        /// Sequential identifier of the offending workload query
        query_id: u64,
    },

    /// Context for simulation errors (WHATIF-3001, 3002)
    Simulation {
        table: Option<String>,
        /// Handle of the hypothetical object, when one was involved
        handle: Option<String>,
    },

    /// Context for statistics errors (WHATIF-3003, 4001, 4002)
    Statistics { table: String, column: String },

    /// Context for connection errors (WHATIF-1001..1004)
    Connection { database: String },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_context_serde_roundtrip() {
        let ctx = ErrorContext::Statistics {
            table: "lineitem".to_string(),
            column: "l_shipdate".to_string(),
        };

        let json = serde_json::to_string(&ctx).unwrap();
        let de: ErrorContext = serde_json::from_str(&json).unwrap();

        match de {
            ErrorContext::Statistics { table, column } => {
                assert_eq!(table, "lineitem");
                assert_eq!(column, "l_shipdate");
            }
            _ => panic!("Wrong variant"),
        }
    }
}
