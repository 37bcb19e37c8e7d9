//! Execution plan trees as returned by the backend's structured explain form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use whatif_error::{ErrorCode, Result, WhatifError};

/// One node of an execution plan.
///
/// Maps PostgreSQL `EXPLAIN (FORMAT JSON)` output: every node carries a total
/// cost, nodes from real execution additionally carry actual timing, and the
/// remaining per-node properties are kept verbatim in `properties`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,

    #[serde(rename = "Total Cost")]
    pub total_cost: f64,

    /// Present only when the plan came from an `analyze` run.
    #[serde(
        rename = "Actual Total Time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub actual_total_time: Option<f64>,

    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,

    /// Everything else the backend reported for this node.
    #[serde(flatten)]
    pub properties: serde_json::Map<String, Value>,
}

impl PlanNode {
    /// Extract the root plan node from a full explain document
    /// (`[{"Plan": {...}, ...}]`).
    pub fn from_explain_document(document: &Value) -> Result<Self> {
        let root = document
            .get(0)
            .and_then(|entry| entry.get("Plan"))
            .ok_or_else(|| {
                WhatifError::new(
                    ErrorCode::PlanUnavailable,
                    "explain document carries no root plan node",
                )
            })?;
        Ok(serde_json::from_value(root.clone())?)
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PlanNode::node_count).sum::<usize>()
    }
}
