//! # whatif-error
//!
//! Unified error types for the what-if physical-design evaluation layer.
//!
//! All errors carry:
//! - Numeric error codes (WHATIF-XXXX)
//! - Structured JSON context
//! - Actionable hints for the caller

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all evaluation-layer operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatifError {
    /// Numeric error code (e.g., "WHATIF-3001")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Actionable suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl WhatifError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add an actionable hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Whether the failure indicates corrupted simulated state.
    ///
    /// A fatal error signals a protocol bug (double-drop, stale handle, wrong
    /// table name) and the current evaluation round must be aborted instead
    /// of continuing with unreliable cost figures.
    pub fn is_fatal(&self) -> bool {
        self.code == ErrorCode::SimulationIntegrity
    }

    /// Whether the failure came from losing the connection mid-statement.
    ///
    /// Read-only fetches swallow these and return an empty result instead.
    pub fn is_transient(&self) -> bool {
        self.code == ErrorCode::ConnectionLost
    }

    /// Serialize to JSON for reporting surfaces
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize WhatifError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }

    /// Serialize to pretty JSON for logging
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

impl fmt::Display for WhatifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for WhatifError {}

/// Result type alias for evaluation-layer operations
pub type Result<T> = std::result::Result<T, WhatifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatif_error_builder() {
        let err = WhatifError::new(ErrorCode::StatisticsUnavailable, "No pg_stats row")
            .with_hint("Run create_statistics() first")
            .with_context(ErrorContext::Statistics {
                table: "orders".to_string(),
                column: "o_orderdate".to_string(),
            });

        assert_eq!(err.code, ErrorCode::StatisticsUnavailable);
        assert_eq!(err.message, "No pg_stats row");
        assert_eq!(err.hint, Some("Run create_statistics() first".to_string()));
        assert!(err.context.is_some());
    }

    #[test]
    fn test_display_implementation() {
        let err = WhatifError::new(ErrorCode::SyntaxError, "Unexpected token")
            .with_hint("Remove comma");

        // Should format as "[WHATIF-2001] Unexpected token (Hint: Remove comma)"
        assert_eq!(
            err.to_string(),
            "[WHATIF-2001] Unexpected token (Hint: Remove comma)"
        );

        let err_no_hint = WhatifError::new(ErrorCode::ConnectionClosed, "Session closed");
        assert_eq!(err_no_hint.to_string(), "[WHATIF-1002] Session closed");
    }

    #[test]
    fn test_fatal_and_transient_classification() {
        let fatal = WhatifError::new(ErrorCode::SimulationIntegrity, "phantom index");
        assert!(fatal.is_fatal());
        assert!(!fatal.is_transient());

        let transient = WhatifError::new(ErrorCode::ConnectionLost, "broken pipe");
        assert!(transient.is_transient());
        assert!(!transient.is_fatal());

        let plain = WhatifError::new(ErrorCode::ExecutionFailed, "division by zero");
        assert!(!plain.is_fatal());
        assert!(!plain.is_transient());
    }

    #[test]
    fn test_json_output() {
        let err = WhatifError::new(ErrorCode::PlanUnavailable, "Empty explain result");
        let json = err.to_json();

        assert!(json.contains("\"code\":\"WHATIF-2004\""));
        assert!(json.contains("\"message\":\"Empty explain result\""));
    }
}
