use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following WHATIF-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Connection/session errors
/// - **2000-2999**: Query execution errors
/// - **3000-3999**: Simulation errors (hypothetical indexes/partitions)
/// - **4000-4999**: Statistics/catalog errors
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions (semver contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Connection Errors (1000-1999) ===
    /// WHATIF-1001: Could not open the database session
    ConnectionFailed = 1001,
    /// WHATIF-1002: Operation issued after the session was closed
    ConnectionClosed = 1002,
    /// WHATIF-1003: Connection lost mid-statement (no server error code)
    ConnectionLost = 1003,
    /// WHATIF-1004: Invalid connection string
    InvalidConnectionString = 1004,

    // === Execution Errors (2000-2999) ===
    /// WHATIF-2001: SQL syntax error reported by the backend
    SyntaxError = 2001,
    /// WHATIF-2002: Statement failed during execution
    ExecutionFailed = 2002,
    /// WHATIF-2003: Statement aborted by the configured statement timeout
    StatementTimeout = 2003,
    /// WHATIF-2004: Backend returned no plan for the query
    PlanUnavailable = 2004,
    /// WHATIF-2005: Workload text contains no terminal select statement
    MissingSelect = 2005,

    // === Simulation Errors (3000-3999) ===
    /// WHATIF-3001: A hypothetical object could not be dropped or reset
    SimulationIntegrity = 3001,
    /// WHATIF-3002: Hypothetical-object extension absent or returned nothing
    SimulationUnavailable = 3002,
    /// WHATIF-3003: Partition simulated before its column statistics exist
    StatisticsMissing = 3003,

    // === Statistics Errors (4000-4999) ===
    /// WHATIF-4001: No catalog distribution statistics for the column
    StatisticsUnavailable = 4001,
    /// WHATIF-4002: Column type could not be resolved from the catalog
    TypeUnresolved = 4002,

    // === Internal Errors (5000-5999) ===
    /// WHATIF-5001: Serialization/deserialization failed
    SerializationFailed = 5001,
    /// WHATIF-5002: Capability not implemented for this database system
    NotImplemented = 5002,

    /// WHATIF-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "WHATIF-3001")
    pub fn as_str(&self) -> String {
        format!("WHATIF-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Execution,
            3000..=3999 => ErrorCategory::Simulation,
            4000..=4999 => ErrorCategory::Statistics,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        // Parse "WHATIF-XXXX" format
        let num: u16 = s
            .strip_prefix("WHATIF-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::ConnectionFailed),
            1002 => Ok(Self::ConnectionClosed),
            1003 => Ok(Self::ConnectionLost),
            1004 => Ok(Self::InvalidConnectionString),
            2001 => Ok(Self::SyntaxError),
            2002 => Ok(Self::ExecutionFailed),
            2003 => Ok(Self::StatementTimeout),
            2004 => Ok(Self::PlanUnavailable),
            2005 => Ok(Self::MissingSelect),
            3001 => Ok(Self::SimulationIntegrity),
            3002 => Ok(Self::SimulationUnavailable),
            3003 => Ok(Self::StatisticsMissing),
            4001 => Ok(Self::StatisticsUnavailable),
            4002 => Ok(Self::TypeUnresolved),
            5001 => Ok(Self::SerializationFailed),
            5002 => Ok(Self::NotImplemented),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category for caller-side handling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Connection,
    Execution,
    Simulation,
    Statistics,
    Internal,
}
