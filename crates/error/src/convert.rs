use crate::{ErrorCode, WhatifError};

/// SQLSTATE class for syntax errors and access-rule violations.
const SYNTAX_CLASS: &str = "42";
/// SQLSTATE raised when `statement_timeout` aborts a query.
const QUERY_CANCELED: &str = "57014";

impl From<tokio_postgres::Error> for WhatifError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db) = err.as_db_error() {
            let state = db.code().code();
            let code = if state == QUERY_CANCELED {
                ErrorCode::StatementTimeout
            } else if state.starts_with(SYNTAX_CLASS) {
                ErrorCode::SyntaxError
            } else {
                ErrorCode::ExecutionFailed
            };
            return WhatifError::new(code, db.message());
        }

        // No server-side SQLSTATE: the failure happened on the client or on
        // the wire, which callers may treat as transient for read-only fetches.
        let code = if err.is_closed() {
            ErrorCode::ConnectionClosed
        } else {
            ErrorCode::ConnectionLost
        };
        WhatifError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for WhatifError {
    fn from(err: serde_json::Error) -> Self {
        WhatifError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_mapping() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: WhatifError = json_err.into();
        assert_eq!(err.code, ErrorCode::SerializationFailed);
    }
}
