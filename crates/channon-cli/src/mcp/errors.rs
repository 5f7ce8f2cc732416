//! Error handling utilities for MCP server

use channon_core::ChannonError;
use rmcp::ErrorData;

/// Converts a store error into an MCP error.
///
/// Errors caused by the request itself (unknown names, conflicts, invalid
/// values) become `invalid_params`; everything else is an internal error.
pub fn to_mcp_error(message: &str, error: &ChannonError) -> ErrorData {
    let text = format!("{message}: {error}");
    match error {
        ChannonError::NameConflict { .. }
        | ChannonError::PlanNotFound { .. }
        | ChannonError::RunNotFound { .. }
        | ChannonError::InvalidInput { .. } => ErrorData::invalid_params(text, None),
        _ => ErrorData::internal_error(text, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_request_errors_are_invalid_params() {
        let err = to_mcp_error(
            "Failed to get run",
            &ChannonError::RunNotFound {
                plan: "deploy".to_string(),
                id: 4,
            },
        );
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "Failed to get run: Run 4 of plan 'deploy' not found");
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = to_mcp_error(
            "Failed to add plan",
            &ChannonError::Configuration {
                message: "plan registry lock poisoned".to_string(),
            },
        );
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }
}
