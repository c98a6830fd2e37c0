//! Error types for telemetry-plan

use telemetry_context::ValidationIssue;

/// Result type for telemetry-plan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a deployment plan
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The context failed error-level validation
    #[error("Context is not deployable: {} error(s), first: {}", .issues.len(), first_issue(.issues))]
    Invalid { issues: Vec<ValidationIssue> },

    /// Error from telemetry-context
    #[error(transparent)]
    Context(#[from] telemetry_context::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn first_issue(issues: &[ValidationIssue]) -> String {
    issues
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}
