use thiserror::Error;

use crate::validation::ValidationIssue;
use crate::workflow::WorkflowState;

/// Error type that captures failures around budget requests.
///
/// The progressive calculator itself never fails; these errors come from
/// persistence, configuration, form mutations and workflow transitions.
#[derive(Debug, Error)]
pub enum VirementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transfer row {row} out of range ({len} rows)")]
    RowOutOfRange { row: usize, len: usize },
    #[error("Validation failed: {}", describe_issues(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("Transition from {from} to {to} denied: {reason}")]
    TransitionDenied {
        from: WorkflowState,
        to: WorkflowState,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, VirementError>;

fn describe_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
