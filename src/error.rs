use thiserror::Error;

use crate::validate::ValidationReport;

/// Errors from compiling a document. Validation problems are reported through
/// [`ValidationReport`] and only surface here when compilation has to stop.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A document section failed validation; the report carries every error found.
    #[error("{section} validation failed with {} error(s)", .report.errors.len())]
    InvalidDocument {
        section: String,
        report: ValidationReport,
    },
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
