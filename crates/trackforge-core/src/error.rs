//! Error types for Trackforge

use thiserror::Error;

/// The main error type for Trackforge operations
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid spacing group: {0}")]
    InvalidSpacingGroup(String),

    #[error("Iteration guard tripped: {0}")]
    RunawayGuard(String),

    #[error("Hash method mismatch: registry uses {stored:?}, track uses {requested:?}")]
    HashMethodMismatch {
        stored: crate::HashMethod,
        requested: crate::HashMethod,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Build error: {0}")]
    BuildError(String),
}

/// Result type alias for Trackforge operations
pub type Result<T> = std::result::Result<T, TrackError>;
