#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Fault taxonomy for a grading run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort (or, for isolation, degrade) a grading run.
#[derive(Error, Debug)]
pub enum GraderError {
    /// The configuration document is malformed or incomplete.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No configuration file could be resolved.
    #[error("No configuration file provided")]
    ConfigNotFound {
        /// The path that was tried, if one was given explicitly.
        tried: Option<PathBuf>,
    },

    /// A configuration entry names a check nobody registered.
    #[error("Unknown check name: {0}")]
    UnknownCheck(String),

    /// A check rejected the options forwarded from its configuration entry.
    #[error("Invalid options for check `{check}`: {message}")]
    InvalidCheckOptions {
        /// Name of the check being constructed.
        check:   String,
        /// Why construction failed.
        message: String,
    },

    /// The project root does not exist or is not a directory.
    #[error("Invalid project path '{}'", .0.display())]
    ProjectNotFound(PathBuf),

    /// The isolated environment could not be provisioned.
    #[error("Could not set up isolated environment at {}: {message}", .path.display())]
    EnvironmentSetup {
        /// Environment directory being provisioned.
        path:    PathBuf,
        /// What went wrong.
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraderError {
    /// True for faults raised while validating configuration, before any check
    /// was constructed or run.
    pub fn is_config_fault(&self) -> bool {
        matches!(
            self,
            GraderError::Config(_)
                | GraderError::ConfigNotFound { .. }
                | GraderError::InvalidCheckOptions { .. }
                | GraderError::Json(_)
        )
    }
}
