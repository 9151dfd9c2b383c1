//! # pygrader
//!
//! Grades Python projects. A JSON configuration lists the checks to run, each
//! with a point budget; checks that need the project's own dependencies run
//! inside a freshly built virtual environment. Every check reports an integer
//! score between 0 and its maximum.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// The check trait and its variants
pub mod checks;
/// Command-line interface
pub mod cli;
/// Locating and loading configuration
pub mod config;
/// Error types
pub mod error;
/// Building checks from configuration
pub mod factory;
/// The grading run
pub mod grade;
/// Tracing setup
pub mod logging;
/// Python source analysis
pub mod parser;
/// External process helpers
pub mod process;
/// Project layout conventions
pub mod project;
/// Aggregated results
pub mod report;
/// Score normalization
pub mod score;
/// Isolated environment lifecycle
pub mod venv;

pub use error::GraderError;
pub use grade::Grader;
pub use report::Report;
pub use score::{ScoreRecord, normalize};
