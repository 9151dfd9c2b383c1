#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Console and log-file tracing setup.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Log file used when no student id is given.
pub const DEFAULT_LOG_FILE: &str = "grader.log";

/// `<student_id>.log`, or [`DEFAULT_LOG_FILE`].
pub fn log_file_name(student_id: Option<&str>) -> PathBuf {
    match student_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => PathBuf::from(format!("{id}.log")),
        None => PathBuf::from(DEFAULT_LOG_FILE),
    }
}

/// Maps the number of `-v` flags to a level.
pub fn level_for(verbosity: usize) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber: a terminal layer and a plain-text layer
/// writing to `log_file` (truncated).
pub fn init(verbosity: usize, log_file: &Path) -> Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("Could not create log file {}", log_file.display()))?;

    let console = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file));
    let filter_layer = LevelFilter::from_level(level_for(verbosity));

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(filter_layer)
        .try_init()
        .context("Could not install the tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_follows_student_id() {
        assert_eq!(log_file_name(Some("s123")), PathBuf::from("s123.log"));
        assert_eq!(log_file_name(Some("  ")), PathBuf::from("grader.log"));
        assert_eq!(log_file_name(None), PathBuf::from("grader.log"));
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), Level::INFO);
        assert_eq!(level_for(1), Level::DEBUG);
        assert_eq!(level_for(4), Level::TRACE);
    }
}
