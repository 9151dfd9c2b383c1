#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Locating and loading the check configuration, plus environment-provided
//! runtime settings.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde_json::Value;

use crate::error::GraderError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "GRADER_CONFIG";
/// Environment variable overriding the interpreter used to create the venv.
pub const PYTHON_ENV_VAR: &str = "GRADER_PYTHON";
/// Environment variable holding the per-tool deadline in seconds.
pub const TIMEOUT_ENV_VAR: &str = "GRADER_TOOL_TIMEOUT_SECS";
/// Configuration used when nothing else is specified, relative to the
/// executable's directory or the working directory.
pub const DEFAULT_CONFIG: &str = "config/full.json";

/// Settings read from the environment once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Configuration file named by `GRADER_CONFIG`.
    config_path:  Option<PathBuf>,
    /// Interpreter named by `GRADER_PYTHON`.
    python:       Option<PathBuf>,
    /// Deadline from `GRADER_TOOL_TIMEOUT_SECS`.
    tool_timeout: Option<Duration>,
}

impl RuntimeConfig {
    /// Reads every setting from the process environment.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            config_path:  non_empty(CONFIG_ENV_VAR).map(PathBuf::from),
            python:       non_empty(PYTHON_ENV_VAR).map(PathBuf::from),
            tool_timeout: parse_timeout(non_empty(TIMEOUT_ENV_VAR)),
        }
    }

    /// Configuration file from the environment, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Interpreter override, if any.
    pub fn python(&self) -> Option<&Path> {
        self.python.as_deref()
    }

    /// Per-tool deadline; `None` means tools may run indefinitely.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout
    }
}

/// Parses a deadline in whole seconds. Zero, negative and malformed values
/// mean no deadline.
fn parse_timeout(val: Option<String>) -> Option<Duration> {
    let secs = val?.trim().parse::<u64>().ok()?;
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// Picks the configuration file to load.
///
/// Order: `explicit` (the `--config` flag), then the environment, then
/// [`DEFAULT_CONFIG`] next to the executable, then in the working directory.
/// An explicit or environment path that does not exist is a fault; it is
/// never silently replaced by a default.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    runtime: &RuntimeConfig,
) -> Result<PathBuf, GraderError> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let defaults: Vec<PathBuf> = exe_dir
        .into_iter()
        .chain(std::env::current_dir().ok())
        .map(|dir| dir.join(DEFAULT_CONFIG))
        .collect();

    resolve_from(explicit.or(runtime.config_path()), &defaults)
}

/// [`resolve_config_path`] over an explicit choice and a list of fallbacks.
fn resolve_from(chosen: Option<&Path>, defaults: &[PathBuf]) -> Result<PathBuf, GraderError> {
    if let Some(path) = chosen {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(GraderError::ConfigNotFound {
                tried: Some(path.to_path_buf()),
            })
        };
    }

    defaults
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or(GraderError::ConfigNotFound { tried: None })
}

/// Reads and parses a configuration file. Structural validation happens in
/// the factory.
pub fn load_config(path: &Path) -> Result<Value, GraderError> {
    tracing::debug!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&contents)?;
    Ok(config)
}
