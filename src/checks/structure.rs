#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scores how closely the project layout follows an expected structure.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use serde::Deserialize;

use super::{Check, CheckArgs, CheckContext, check_accessors};
use crate::{error::GraderError, score::normalize};

/// Options accepted by the `structure` check. Exactly one of
/// `structure_file` and `required` must be given.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StructureOptions {
    /// JSON file holding a [`StructureSpec`].
    #[serde(default)]
    structure_file: Option<PathBuf>,
    /// Inline list of required patterns.
    #[serde(default)]
    required:       Option<Vec<String>>,
    /// Whether pattern matching is case sensitive.
    #[serde(default = "default_case_sensitive")]
    case_sensitive: bool,
}

/// Serde default for [`StructureOptions::case_sensitive`].
fn default_case_sensitive() -> bool {
    true
}

/// Contents of a structure file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureSpec {
    /// Glob patterns, relative to the project root, that must each match at
    /// least one path. A trailing `/` requires a directory.
    pub required: Vec<String>,
}

/// Checks required files and directories against glob patterns.
pub struct StructureCheck {
    /// Shared check state.
    ctx:            CheckContext,
    /// Patterns that must match.
    required:       Vec<String>,
    /// Whether matching is case sensitive.
    case_sensitive: bool,
}

impl StructureCheck {
    /// Creates the check from factory arguments. The expected structure is
    /// loaded here, so a missing or malformed structure file fails before any
    /// check runs.
    pub fn new(args: CheckArgs) -> Result<Self, GraderError> {
        let options: StructureOptions = args.parse_options()?;
        let invalid = |message: String| GraderError::InvalidCheckOptions {
            check: args.name.clone(),
            message,
        };

        let required = match (options.structure_file, options.required) {
            (Some(file), None) => load_spec(&file).map_err(invalid)?.required,
            (None, Some(required)) => required,
            (Some(_), Some(_)) => {
                return Err(invalid(
                    "`structure_file` and `required` are mutually exclusive".to_string(),
                ));
            }
            (None, None) => {
                return Err(invalid(
                    "missing required option `structure_file` (or inline `required`)".to_string(),
                ));
            }
        };

        for pattern in &required {
            Pattern::new(pattern.trim_end_matches('/'))
                .map_err(|err| invalid(format!("bad pattern `{pattern}`: {err}")))?;
        }

        Ok(Self {
            ctx: args.context(),
            required,
            case_sensitive: options.case_sensitive,
        })
    }

    /// True if `pattern` matches at least one path under the project root.
    fn matches(&self, pattern: &str) -> bool {
        let want_dir = pattern.ends_with('/');
        let root = Pattern::escape(&self.ctx.paths.root_dir().to_string_lossy());
        let full = format!("{root}/{}", pattern.trim_end_matches('/'));
        let options = MatchOptions {
            case_sensitive:              self.case_sensitive,
            require_literal_separator:   true,
            require_literal_leading_dot: false,
        };

        match glob::glob_with(&full, options) {
            Ok(paths) => paths
                .filter_map(|p| p.ok())
                .any(|p| !want_dir || p.is_dir()),
            Err(err) => {
                tracing::warn!("Skipping pattern {pattern}: {err}");
                false
            }
        }
    }

    /// Matches every pattern and computes the score.
    async fn evaluate(&self) -> Result<u32> {
        if self.required.is_empty() {
            return Ok(self.ctx.max_points);
        }

        let mut matched = 0;
        for pattern in &self.required {
            if self.matches(pattern) {
                matched += 1;
            } else {
                tracing::info!("Expected path not found: {pattern}");
            }
        }

        let raw = matched as f64 * 100.0 / self.required.len() as f64;
        Ok(normalize(raw, self.ctx.max_points))
    }
}

#[async_trait]
impl Check for StructureCheck {
    check_accessors!();

    async fn run(&self) -> u32 {
        self.ctx.finish(self.evaluate().await)
    }
}

/// Reads a structure file.
fn load_spec(path: &Path) -> Result<StructureSpec, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| format!("could not read {}: {err}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|err| format!("could not parse {}: {err}", path.display()))
}
