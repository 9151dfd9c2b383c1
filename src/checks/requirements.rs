#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scores the project's declared-dependencies manifest.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Check, CheckArgs, CheckContext, check_accessors};
use crate::{error::GraderError, project::REQUIREMENTS_FILENAME, score::normalize};

/// Version comparison operators accepted in a requirement specifier, longest
/// first so prefixes do not shadow them.
const OPERATORS: &[&str] = &["===", "==", "~=", "!=", ">=", "<=", ">", "<"];

/// Options accepted by the `requirements` check.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequirementsOptions {
    /// Manifest file name, relative to the project root.
    #[serde(default = "default_filename")]
    filename: String,
}

/// Default manifest name.
fn default_filename() -> String {
    REQUIREMENTS_FILENAME.to_string()
}

/// Checks that `requirements.txt` exists and is well formed.
pub struct RequirementsCheck {
    /// Shared check state.
    ctx:      CheckContext,
    /// Manifest file name.
    filename: String,
}

impl RequirementsCheck {
    /// Creates the check from factory arguments.
    pub fn new(args: CheckArgs) -> Result<Self, GraderError> {
        let options: RequirementsOptions = args.parse_options()?;
        Ok(Self {
            ctx:      args.context(),
            filename: options.filename,
        })
    }

    /// Reads the manifest and computes the score.
    async fn evaluate(&self) -> Result<u32> {
        let path = self.ctx.paths.root_dir().join(&self.filename);
        if !path.is_file() {
            bail!("No {} file found in the project directory", self.filename);
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?;

        let (valid, total) = tally(&contents);
        if total == 0 {
            tracing::info!("{} declares no dependencies", self.filename);
            return Ok(self.ctx.max_points);
        }

        let raw = valid as f64 * 100.0 / total as f64;
        tracing::debug!("{valid}/{total} requirement lines are well formed");
        Ok(normalize(raw, self.ctx.max_points))
    }
}

#[async_trait]
impl Check for RequirementsCheck {
    check_accessors!();

    async fn run(&self) -> u32 {
        self.ctx.finish(self.evaluate().await)
    }
}

/// Counts `(well_formed, total)` requirement lines, ignoring blanks and
/// comments.
fn tally(contents: &str) -> (usize, usize) {
    let mut valid = 0;
    let mut total = 0;
    for line in contents.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        total += 1;
        if is_well_formed(line) {
            valid += 1;
        } else {
            tracing::warn!("Malformed requirement line: {line}");
        }
    }
    (valid, total)
}

/// Drops a trailing `# comment`. Only a `#` at the start or after whitespace
/// starts a comment, so URL fragments survive.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let mut prev = None;
    for (idx, c) in line.char_indices() {
        if c == '#' && prev.is_some_and(char::is_whitespace) {
            return &line[..idx];
        }
        prev = Some(c);
    }
    line
}

/// True for a pip option line (`-r other.txt`, `--index-url ...`) or a
/// requirement specifier such as `requests[socks]>=2.0,<3; python_version>"3.8"`.
fn is_well_formed(line: &str) -> bool {
    if line.starts_with('-') {
        return line.len() > 1;
    }

    let spec = line.split(';').next().unwrap_or_default().trim();
    let name_end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(spec.len());
    let (name, mut rest) = spec.split_at(name_end);
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return false;
    }

    rest = rest.trim_start();
    if let Some(after) = rest.strip_prefix('[') {
        match after.split_once(']') {
            Some((extras, tail)) if extras.split(',').all(|e| is_identifier(e.trim())) => {
                rest = tail.trim_start();
            }
            _ => return false,
        }
    }

    if rest.is_empty() {
        return true;
    }
    if let Some(url) = rest.strip_prefix('@') {
        return !url.trim().is_empty();
    }

    rest.split(',').all(|clause| {
        let clause = clause.trim();
        OPERATORS
            .iter()
            .find_map(|op| clause.strip_prefix(op))
            .is_some_and(|version| is_version(version.trim()))
    })
}

/// Extras and distribution names.
fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Loose PEP 440 version (wildcards and local labels allowed).
fn is_version(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::{
        checks::testing::{ScriptedRunner, args},
        process::CommandOutput,
    };

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("pygrader-req-{tag}-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).expect("create temp root");
        root
    }

    fn check(root: &std::path::Path, options: serde_json::Value) -> RequirementsCheck {
        let runner = ScriptedRunner::new(|_| CommandOutput::ok(""));
        RequirementsCheck::new(args("requirements", root, 10, options, runner)).expect("construct")
    }

    #[test]
    fn recognises_common_specifiers() {
        for line in [
            "requests",
            "requests==2.31.0",
            "numpy>=1.20,<2",
            "uvicorn[standard]~=0.23",
            "pytest ; python_version > \"3.8\"",
            "mypkg @ git+https://example.com/mypkg.git#egg=mypkg",
            "-r dev-requirements.txt",
            "Django==4.*",
        ] {
            assert!(is_well_formed(line), "{line}");
        }
        for line in ["==1.0", "requests=>2", "foo[bar", "pkg >= ", "!!!"] {
            assert!(!is_well_formed(line), "{line}");
        }
    }

    #[test]
    fn comments_and_blanks_are_ignored() {
        let (valid, total) = tally("# deps\n\nrequests==2.0  # http\n   \npytest\n");
        assert_eq!((valid, total), (2, 2));
    }

    #[test]
    fn any_whitespace_before_hash_starts_a_comment() {
        assert_eq!(strip_comment("requests==2.0\t# http"), "requests==2.0\t");
        let url = "pkg @ https://host/p.zip#sha256=ab";
        assert_eq!(strip_comment(url), url);
        let (valid, total) = tally("requests==2.0\t# http\nnumpy>=1.20\u{a0}# sci\n");
        assert_eq!((valid, total), (2, 2));
    }

    #[tokio::test]
    async fn missing_manifest_scores_zero() {
        let root = temp_root("missing");
        assert_eq!(check(&root, json!({})).run().await, 0);
        let _ = fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn clean_manifest_scores_max() {
        let root = temp_root("clean");
        fs::write(root.join("requirements.txt"), "requests==2.31.0\npytest>=7\n").unwrap();
        assert_eq!(check(&root, json!({})).run().await, 10);
        let _ = fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn custom_filename_is_honoured() {
        let root = temp_root("custom");
        fs::write(root.join("deps.txt"), "requests\n").unwrap();
        let score = check(&root, json!({"filename": "deps.txt"})).run().await;
        assert_eq!(score, 10);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn unknown_option_is_rejected_at_construction() {
        let runner = ScriptedRunner::new(|_| CommandOutput::ok(""));
        let result = RequirementsCheck::new(args(
            "requirements",
            std::path::Path::new("."),
            10,
            json!({"strict": true}),
            runner,
        ));
        assert!(matches!(result, Err(GraderError::InvalidCheckOptions { .. })));
    }
}
