#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scores the project by its pylint rating.

use std::path::PathBuf;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Check, CheckArgs, CheckContext, check_accessors};
use crate::{
    error::GraderError,
    process::CommandCall,
    project::python_sources,
    score::{RAW_METRIC_MAX, normalize},
};

/// Exit status bits pylint uses for "fatal message issued" and "usage error".
/// Any other bits only describe which message categories were emitted.
const FATAL_STATUS_BITS: i32 = 1 | 32;

/// Text preceding the rating in pylint's report.
const RATING_MARKER: &str = "rated at ";

/// Options accepted by the `pylint` check.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PylintOptions {
    /// Custom pylintrc, relative to the project root.
    #[serde(default)]
    rcfile: Option<PathBuf>,
}

/// Runs pylint over every project source and maps its `x/10` rating.
pub struct PylintCheck {
    /// Shared check state.
    ctx:    CheckContext,
    /// Optional pylintrc.
    rcfile: Option<PathBuf>,
}

impl PylintCheck {
    /// Creates the check from factory arguments.
    pub fn new(args: CheckArgs) -> Result<Self, GraderError> {
        let options: PylintOptions = args.parse_options()?;
        Ok(Self {
            ctx:    args.context(),
            rcfile: options.rcfile,
        })
    }

    /// Builds the pylint invocation.
    fn command(&self, sources: Vec<PathBuf>) -> CommandCall {
        let mut call = CommandCall::new(self.ctx.tool("pylint"))
            .current_dir(self.ctx.paths.root_dir());
        if let Some(rcfile) = &self.rcfile {
            let rcfile = self.ctx.paths.root_dir().join(rcfile);
            call = call.arg(format!("--rcfile={}", rcfile.display()));
        }
        call.args(sources)
    }

    /// Runs pylint and computes the score.
    async fn evaluate(&self) -> Result<u32> {
        let sources = python_sources(self.ctx.paths.root_dir());
        if sources.is_empty() {
            bail!("No Python files found for pylint");
        }

        let output = self.ctx.runner.run(self.command(sources)).await;
        if output.status < 0 || output.status & FATAL_STATUS_BITS != 0 {
            bail!("Pylint run failed");
        }

        let Some(rating) = parse_rating(&output.stdout) else {
            bail!("Could not find a rating in pylint output");
        };
        tracing::debug!("Pylint rating: {rating:.2}/10");

        let raw = (rating * 10.0).clamp(0.0, RAW_METRIC_MAX);
        Ok(normalize(raw, self.ctx.max_points))
    }
}

#[async_trait]
impl Check for PylintCheck {
    check_accessors!();

    async fn run(&self) -> u32 {
        self.ctx.finish(self.evaluate().await)
    }
}

/// Extracts `x` from `Your code has been rated at x/10`.
fn parse_rating(stdout: &str) -> Option<f64> {
    stdout.lines().rev().find_map(|line| {
        let (_, after) = line.split_once(RATING_MARKER)?;
        let (value, _) = after.split_once('/')?;
        value.trim().parse::<f64>().ok()
    })
}
