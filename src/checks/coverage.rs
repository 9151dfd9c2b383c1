#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scores the project by the line coverage of its own test suite.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Check, CheckArgs, CheckContext, check_accessors};
use crate::{
    error::GraderError,
    process::CommandCall,
    project::non_test_sources,
    score::normalize,
};

/// The coverage check takes no options beyond the common ones.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoverageOptions {}

/// Two-stage check: `coverage run -m pytest`, then `coverage report`.
pub struct CoverageCheck {
    /// Shared check state.
    ctx: CheckContext,
}

impl CoverageCheck {
    /// Creates the check from factory arguments.
    pub fn new(args: CheckArgs) -> Result<Self, GraderError> {
        let _: CoverageOptions = args.parse_options()?;
        Ok(Self { ctx: args.context() })
    }

    /// Stage one: run the test suite under coverage.
    fn run_command(&self) -> CommandCall {
        let root = self.ctx.paths.root_dir();
        CommandCall::new(self.ctx.tool("coverage"))
            .args(["run", "-m", "pytest"])
            .arg(root)
            .current_dir(root)
    }

    /// Stage two: total percentage over the non-test sources.
    fn report_command(&self) -> CommandCall {
        CommandCall::new(self.ctx.tool("coverage"))
            .args(["report", "--format=total"])
            .args(non_test_sources(&self.ctx.paths))
            .current_dir(self.ctx.paths.root_dir())
    }

    /// Runs both stages and computes the score.
    async fn evaluate(&self) -> Result<u32> {
        let run = self.ctx.runner.run(self.run_command()).await;
        if !run.success() {
            bail!("Coverage run failed");
        }

        let report = self.ctx.runner.run(self.report_command()).await;
        if !report.success() {
            bail!("Coverage report failed");
        }

        let percent = report
            .stdout
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Unexpected coverage total: {:?}", report.stdout.trim()))?;
        tracing::debug!("Coverage total: {percent}%");

        Ok(normalize(percent, self.ctx.max_points))
    }
}

#[async_trait]
impl Check for CoverageCheck {
    check_accessors!();

    async fn run(&self) -> u32 {
        self.ctx.finish(self.evaluate().await)
    }
}
