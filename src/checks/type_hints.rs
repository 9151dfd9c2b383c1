#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scores how much of the project's function signatures carry type hints.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Check, CheckArgs, CheckContext, check_accessors};
use crate::{
    error::GraderError,
    parser::Parser,
    project::{non_test_sources, python_sources},
    score::normalize,
};

/// Options accepted by the `type-hints` check.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeHintsOptions {
    /// Also count signatures in test modules.
    #[serde(default)]
    include_tests: bool,
}

/// Running totals over all scanned files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct HintTotals {
    /// Annotatable slots seen.
    slots:     usize,
    /// Annotated slots seen.
    annotated: usize,
}

/// Parses every source file and counts annotated parameters and returns.
pub struct TypeHintsCheck {
    /// Shared check state.
    ctx:           CheckContext,
    /// Whether test modules are scanned too.
    include_tests: bool,
}

impl TypeHintsCheck {
    /// Creates the check from factory arguments.
    pub fn new(args: CheckArgs) -> Result<Self, GraderError> {
        let options: TypeHintsOptions = args.parse_options()?;
        Ok(Self {
            ctx:           args.context(),
            include_tests: options.include_tests,
        })
    }

    /// Scans the sources and computes the score.
    async fn evaluate(&self) -> Result<u32> {
        let sources = if self.include_tests {
            python_sources(self.ctx.paths.root_dir())
        } else {
            non_test_sources(&self.ctx.paths)
        };

        let mut totals = HintTotals::default();
        for path in &sources {
            match scan_file(path).await {
                Ok(file_totals) => {
                    totals.slots += file_totals.slots;
                    totals.annotated += file_totals.annotated;
                }
                Err(err) => tracing::warn!("Skipping {}: {err:#}", path.display()),
            }
        }

        if totals.slots == 0 {
            tracing::info!("No function signatures to check for type hints");
            return Ok(self.ctx.max_points);
        }

        let raw = totals.annotated as f64 * 100.0 / totals.slots as f64;
        tracing::debug!(
            "{}/{} signature slots are annotated ({raw:.1}%)",
            totals.annotated,
            totals.slots
        );
        Ok(normalize(raw, self.ctx.max_points))
    }
}

#[async_trait]
impl Check for TypeHintsCheck {
    check_accessors!();

    async fn run(&self) -> u32 {
        self.ctx.finish(self.evaluate().await)
    }
}

/// Counts annotation slots in one file.
async fn scan_file(path: &Path) -> Result<HintTotals> {
    let code = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    let parser = Parser::new(code)?;
    if parser.has_errors() {
        tracing::debug!("{} has syntax errors, counting what parsed", path.display());
    }

    Ok(parser
        .function_hints()?
        .iter()
        .fold(HintTotals::default(), |acc, f| HintTotals {
            slots:     acc.slots + f.slots(),
            annotated: acc.annotated + f.annotated_slots(),
        }))
}
