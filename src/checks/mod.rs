#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The check abstraction and its concrete variants.

/// Test coverage via `coverage run -m pytest`.
pub mod coverage;
/// Lint rating via pylint.
pub mod pylint;
/// Dependency manifest hygiene.
pub mod requirements;
/// Directory layout conformance.
pub mod structure;
/// Type-hint coverage of function signatures.
pub mod type_hints;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use coverage::CoverageCheck;
pub use pylint::PylintCheck;
pub use requirements::RequirementsCheck;
pub use structure::StructureCheck;
pub use type_hints::TypeHintsCheck;

use crate::{error::GraderError, process::CommandRunner, project::ProjectPaths};

/// One independent unit of project evaluation.
#[async_trait]
pub trait Check: Send + Sync {
    /// Unique name of this check within a run.
    fn name(&self) -> &str;

    /// Upper bound of the score [`Check::run`] can return.
    fn max_points(&self) -> u32;

    /// Whether this check must run inside the project's isolated environment.
    fn is_isolated(&self) -> bool;

    /// Evaluates the project. Tool failures are logged and yield 0; the
    /// result is always within `0..=max_points`.
    async fn run(&self) -> u32;
}

/// Everything a check constructor receives from the factory.
pub struct CheckArgs {
    /// Check name, as written in the configuration.
    pub name:             String,
    /// Project under evaluation.
    pub project_root:     PathBuf,
    /// Maximum points for this check.
    pub max_points:       u32,
    /// Whether the check runs inside the isolated environment.
    pub is_venv_required: bool,
    /// Remaining configuration keys, forwarded verbatim.
    pub options:          Map<String, Value>,
    /// How the check invokes external tools.
    pub runner:           Arc<dyn CommandRunner>,
}

impl CheckArgs {
    /// Deserializes the forwarded keys into a variant's option struct.
    ///
    /// Option structs use `deny_unknown_fields`, so stray keys fail here
    /// rather than being silently ignored.
    pub fn parse_options<T: DeserializeOwned>(&self) -> Result<T, GraderError> {
        serde_json::from_value(Value::Object(self.options.clone())).map_err(|err| {
            GraderError::InvalidCheckOptions {
                check:   self.name.clone(),
                message: err.to_string(),
            }
        })
    }

    /// Splits off the state shared by every variant.
    pub fn context(&self) -> CheckContext {
        CheckContext {
            name:       self.name.clone(),
            max_points: self.max_points,
            paths:      ProjectPaths::new(self.project_root.clone()),
            isolated:   self.is_venv_required,
            runner:     Arc::clone(&self.runner),
        }
    }
}

/// State common to all check variants.
#[derive(Clone)]
pub struct CheckContext {
    /// Check name.
    pub name:       String,
    /// Maximum points.
    pub max_points: u32,
    /// Project layout.
    pub paths:      ProjectPaths,
    /// Whether the check runs in the isolated environment.
    pub isolated:   bool,
    /// External tool runner.
    pub runner:     Arc<dyn CommandRunner>,
}

impl CheckContext {
    /// Resolves the executable for `tool`, honouring isolation.
    pub fn tool(&self, tool: &str) -> PathBuf {
        crate::project::tool_path(&self.paths, tool, self.isolated)
    }

    /// Turns the outcome of a check body into its final score.
    ///
    /// Errors are logged and become 0; scores are clamped to `max_points`.
    pub fn finish(&self, outcome: Result<u32>) -> u32 {
        match outcome {
            Ok(score) if score > self.max_points => {
                tracing::warn!(
                    "{} produced {score}, above its maximum of {}",
                    self.name,
                    self.max_points
                );
                self.max_points
            }
            Ok(score) => score,
            Err(err) => {
                tracing::error!("{err:#}");
                0
            }
        }
    }
}

/// Implements the accessor half of [`Check`] for a struct holding a
/// `ctx: CheckContext` field.
macro_rules! check_accessors {
    () => {
        fn name(&self) -> &str {
            &self.ctx.name
        }

        fn max_points(&self) -> u32 {
            self.ctx.max_points
        }

        fn is_isolated(&self) -> bool {
            self.ctx.isolated
        }
    };
}

pub(crate) use check_accessors;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted tool runner shared by check tests.

    use std::{
        path::Path,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::CheckArgs;
    use crate::process::{CommandCall, CommandOutput, CommandRunner};

    /// Returns outputs chosen by a closure and records every call.
    pub struct ScriptedRunner {
        /// Picks the output for a call.
        script: Box<dyn Fn(&CommandCall) -> CommandOutput + Send + Sync>,
        /// Calls seen so far.
        pub calls: Mutex<Vec<CommandCall>>,
    }

    impl ScriptedRunner {
        /// Creates a runner answering with `script`.
        pub fn new(
            script: impl Fn(&CommandCall) -> CommandOutput + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Box::new(script),
                calls:  Mutex::new(Vec::new()),
            })
        }

        /// Snapshot of the recorded calls.
        pub fn calls(&self) -> Vec<CommandCall> {
            self.calls.lock().expect("calls poisoned").clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, call: CommandCall) -> CommandOutput {
            let output = (self.script)(&call);
            self.calls.lock().expect("calls poisoned").push(call);
            output
        }
    }

    /// Builds constructor arguments for tests.
    pub fn args(
        name: &str,
        root: &Path,
        max_points: u32,
        options: Value,
        runner: Arc<dyn CommandRunner>,
    ) -> CheckArgs {
        let options = match options {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        CheckArgs {
            name: name.to_string(),
            project_root: root.to_path_buf(),
            max_points,
            is_venv_required: false,
            options,
            runner,
        }
    }
}
