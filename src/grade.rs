#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The grading run: build the checks, run the non-isolated ones, then run the
//! isolated ones inside a freshly provisioned environment.

use std::{path::PathBuf, sync::Arc};

use bon::Builder;
use serde_json::Value;

use crate::{
    checks::Check,
    error::GraderError,
    factory::CheckRegistry,
    process::{CommandRunner, ProcessRunner},
    report::Report,
    score::ScoreRecord,
    venv::VirtualEnvironment,
};

/// One grading run over one project.
///
/// ```no_run
/// # async fn demo(config: serde_json::Value) -> Result<(), pygrader::error::GraderError> {
/// let report = pygrader::grade::Grader::builder()
///     .project_root("sample_dir")
///     .config(config)
///     .build()
///     .run()
///     .await?;
/// print!("{report}");
/// # Ok(())
/// # }
/// ```
#[derive(Builder)]
pub struct Grader {
    /// Project under evaluation.
    #[builder(into)]
    project_root: PathBuf,
    /// Parsed configuration document.
    config:       Value,
    /// How checks and the environment manager invoke tools.
    #[builder(default = Arc::new(ProcessRunner::default()) as Arc<dyn CommandRunner>)]
    runner:       Arc<dyn CommandRunner>,
    /// Known check variants.
    #[builder(default)]
    registry:     CheckRegistry,
    /// Delete the isolated environment after the run.
    #[builder(default)]
    clean_venv:   bool,
    /// Interpreter used to create the isolated environment.
    #[builder(into)]
    python:       Option<PathBuf>,
}

impl Grader {
    /// Runs every configured check and returns the records in execution
    /// order.
    ///
    /// Configuration faults abort the run before any check starts. A failure
    /// to provision the isolated environment does not: each isolated check is
    /// recorded with a score of 0 instead.
    pub async fn run(&self) -> Result<Report, GraderError> {
        let plan = self.registry.create_checks(
            &self.config,
            &self.project_root,
            Arc::clone(&self.runner),
        )?;
        tracing::debug!(
            "{} non-isolated and {} isolated checks",
            plan.non_isolated.len(),
            plan.isolated.len()
        );

        let mut report = Report::default();
        for check in &plan.non_isolated {
            report.push(run_check(check.as_ref()).await);
        }

        let mut env = VirtualEnvironment::new(&self.project_root, Arc::clone(&self.runner))
            .with_cleanup(self.clean_venv);
        if let Some(python) = &self.python {
            env = env.with_python(python);
        }

        match env.setup().await {
            Ok(active) => {
                tracing::debug!("Running isolated checks in {}", active.path().display());
                for check in &plan.isolated {
                    report.push(run_check(check.as_ref()).await);
                }
            }
            Err(err) => {
                tracing::error!("isolated checks could not run: {err}");
                for check in &plan.isolated {
                    report.push(ScoreRecord::new(check.name(), 0, check.max_points()));
                }
            }
        }

        Ok(report)
    }
}

/// Runs one check and records its result.
async fn run_check(check: &dyn Check) -> ScoreRecord {
    tracing::info!("Running check: {}", check.name());
    let score = check.run().await;
    tracing::debug!("{} scored {score}/{}", check.name(), check.max_points());
    ScoreRecord::new(check.name(), score, check.max_points())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::{checks::testing::ScriptedRunner, process::CommandOutput};

    fn project() -> PathBuf {
        let root = std::env::temp_dir().join(format!("pygrader-grade-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("requirements.txt"), "requests==2.31.0\n").unwrap();
        fs::write(root.join("main.py"), "def f(a: int) -> int:\n    return a\n").unwrap();
        root
    }

    fn config() -> Value {
        json!({"checks": [
            {"name": "coverage", "max_points": 8, "is_venv_required": true},
            {"name": "requirements", "max_points": 10},
            {"name": "type-hints", "max_points": 8},
        ]})
    }

    #[tokio::test]
    async fn non_isolated_records_come_first() {
        let root = project();
        let runner = ScriptedRunner::new(|call| {
            if call.has_arg("report") {
                CommandOutput::ok("100\n")
            } else {
                CommandOutput::ok("")
            }
        });
        let report = Grader::builder()
            .project_root(&root)
            .config(config())
            .runner(runner.clone())
            .python("python3")
            .build()
            .run()
            .await
            .expect("run");

        let names: Vec<_> = report.records().iter().map(|r| r.check_name()).collect();
        assert_eq!(names, ["requirements", "type-hints", "coverage"]);
        assert_eq!(report.total(), (26, 26));

        // venv creation precedes the first coverage invocation
        let calls = runner.calls();
        let venv = calls.iter().position(|c| c.has_arg("venv")).expect("venv");
        let coverage = calls
            .iter()
            .position(|c| c.has_arg("run") && c.has_arg("pytest"))
            .expect("coverage run");
        assert!(venv < coverage);
        let _ = fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn setup_failure_zeroes_isolated_checks_only() {
        let root = project();
        let runner = ScriptedRunner::new(|call| {
            if call.has_arg("install") {
                CommandOutput::failed(1, "network unreachable")
            } else {
                CommandOutput::ok("")
            }
        });
        let report = Grader::builder()
            .project_root(&root)
            .config(config())
            .runner(runner.clone())
            .python("python3")
            .build()
            .run()
            .await
            .expect("run");

        assert_eq!(report.get("requirements").map(ScoreRecord::score), Some(10));
        assert_eq!(report.get("coverage").map(ScoreRecord::score), Some(0));
        assert_eq!(report.get("coverage").map(ScoreRecord::max_score), Some(8));
        assert!(!runner.calls().iter().any(|c| c.has_arg("pytest") && c.has_arg("run")));
        let _ = fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn clean_venv_removes_the_environment_after_isolated_checks() {
        let root = project();
        let runner = ScriptedRunner::new(|call| {
            if call.has_arg("venv") {
                if let Some(dir) = call.args.last() {
                    fs::create_dir_all(PathBuf::from(dir).join("bin")).unwrap();
                }
            } else if call.has_arg("report") {
                // the environment still exists while isolated checks run
                assert!(call.program.parent().is_some_and(|bin| bin.is_dir()));
                return CommandOutput::ok("100\n");
            }
            CommandOutput::ok("")
        });
        let report = Grader::builder()
            .project_root(&root)
            .config(config())
            .runner(runner.clone())
            .python("python3")
            .clean_venv(true)
            .build()
            .run()
            .await
            .expect("run");

        assert_eq!(report.get("coverage").map(ScoreRecord::score), Some(8));
        assert!(!root.join(".venv").exists());
        let _ = fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn config_faults_run_nothing() {
        let root = project();
        let runner = ScriptedRunner::new(|_| CommandOutput::ok(""));
        let result = Grader::builder()
            .project_root(&root)
            .config(json!({"checks": [
                {"name": "requirements", "max_points": 10},
                {"name": "black", "max_points": 1},
            ]}))
            .runner(runner.clone())
            .build()
            .run()
            .await;

        assert!(matches!(result, Err(GraderError::UnknownCheck(_))));
        assert!(runner.calls().is_empty());
        let _ = fs::remove_dir_all(root);
    }
}
