#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Per-project virtual environment used by isolated checks.
//!
//! The environment is rebuilt from scratch on every run: any environment found
//! at `.venv` or `venv` is deleted first, then a fresh one is created and the
//! project's `requirements.txt` plus the grader's own tools are installed
//! into it. Isolated checks then run their tools from `<venv>/bin`.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::GraderError,
    process::{CommandCall, CommandRunner},
    project::ProjectPaths,
};

/// Tools isolated checks expect inside the environment.
pub const GRADER_TOOLS: &[&str] = &["coverage", "pytest", "pylint"];

/// Finds the interpreter used to create environments: `python3`, then
/// `python` on `PATH`.
pub fn default_python() -> PathBuf {
    ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .unwrap_or_else(|| PathBuf::from("python3"))
}

/// Manages the isolated environment of one project for one grading run.
///
/// Not meant to be shared: [`VirtualEnvironment::setup`] unconditionally
/// deletes whatever environment already exists at the project's path.
pub struct VirtualEnvironment {
    /// Project layout, including the environment location.
    paths:   ProjectPaths,
    /// Interpreter used for `-m venv`.
    python:  PathBuf,
    /// Runs `python -m venv` and `pip`.
    runner:  Arc<dyn CommandRunner>,
    /// Whether teardown deletes the environment.
    cleanup: bool,
}

impl VirtualEnvironment {
    /// Creates a manager for the project at `project_root`.
    pub fn new(project_root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            paths: ProjectPaths::new(project_root),
            python: default_python(),
            runner,
            cleanup: false,
        }
    }

    /// Uses `python` to create the environment.
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    /// When `cleanup` is true, teardown deletes the environment. The default
    /// leaves it on disk after the run.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Directory the environment lives in.
    pub fn path(&self) -> &Path {
        self.paths.venv_dir()
    }

    /// Provisions a fresh environment and returns a guard that tears it down
    /// when dropped.
    ///
    /// A missing `requirements.txt` is logged and tolerated. Failing to create
    /// the environment or to install into it is an
    /// [`GraderError::EnvironmentSetup`].
    pub async fn setup(&self) -> Result<ActiveEnvironment<'_>, GraderError> {
        match self.provision().await {
            Ok(()) => Ok(ActiveEnvironment { env: self }),
            Err(err) => {
                self.teardown();
                Err(err)
            }
        }
    }

    /// The setup steps, in order.
    async fn provision(&self) -> Result<(), GraderError> {
        for existing in self.paths.venv_candidates() {
            if existing.exists() {
                tracing::debug!("Found existing venv at {}", existing.display());
                tokio::fs::remove_dir_all(existing)
                    .await
                    .map_err(|err| self.setup_error(format!("could not remove {}: {err}", existing.display())))?;
            }
        }

        let requirements = self.paths.requirements_file();
        let has_requirements = requirements.is_file();
        if !has_requirements {
            tracing::error!("No requirements.txt file found in the project directory");
        }

        tracing::debug!("Creating new venv at {}", self.path().display());
        self.run_step(
            "create venv",
            CommandCall::new(&self.python)
                .args(["-m", "venv"])
                .arg(self.path()),
        )
        .await?;

        if has_requirements {
            tracing::debug!("Installing requirements");
            self.run_step(
                "install requirements",
                self.pip_install().arg("-r").arg(&requirements),
            )
            .await?;
        }

        tracing::debug!("Installing grader dependencies");
        self.run_step(
            "install grader dependencies",
            self.pip_install()
                .args(GRADER_TOOLS.iter().map(OsString::from)),
        )
        .await?;

        Ok(())
    }

    /// `<venv python> -m pip install`, run from the project root.
    fn pip_install(&self) -> CommandCall {
        CommandCall::new(self.paths.venv_executable("python"))
            .args(["-m", "pip", "install", "--disable-pip-version-check"])
            .current_dir(self.paths.root_dir())
    }

    /// Runs one provisioning command, mapping failure to a setup error.
    async fn run_step(&self, step: &str, call: CommandCall) -> Result<(), GraderError> {
        let output = self.runner.run(call).await;
        if output.success() {
            return Ok(());
        }
        let detail = output.stderr.lines().last().unwrap_or_default().trim().to_string();
        Err(self.setup_error(format!("{step} failed with status {}: {detail}", output.status)))
    }

    /// Wraps a message as [`GraderError::EnvironmentSetup`].
    fn setup_error(&self, message: String) -> GraderError {
        GraderError::EnvironmentSetup {
            path: self.path().to_path_buf(),
            message,
        }
    }

    /// Releases the environment. Inert unless cleanup was requested.
    pub fn teardown(&self) {
        if !self.cleanup {
            tracing::trace!("Leaving venv at {}", self.path().display());
            return;
        }
        if self.path().exists()
            && let Err(err) = std::fs::remove_dir_all(self.path())
        {
            tracing::warn!("Could not remove venv at {}: {err}", self.path().display());
        }
    }
}

/// A provisioned environment. Dropping it runs
/// [`VirtualEnvironment::teardown`], on every exit path.
pub struct ActiveEnvironment<'a> {
    /// The manager that provisioned this environment.
    env: &'a VirtualEnvironment,
}

impl ActiveEnvironment<'_> {
    /// Directory the environment lives in.
    pub fn path(&self) -> &Path {
        self.env.path()
    }
}

impl Drop for ActiveEnvironment<'_> {
    fn drop(&mut self) {
        self.env.teardown();
    }
}
