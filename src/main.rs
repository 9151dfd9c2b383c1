#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # pygrader
//!
//! Runs the configured checks against one Python project and prints a score
//! line per check.
//!
//! ```text
//! pygrader [-v...] [-c PATH] [--student-id ID] [--clean-venv] PROJECT_ROOT
//! ```

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use pygrader::{
    Grader, GraderError,
    cli,
    config::{RuntimeConfig, load_config, resolve_config_path},
    logging,
    process::ProcessRunner,
    project::ProjectPaths,
};

/// Validates the positional project root.
fn project_root(raw: &str) -> Result<PathBuf, String> {
    if raw.trim().is_empty() {
        return Err("No project path provided".to_string());
    }
    let path = PathBuf::from(raw);
    if !path.is_dir() {
        return Err(GraderError::ProjectNotFound(path).to_string());
    }
    Ok(path)
}

/// Resolves everything and runs the grader.
async fn grade(opts: cli::Options, root: PathBuf) -> Result<(), GraderError> {
    let runtime = RuntimeConfig::from_env();
    let config_path =
        resolve_config_path(opts.config.as_deref(), &runtime).inspect_err(|err| {
            if let GraderError::ConfigNotFound { tried: Some(path) } = err {
                tracing::error!("Configuration file {} does not exist", path.display());
            }
        })?;
    let config = load_config(&config_path)?;

    if ProjectPaths::new(&root).test_dir().is_none() {
        tracing::warn!("No tests directory found in {}", root.display());
    }

    let report = Grader::builder()
        .project_root(root)
        .config(config)
        .runner(Arc::new(ProcessRunner::with_deadline(runtime.tool_timeout())))
        .clean_venv(opts.clean_venv)
        .maybe_python(runtime.python())
        .build()
        .run()
        .await?;

    print!("{report}");
    let (score, max) = report.total();
    tracing::info!("Total: {score}/{max}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    let opts = cli::options().run();
    logging::init(opts.verbose, &logging::log_file_name(opts.student_id.as_deref()))?;

    tracing::info!("pygrader {}", env!("CARGO_PKG_VERSION"));
    if let Some(id) = &opts.student_id {
        tracing::info!("Running checks for student {id}");
    }

    let root = match project_root(&opts.project_root) {
        Ok(root) => root,
        Err(message) => {
            println!("Error: {message}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match grade(opts, root).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!("{err}");
            println!("Error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
