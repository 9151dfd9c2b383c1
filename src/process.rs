#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Running external tools and capturing what they print.

use std::{
    ffi::OsString,
    fmt::Display,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    time::timeout,
};

/// Drop guard that terminates a spawned child process if callers forget to
/// await it.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> anyhow::Result<&mut Child> {
        self.0
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

/// Spawns a command with a closed stdin and collects stdout/stderr.
pub async fn run_collect(
    program: &Path,
    args: &[OsString],
    cwd: Option<&Path>,
    deadline: Option<Duration>,
) -> Result<Collected> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut guard = ChildDropGuard::new(
        cmd.spawn()
            .with_context(|| format!("failed to spawn {}", program.display()))?,
    );

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdout")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let err_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stderr")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        guard.disarm();
        Ok(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => timeout(limit, wait_future)
            .await
            .context("subprocess timed out")?,
        None => wait_future.await,
    }
}

/// A single external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCall {
    /// Program to execute.
    pub program:     PathBuf,
    /// Arguments passed to the program.
    pub args:        Vec<OsString>,
    /// Working directory, if different from the grader's own.
    pub current_dir: Option<PathBuf>,
}

impl CommandCall {
    /// Creates a call to `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program:     program.into(),
            args:        Vec::new(),
            current_dir: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Returns true if any argument equals `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl Display for CommandCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit code and captured text of a finished tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal or never ran.
    pub status: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Builds a successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Builds a failed output with the given status and stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// True when the tool exited with status 0.
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// The "run an external command, capture exit code and output" seam.
///
/// Checks and the environment manager only talk to tools through this trait,
/// so tests can script tool behaviour.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `call` to completion. Failing to start the tool is reported as a
    /// non-zero [`CommandOutput`], never as an error.
    async fn run(&self, call: CommandCall) -> CommandOutput;
}

/// [`CommandRunner`] backed by real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Optional per-invocation deadline.
    deadline: Option<Duration>,
}

impl ProcessRunner {
    /// Creates a runner that waits at most `deadline` for each tool.
    pub fn with_deadline(deadline: Option<Duration>) -> Self {
        Self { deadline }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, call: CommandCall) -> CommandOutput {
        tracing::debug!("Running command: {call}");

        let collected = run_collect(
            &call.program,
            &call.args,
            call.current_dir.as_deref(),
            self.deadline,
        )
        .await;

        let output = match collected {
            Ok(collected) => CommandOutput {
                status: collected.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&collected.stdout).to_string(),
                stderr: String::from_utf8_lossy(&collected.stderr).to_string(),
            },
            Err(err) => CommandOutput::failed(-1, format!("{err:#}")),
        };

        if output.success() {
            tracing::trace!("Command succeeded: {}", output.stdout);
        } else {
            tracing::debug!(
                "Command failed: {} {} {}",
                output.status,
                output.stdout,
                output.stderr
            );
        }
        output
    }
}
