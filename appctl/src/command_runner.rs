//! Abstraction over external command execution for testability.
//!
//! Extension builds and toolchain checks go through the [`CommandRunner`]
//! trait so deploy and draft workflows can be exercised without spawning
//! processes.
//!
//! [`RealCommandRunner`] delegates to [`std::process::Command`] and is the
//! default implementation stored in
//! [`ExecutionPlan`](crate::pipeline::ExecutionPlan).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::error::AppctlError;

/// Trait for abstracting external command execution.
///
/// Stored as `Arc<dyn CommandRunner>` in
/// [`ExecutionPlan`](crate::pipeline::ExecutionPlan).
pub trait CommandRunner: Send + Sync {
    /// Run a command and return only its exit status (inherits stdio).
    fn run_status(
        &self,
        program: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<ExitStatus>;
}

/// Options for command execution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
}

impl CommandOptions {
    /// Create options with a working directory.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }
}

/// Split a shell-style command line and run it, failing on a non-zero exit.
pub fn run_command_line(
    runner: &dyn CommandRunner,
    command_line: &str,
    options: &CommandOptions,
) -> Result<()> {
    let words = shlex::split(command_line)
        .with_context(|| format!("Couldn't parse command `{command_line}`"))?;
    let Some((program, rest)) = words.split_first() else {
        anyhow::bail!("Empty command");
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    tracing::debug!(program, ?args, cwd = ?options.cwd, "running command");
    let status = runner.run_status(program, &args, options)?;
    if !status.success() {
        return Err(AppctlError::CommandFailed {
            command: command_line.to_string(),
            status: status.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Production implementation that delegates to [`std::process::Command`].
pub struct RealCommandRunner;

impl RealCommandRunner {
    fn command(program: &str, args: &[&str], options: &CommandOptions) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl CommandRunner for RealCommandRunner {
    fn run_status(
        &self,
        program: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<ExitStatus> {
        Self::command(program, args, options)
            .status()
            .with_context(|| format!("Failed to run '{program}'"))
    }
}
