// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External process execution.
//!
//! Every side effect Karei performs goes through an external tool: package
//! managers, `gsettings`, `systemctl`, `journalctl`, and so on. The
//! [`CommandExecutor`] gives all of them the same behavior with respect to
//! dry-run, verbosity, privilege escalation, and timeouts.
//!
//! # Dry-Run
//!
//! When dry-run is enabled, no process is ever spawned. The would-be command
//! line is reported instead, and the call succeeds. This holds for every
//! execution flavor, including the silent probes used for existence checks.
//!
//! # Cancellation
//!
//! Children are spawned with `kill_on_drop`, so dropping an in-flight call
//! kills the child process. Timeouts are built on the same mechanism.

pub mod service;

pub use service::ServiceController;

use std::{
    ffi::OsStr,
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Run external processes with consistent dry-run and verbosity semantics.
///
/// Behavior flags are captured at construction and never change afterwards.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandExecutor {
    verbose: bool,
    dry_run: bool,
    timeout: Option<Duration>,
}

impl CommandExecutor {
    /// Construct new executor that is quiet, not dry-run, and has no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream output of children to the parent's stdout and stderr.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Report commands instead of running them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Kill children that run longer than given duration.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run external process.
    ///
    /// Output of the child is streamed to the parent in verbose mode.
    /// Otherwise it is captured and only surfaced in the error on failure.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError::Spawn`] if process cannot be launched.
    /// - Return [`ExecError::Failed`] if process exits with non-zero status.
    /// - Return [`ExecError::Timeout`] if process outlives the timeout.
    #[instrument(skip(self, program, args), level = "debug")]
    pub async fn execute(
        &self,
        program: impl AsRef<str>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<()> {
        let program = program.as_ref();
        let args = collect_args(args);
        if self.report(program, &args) {
            return Ok(());
        }

        if self.verbose {
            let mut cmd = self.command(program, &args);
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            let status = self.wait_status(program, cmd).await?;
            return check_status(program, status, String::new());
        }

        let mut cmd = self.command(program, &args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let (status, output) = self.wait_output(program, cmd).await?;
        check_status(program, status, chomp(output))
    }

    /// Run external process with root privileges through sudo.
    ///
    /// # Errors
    ///
    /// - Same as [`CommandExecutor::execute`].
    pub async fn execute_sudo(
        &self,
        program: impl AsRef<str>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<()> {
        let mut sudo_args = vec![program.as_ref().to_string()];
        sudo_args.extend(collect_args(args));
        self.execute("sudo", sudo_args).await
    }

    /// Run external process and return its output.
    ///
    /// Output is stdout followed by stderr. Dry-run yields an empty string.
    ///
    /// # Errors
    ///
    /// - Same as [`CommandExecutor::execute`].
    #[instrument(skip(self, program, args), level = "debug")]
    pub async fn execute_with_output(
        &self,
        program: impl AsRef<str>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<String> {
        let program = program.as_ref();
        let args = collect_args(args);
        if self.report(program, &args) {
            return Ok(String::new());
        }

        let mut cmd = self.command(program, &args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let (status, output) = self.wait_output(program, cmd).await?;
        if !status.success() {
            return Err(ExecError::Failed {
                program: program.into(),
                code: status.code(),
                output: chomp(output),
            });
        }

        Ok(output)
    }

    /// Run external process without streaming or capturing any output.
    ///
    /// Meant for probes where only the exit status matters.
    ///
    /// # Errors
    ///
    /// - Same as [`CommandExecutor::execute`].
    pub async fn execute_silent(
        &self,
        program: impl AsRef<str>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<()> {
        let program = program.as_ref();
        let args = collect_args(args);
        if self.report(program, &args) {
            return Ok(());
        }

        let mut cmd = self.command(program, &args);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let status = self.wait_status(program, cmd).await?;
        check_status(program, status, String::new())
    }

    /// Check if executable can be resolved through `PATH`.
    pub fn command_exists(&self, program: impl AsRef<OsStr>) -> bool {
        which::which(program).is_ok()
    }

    fn report(&self, program: &str, args: &[String]) -> bool {
        let line = command_line(program, args);
        if self.dry_run {
            info!("[dry-run] {line}");
            return true;
        }

        if self.verbose {
            info!("$ {line}");
        } else {
            debug!("$ {line}");
        }

        false
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::inherit()).kill_on_drop(true);
        cmd
    }

    async fn wait_status(&self, program: &str, mut cmd: Command) -> Result<ExitStatus> {
        let mut child = cmd.spawn().map_err(|err| ExecError::Spawn {
            program: program.into(),
            source: err,
        })?;

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait())
                .await
                .map_err(|_| ExecError::Timeout {
                    program: program.into(),
                    limit,
                })?
                .map_err(ExecError::Wait),
            None => child.wait().await.map_err(ExecError::Wait),
        }
    }

    async fn wait_output(&self, program: &str, mut cmd: Command) -> Result<(ExitStatus, String)> {
        let child = cmd.spawn().map_err(|err| ExecError::Spawn {
            program: program.into(),
            source: err,
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ExecError::Timeout {
                    program: program.into(),
                    limit,
                })?
                .map_err(ExecError::Wait)?,
            None => child.wait_with_output().await.map_err(ExecError::Wait)?,
        };

        let mut message = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
        message.push_str(String::from_utf8_lossy(output.stderr.as_slice()).as_ref());

        Ok((output.status, message))
    }
}

fn collect_args(args: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    args.into_iter().map(|arg| arg.as_ref().to_string()).collect()
}

fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push_str(format!("{arg:?}").as_str());
        } else {
            line.push_str(arg);
        }
    }

    line
}

fn check_status(program: &str, status: ExitStatus, output: String) -> Result<()> {
    if !status.success() {
        return Err(ExecError::Failed {
            program: program.into(),
            code: status.code(),
            output,
        });
    }

    Ok(())
}

// INVARIANT: Chomp trailing newlines.
fn chomp(message: String) -> String {
    message.trim_end_matches(['\r', '\n']).to_string()
}

/// External process execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Process could not be launched, e.g., binary not found.
    #[error("failed to launch {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Waiting on a launched process failed.
    #[error(transparent)]
    Wait(std::io::Error),

    /// Process exited with non-zero status.
    #[error("command {program:?} failed{}{}", exit_code(.code), failure_output(.output))]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    /// Process ran past its timeout and was killed.
    #[error("command {program:?} timed out after {limit:?}")]
    Timeout { program: String, limit: Duration },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " (terminated by signal)".into(),
    }
}

fn failure_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(":\n{output}")
    }
}

/// Friendly result alias :3
pub type Result<T, E = ExecError> = std::result::Result<T, E>;
