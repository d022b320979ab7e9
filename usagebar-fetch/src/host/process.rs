//! Subprocess execution for external helpers.
//!
//! The login flow delegates to an external helper program (for example a
//! script that drives a browser and prints the captured cookie header).

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Clone)]
pub struct ProcessOutput {
    /// Standard output content.
    pub stdout: String,
    /// Standard error content.
    pub stderr: String,
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// stdout may carry session tokens
impl std::fmt::Debug for ProcessOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessOutput")
            .field("stdout_len", &self.stdout.len())
            .field("stderr", &self.stderr)
            .field("exit_code", &self.exit_code)
            .field("duration", &self.duration)
            .finish()
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// API for running subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Run a command with timeout.
    #[instrument(skip(self, args), fields(cmd = %cmd, timeout = ?timeout))]
    pub async fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let cmd_path = self.which(cmd).ok_or_else(|| {
            warn!(cmd = %cmd, "Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;
        debug!(path = %cmd_path.display(), argc = args.len(), "Running command");

        let start = Instant::now();

        let mut command = Command::new(&cmd_path);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(cmd = %cmd, timeout = ?timeout, "Command timed out");
                return Err(ProcessError::Timeout(timeout));
            }
        };

        let duration = start.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
            duration,
        };

        debug!(
            exit_code = exit_code,
            duration = ?duration,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Finds a command on PATH, or accepts an executable path as is.
    fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
