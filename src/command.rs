//! External command execution for the native service managers

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::DaemonError;

/// Captured result of a native command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn a non-zero exit into a `NativeCallFailure` naming the command line.
    pub fn check(self, program: &str, args: &[&str]) -> Result<Self, DaemonError> {
        if self.success {
            return Ok(self);
        }
        let stderr = self.stderr.trim();
        let detail = if stderr.is_empty() {
            format!("exit status {}", self.exit_code)
        } else {
            format!("exit status {}: {stderr}", self.exit_code)
        };
        Err(DaemonError::native(command_line(program, args), detail))
    }
}

/// Runs native service-manager commands.
///
/// Controllers never spawn processes directly so that the output-matching
/// logic can be driven from recorded fixtures.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput, DaemonError>;

    /// Run the command and fail on a non-zero exit status.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, DaemonError> {
        self.output(program, args).await?.check(program, args)
    }
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput, DaemonError> {
        debug!(command = %command_line(program, args), "running native command");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| DaemonError::native(command_line(program, args), e.to_string()))?;

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    shell_words::join(std::iter::once(program).chain(args.iter().copied()))
}
