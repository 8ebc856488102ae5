//! Command runner that records invocations and replays canned output

use async_trait::async_trait;
use rustle_service::command::{CommandOutput, CommandRunner};
use rustle_service::DaemonError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Every command succeeds with empty output unless a response was registered.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, CommandOutput>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the output for an exact command line such as `systemctl status backupd`.
    pub fn respond(&self, command_line: &str, output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .insert(command_line.to_string(), output);
    }

    pub fn respond_stdout(&self, command_line: &str, stdout: &str) {
        self.respond(
            command_line,
            CommandOutput {
                success: true,
                stdout: stdout.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn fail(&self, command_line: &str, exit_code: i32, stderr: &str) {
        self.respond(
            command_line,
            CommandOutput {
                success: false,
                exit_code,
                stderr: stderr.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than the read-only status probes.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !is_probe(call))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

fn is_probe(call: &str) -> bool {
    call.starts_with("systemctl status")
        || call.starts_with("status ")
        || call.starts_with("launchctl list")
        || call.ends_with(" status")
        || call.ends_with(" onestatus")
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput, DaemonError> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(command_line.clone());

        let responses = self.responses.lock().unwrap();
        Ok(responses.get(&command_line).cloned().unwrap_or(CommandOutput {
            success: true,
            ..Default::default()
        }))
    }
}
