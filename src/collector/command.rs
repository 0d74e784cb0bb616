//! External command execution.
//!
//! The collector never spawns processes directly; it goes through a
//! [`CommandRunner`] so tests can substitute canned output.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub text: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a program and captures its combined output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Render a command line for logs and errors
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// System Runner
// =============================================================================

/// Spawns real processes with a per-command timeout
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    #[instrument(skip(self, args), fields(args = ?args))]
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| Error::CommandFailed {
                command: command_line(program, args),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(Error::CommandTimeout {
                    command: command_line(program, args),
                    timeout: self.timeout,
                })
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!(code = ?output.status.code(), bytes = text.len(), "Command finished");

        Ok(CommandOutput {
            code: output.status.code(),
            text,
        })
    }
}

// =============================================================================
// In-Memory Runner
// =============================================================================

/// Replays canned output keyed by the full command line.
///
/// Unknown commands fail with `CommandFailed`. Every invocation is recorded.
#[derive(Debug, Default)]
pub struct InMemoryCommandRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a successful response
    pub fn with_output(self, command: &str, text: &str) -> Self {
        self.with_response(command, Some(0), text)
    }

    /// Register a response with an explicit exit code
    pub fn with_response(mut self, command: &str, code: Option<i32>, text: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            CommandOutput {
                code,
                text: text.to_string(),
            },
        );
        self
    }

    /// Command lines seen so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for InMemoryCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let line = command_line(program, args);
        self.calls.lock().push(line.clone());
        self.responses
            .get(&line)
            .cloned()
            .ok_or_else(|| Error::CommandFailed {
                command: line,
                reason: "no such command".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            command_line("ssacli", &args(&["ctrl", "all", "show", "status"])),
            "ssacli ctrl all show status"
        );
        assert_eq!(command_line("true", &[]), "true");
    }

    #[tokio::test]
    async fn test_in_memory_runner_replays_and_records() {
        let runner = InMemoryCommandRunner::new().with_output("ssacli ctrl all show status", "Slot 0");

        let out = runner
            .run("ssacli", &args(&["ctrl", "all", "show", "status"]))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.text, "Slot 0");

        let missing = runner.run("ssacli", &args(&["bogus"])).await;
        assert_matches!(missing, Err(Error::CommandFailed { .. }));

        assert_eq!(
            runner.calls(),
            vec!["ssacli ctrl all show status", "ssacli bogus"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout_and_stderr() {
        let runner = SystemCommandRunner::new(Duration::from_secs(5));
        let out = runner
            .run("sh", &args(&["-c", "echo out; echo err 1>&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        assert_eq!(out.text, "out\nerr\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_timeout() {
        let runner = SystemCommandRunner::new(Duration::from_millis(100));
        let result = runner.run("sleep", &args(&["5"])).await;
        assert_matches!(
            result,
            Err(Error::CommandTimeout { timeout, .. }) if timeout == Duration::from_millis(100)
        );
    }

    #[tokio::test]
    async fn test_system_runner_missing_binary() {
        let runner = SystemCommandRunner::new(Duration::from_secs(5));
        let result = runner
            .run("definitely-not-a-real-binary-1f3a", &[])
            .await;
        assert_matches!(result, Err(Error::CommandFailed { .. }));
    }
}
