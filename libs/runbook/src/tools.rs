//! External tool invocation.
//!
//! Every step of the runbook shells out to an existing CLI. [`ToolRunner`] is
//! the seam: [`ProcessRunner`] spawns real processes, [`MockRunner`] replays
//! scripted output for tests.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, RunbookError};

/// Tools the runbook depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Docker,
    Minikube,
    Kubectl,
    Helm,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Docker, Tool::Minikube, Tool::Kubectl, Tool::Helm];

    /// Executable name.
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Docker => "docker",
            Tool::Minikube => "minikube",
            Tool::Kubectl => "kubectl",
            Tool::Helm => "helm",
        }
    }

    /// Arguments that print the version without touching a cluster.
    pub fn version_args(&self) -> &'static [&'static str] {
        match self {
            Tool::Docker => &["--version"],
            Tool::Minikube => &["version", "--short"],
            Tool::Kubectl => &["version", "--client"],
            Tool::Helm => &["version", "--short"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs to completion.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit is not an error here; a missing binary is.
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput>;

    /// Run and fail on non-zero exit, returning trimmed stdout.
    async fn run_checked(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = self.run(program, args).await?;
        if !output.success() {
            return Err(RunbookError::CommandFailed {
                command: command_line(program, args),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// Render a command for logs and error messages.
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput> {
        debug!(command = %command_line(program, args), "Running command");

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RunbookError::ToolMissing {
                    tool: program.to_string(),
                },
                _ => RunbookError::Io(e),
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program, code = ?result.code, "Command finished");

        Ok(result)
    }
}

/// Result of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCheck {
    pub tool: Tool,
    pub available: bool,
    /// First line the tool printed for its version.
    pub version: Option<String>,
}

/// Probe every tool's version. Missing tools are reported, not raised.
pub async fn check_prerequisites<R: ToolRunner + ?Sized>(runner: &R) -> Result<Vec<ToolCheck>> {
    let mut checks = Vec::with_capacity(Tool::ALL.len());

    for tool in Tool::ALL {
        let check = match runner.run(tool.binary(), tool.version_args()).await {
            Ok(output) if output.success() => {
                let text = if output.stdout.trim().is_empty() {
                    &output.stderr
                } else {
                    &output.stdout
                };
                ToolCheck {
                    tool,
                    available: true,
                    version: first_line(text),
                }
            }
            Ok(_) | Err(RunbookError::ToolMissing { .. }) => ToolCheck {
                tool,
                available: false,
                version: None,
            },
            Err(e) => return Err(e),
        };
        checks.push(check);
    }

    Ok(checks)
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(ToolOutput),
    Missing,
}

/// Scripted [`ToolRunner`] for tests and dry runs.
///
/// Responses are matched by the longest registered command-line prefix.
/// Registering the same prefix several times queues the responses; the last
/// one repeats. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    missing: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output for commands starting with `prefix`.
    pub fn respond(self, prefix: impl Into<String>, output: ToolOutput) -> Self {
        self.script(prefix.into(), Scripted::Output(output))
    }

    /// Queue a "binary not found" answer for commands starting with `prefix`.
    ///
    /// Unlike [`MockRunner::missing`] this only lasts for its turn in the
    /// queue, so a later `respond` on the same prefix can make the tool appear.
    pub fn respond_missing(self, prefix: impl Into<String>) -> Self {
        self.script(prefix.into(), Scripted::Missing)
    }

    fn script(mut self, prefix: String, response: Scripted) -> Self {
        let responses = self
            .responses
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match responses.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, queue)) => queue.push_back(response),
            None => responses.push((prefix, VecDeque::from([response]))),
        }
        self
    }

    /// Treat `program` as absent from `PATH`.
    pub fn missing(mut self, program: impl Into<String>) -> Self {
        self.missing.insert(program.into());
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Whether any recorded command starts with `prefix`.
    pub fn was_called(&self, prefix: &str) -> bool {
        lock(&self.calls).iter().any(|c| c.starts_with(prefix))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput> {
        let line = command_line(program, args);
        lock(&self.calls).push(line.clone());

        if self.missing.contains(program) {
            return Err(RunbookError::ToolMissing {
                tool: program.to_string(),
            });
        }

        let mut responses = lock(&self.responses);
        let matched = responses
            .iter_mut()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());

        let response = match matched {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front(),
            Some((_, queue)) => queue.front().cloned(),
            None => None,
        };
        match response {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Missing) => Err(RunbookError::ToolMissing {
                tool: program.to_string(),
            }),
            None => Ok(ToolOutput::ok("")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn process_runner_captures_stdout() {
        let runner = ProcessRunner::new();
        let output = runner.run("sh", &["-c", "echo hello"]).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn process_runner_reports_missing_binary() {
        let runner = ProcessRunner::new();
        let err = runner
            .run("minikeda-definitely-not-installed", &[])
            .await
            .unwrap_err();
        assert!(err.is_tool_missing());
    }

    #[tokio::test]
    async fn run_checked_fails_on_non_zero_exit() {
        let runner = ProcessRunner::new();
        let err = runner
            .run_checked("sh", &["-c", "echo broken >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            RunbookError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn mock_prefers_longest_prefix_and_queues() {
        let runner = MockRunner::new()
            .respond("kubectl", ToolOutput::ok("generic"))
            .respond("kubectl get pods", ToolOutput::ok("first"))
            .respond("kubectl get pods", ToolOutput::ok("second"));

        let a = runner.run_checked("kubectl", &["get", "pods"]).await.unwrap();
        let b = runner.run_checked("kubectl", &["get", "pods"]).await.unwrap();
        let c = runner.run_checked("kubectl", &["get", "pods"]).await.unwrap();
        let d = runner.run_checked("kubectl", &["version"]).await.unwrap();

        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("first", "second", "second"));
        assert_eq!(d, "generic");
        assert_eq!(runner.calls().len(), 4);
    }

    #[tokio::test]
    async fn mock_missing_response_is_consumed_in_turn() {
        let runner = MockRunner::new()
            .respond_missing("helm version")
            .respond("helm version", ToolOutput::ok("v3.16.2"));

        let first = runner.run("helm", &["version", "--short"]).await.unwrap_err();
        assert!(first.is_tool_missing());
        let second = runner.run_checked("helm", &["version", "--short"]).await.unwrap();
        assert_eq!(second, "v3.16.2");
    }

    #[tokio::test]
    async fn prerequisites_report_missing_tools() {
        let runner = MockRunner::new()
            .respond("docker --version", ToolOutput::ok("Docker version 27.3.1\n"))
            .respond("minikube version", ToolOutput::ok("v1.34.0"))
            .respond(
                "kubectl version",
                ToolOutput::ok("\nClient Version: v1.31.2\nKustomize Version: v5.4.2\n"),
            )
            .missing("helm");

        let checks = check_prerequisites(&runner).await.unwrap();
        assert_eq!(checks.len(), 4);
        assert_eq!(checks[0].version.as_deref(), Some("Docker version 27.3.1"));
        assert_eq!(checks[2].version.as_deref(), Some("Client Version: v1.31.2"));
        assert_eq!(checks[3].tool, Tool::Helm);
        assert!(!checks[3].available);
    }

    #[tokio::test]
    async fn prerequisites_mark_failing_tool_unavailable() {
        let runner = MockRunner::new().respond(
            "docker --version",
            ToolOutput::failed(1, "permission denied"),
        );
        let checks = check_prerequisites(&runner).await.unwrap();
        assert!(!checks[0].available);
        assert!(checks[1].available);
    }
}
