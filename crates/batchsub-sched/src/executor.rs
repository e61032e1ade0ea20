//! Resilient execution of external scheduler commands.
//!
//! Scheduler control planes fail intermittently when they are queried often.
//! Every interaction with `sbatch`, `squeue`, `condor_q` and friends goes
//! through [`ResilientExecutor`], which re-issues the exact same command until
//! it succeeds or its attempt budget is spent. There is no delay between
//! attempts.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{SchedError, SchedResult};

/// A program plus its argument vector. Arguments are passed verbatim, never
/// through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs a single command once and returns its captured standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn output(&self, command: &CommandSpec) -> SchedResult<String>;
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn output(&self, command: &CommandSpec) -> SchedResult<String> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SchedError::CommandFailed {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SchedError::CommandFailed {
                command: command.to_string(),
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// How many times a command is attempted, and how long a single attempt may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,

    /// Per-attempt timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Budget for job submission and queue queries.
    pub const SUBMIT: RetryPolicy = RetryPolicy {
        attempts: 10,
        timeout: None,
    };

    /// Budget for scheduler detection.
    pub const PROBE: RetryPolicy = RetryPolicy {
        attempts: 3,
        timeout: None,
    };

    /// Create a policy with the given number of attempts (at least one).
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            timeout: None,
        }
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::SUBMIT
    }
}

/// Retries external commands on failure.
#[derive(Clone)]
pub struct ResilientExecutor {
    runner: Arc<dyn CommandRunner>,
    policy: RetryPolicy,
    probe_policy: RetryPolicy,
}

impl ResilientExecutor {
    /// Create an executor over the given runner with the default budgets.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            policy: RetryPolicy::SUBMIT,
            probe_policy: RetryPolicy::PROBE,
        }
    }

    /// Create an executor that spawns real processes.
    pub fn system() -> Self {
        Self::new(Arc::new(ProcessRunner))
    }

    /// Override the budget used by [`run`](Self::run).
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the budget used by [`probe`](Self::probe).
    pub fn with_probe_policy(mut self, policy: RetryPolicy) -> Self {
        self.probe_policy = policy;
        self
    }

    /// The budget used by [`run`](Self::run).
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run a command, retrying on failure. The error of the final attempt is returned.
    pub async fn run(&self, command: &CommandSpec) -> SchedResult<String> {
        self.run_with(command, self.policy).await
    }

    /// Check whether a command can be executed successfully.
    ///
    /// Never fails: an exhausted budget is logged and reported as `false`.
    pub async fn probe(&self, command: &CommandSpec) -> bool {
        match self.run_with(command, self.probe_policy).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("command \"{}\" failed: {}", command, e);
                false
            }
        }
    }

    async fn run_with(&self, command: &CommandSpec, policy: RetryPolicy) -> SchedResult<String> {
        let attempts = policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(command, policy.timeout).await {
                Ok(output) => return Ok(output),
                Err(e) if attempt < attempts => {
                    tracing::debug!(
                        "attempt {}/{} of \"{}\" failed: {}",
                        attempt,
                        attempts,
                        command,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!("giving up on \"{}\" after {} attempts", command, attempts);
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
    ) -> SchedResult<String> {
        match timeout {
            None => self.runner.output(command).await,
            Some(limit) => tokio::time::timeout(limit, self.runner.output(command))
                .await
                .map_err(|_| {
                    SchedError::Timeout(format!("{command} timed out after {}s", limit.as_secs()))
                })?,
        }
    }
}

impl fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("policy", &self.policy)
            .field("probe_policy", &self.probe_policy)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;

    #[test]
    fn test_command_display() {
        let cmd = CommandSpec::new("condor_q")
            .arg("-constraint")
            .arg("Owner == \"alice\"")
            .args(["-af", "ClusterId"]);
        assert_eq!(
            cmd.to_string(),
            "condor_q -constraint 'Owner == \"alice\"' -af ClusterId"
        );
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let runner = Arc::new(ScriptedRunner::new().fail(4).reply("ok\n"));
        let executor = ResilientExecutor::new(runner.clone());

        let out = executor.run(&CommandSpec::new("squeue")).await.unwrap();
        assert_eq!(out, "ok\n");
        assert_eq!(runner.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_ten_attempts() {
        let runner = Arc::new(ScriptedRunner::new().fail(20));
        let executor = ResilientExecutor::new(runner.clone());

        let err = executor.run(&CommandSpec::new("sbatch")).await.unwrap_err();
        assert!(err.is_command_failure());
        assert_eq!(runner.calls().len(), 10);
        assert!(runner.calls().iter().all(|c| c.program == "sbatch"));
    }

    #[tokio::test]
    async fn test_probe_uses_smaller_budget() {
        let runner = Arc::new(ScriptedRunner::new().fail(5));
        let executor = ResilientExecutor::new(runner.clone());

        assert!(!executor.probe(&CommandSpec::new("which").arg("squeue")).await);
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_probe_success() {
        let runner = Arc::new(ScriptedRunner::new().fail(2).reply("/usr/bin/squeue\n"));
        let executor = ResilientExecutor::new(runner.clone());

        assert!(executor.probe(&CommandSpec::new("which").arg("squeue")).await);
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_process_runner_captures_stdout() {
        let out = ProcessRunner
            .output(&CommandSpec::new("sh").args(["-c", "echo hello"]))
            .await
            .unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn test_process_runner_reports_nonzero_exit() {
        let err = ProcessRunner
            .output(&CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            SchedError::CommandFailed { message, .. } => assert!(message.contains("boom")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let executor = ResilientExecutor::system()
            .with_policy(RetryPolicy::new(1).with_timeout(Duration::from_millis(50)));
        let err = executor
            .run(&CommandSpec::new("sleep").arg("5"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedError::Timeout(_)));
    }
}
