//! Job definition and lifecycle.
//!
//! A job's state is not stored as an enum. It is derived from three fields
//! plus a queue snapshot taken from the scheduler:
//!
//! | submitted | in snapshot | sentinel seen | state    |
//! |-----------|-------------|---------------|----------|
//! | no        | -           | -             | new      |
//! | yes       | yes         | -             | running  |
//! | yes       | no          | yes           | finished |
//! | yes       | no          | no            | failed   |
//!
//! The sentinel line in the output file is the only success signal. Batch
//! systems do not reliably report the exit status of the wrapped command, so
//! it is never consulted.
//!
//! "Failed" is a negative definition: a job that has just left the queue but
//! whose sentinel line has not reached the shared filesystem yet is reported
//! as failed until the line appears.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::process::Command;

use crate::adapter::{BatchAdapter, BatchJobId, QueueSnapshot, SchedulerKind, SubmitRequest};
use crate::error::{SchedError, SchedResult};
use crate::script::{self, ContainerWrapper};

/// Default line a job prints to signal successful completion.
pub const DEFAULT_FINISHED_TOKEN: &str = "__FINISHED__";

fn default_finished_token() -> String {
    DEFAULT_FINISHED_TOKEN.to_string()
}

/// Everything needed to define a job, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name; also names the generated script (`<name>.sh`).
    pub name: String,

    /// Directory for the script, output and error files. Created if missing.
    pub directory: PathBuf,

    /// Shell commands, run in order.
    #[serde(default)]
    pub commands: Vec<String>,

    /// Wall-time request, either `HH:MM:SS` or a job flavour name.
    pub time: String,

    /// Memory request, e.g. `1000M`.
    pub memory: String,

    /// Output file name, relative to `directory`. `.out` is appended if missing.
    pub output: String,

    /// Error file name, relative to `directory`. `.err` is appended if missing.
    pub error: String,

    /// Line that marks successful completion in the output file.
    #[serde(default = "default_finished_token")]
    pub finished_token: String,

    /// Submit a container-wrapped version of the script.
    #[serde(default)]
    pub in_container: bool,
}

impl JobConfig {
    /// Create a job definition with one-hour, 1000M defaults and output/error
    /// files named after the job.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            output: name.clone(),
            error: name.clone(),
            name,
            directory: directory.into(),
            commands: Vec::new(),
            time: "01:00:00".to_string(),
            memory: "1000M".to_string(),
            finished_token: default_finished_token(),
            in_container: false,
        }
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    pub fn with_memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = memory.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_finished_token(mut self, token: impl Into<String>) -> Self {
        self.finished_token = token.into();
        self
    }

    pub fn in_container(mut self, in_container: bool) -> Self {
        self.in_container = in_container;
        self
    }

    /// Output file path, always ending in `.out`.
    pub fn output_path(&self) -> PathBuf {
        suffixed(&self.directory, &self.output, ".out")
    }

    /// Error file path, always ending in `.err`.
    pub fn error_path(&self) -> PathBuf {
        suffixed(&self.directory, &self.error, ".err")
    }

    /// Path of the generated script.
    pub fn script_path(&self) -> PathBuf {
        self.directory.join(format!("{}.sh", self.name))
    }
}

fn suffixed(directory: &Path, name: &str, suffix: &str) -> PathBuf {
    if name.ends_with(suffix) {
        directory.join(name)
    } else {
        directory.join(format!("{name}{suffix}"))
    }
}

/// One unit of work bound to a batch system.
pub struct Job {
    config: JobConfig,
    output: PathBuf,
    error: PathBuf,
    /// Script handed to the batch system (container-wrapped if requested).
    script: PathBuf,
    /// Script that runs the commands directly, outside any container.
    local_script: PathBuf,
    adapter: Arc<dyn BatchAdapter>,
    job_id: Option<BatchJobId>,
    submitted: bool,
    finished: bool,
    submitted_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a job: make its directory, write its script and, for container
    /// jobs, wrap the script.
    ///
    /// `config.time` must already be in the adapter's grammar; use
    /// [`SchedulerFactory`](crate::factory::SchedulerFactory) to translate it.
    pub async fn create(
        config: JobConfig,
        adapter: Arc<dyn BatchAdapter>,
        wrapper: Option<&dyn ContainerWrapper>,
    ) -> SchedResult<Self> {
        fs::create_dir_all(&config.directory).await?;

        let local_script = config.script_path();
        script::write_script(&local_script, &config.commands).await?;

        let script = if config.in_container {
            let wrapper = wrapper.ok_or_else(|| {
                SchedError::ConfigError(format!(
                    "job '{}' runs in a container but no container wrapper was provided",
                    config.name
                ))
            })?;
            wrapper.wrap(&local_script).await?
        } else {
            local_script.clone()
        };

        Ok(Self {
            output: config.output_path(),
            error: config.error_path(),
            script,
            local_script,
            config,
            adapter,
            job_id: None,
            submitted: false,
            finished: false,
            submitted_at: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn time(&self) -> &str {
        &self.config.time
    }

    pub fn memory(&self) -> &str {
        &self.config.memory
    }

    pub fn finished_token(&self) -> &str {
        &self.config.finished_token
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn error_path(&self) -> &Path {
        &self.error
    }

    /// The script handed to the batch system.
    pub fn script_path(&self) -> &Path {
        &self.script
    }

    /// The script that runs outside any container. Equal to
    /// [`script_path`](Self::script_path) unless the job is container-wrapped.
    pub fn local_script_path(&self) -> &Path {
        &self.local_script
    }

    /// Id of the current submission, if any.
    pub fn job_id(&self) -> Option<BatchJobId> {
        self.job_id
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// The batch system this job is bound to.
    pub fn kind(&self) -> SchedulerKind {
        self.adapter.kind()
    }

    pub fn adapter(&self) -> &Arc<dyn BatchAdapter> {
        &self.adapter
    }

    /// Fetch a fresh queue snapshot through this job's adapter.
    pub async fn query_queue(&self) -> SchedResult<QueueSnapshot> {
        self.adapter.query_queue().await
    }

    /// Whether the current submission is queued or running in `snapshot`.
    pub fn is_running(&self, snapshot: &QueueSnapshot) -> bool {
        self.job_id.is_some_and(|id| snapshot.contains(id))
    }

    /// [`is_running`](Self::is_running) against a freshly fetched snapshot.
    pub async fn is_running_now(&self) -> SchedResult<bool> {
        if self.job_id.is_none() {
            return Ok(false);
        }
        let snapshot = self.query_queue().await?;
        Ok(self.is_running(&snapshot))
    }

    /// Whether the output file contains the sentinel line.
    ///
    /// Once true, stays true until the next [`submit`](Self::submit).
    pub async fn is_finished(&mut self) -> SchedResult<bool> {
        if self.finished {
            return Ok(true);
        }

        let content = match fs::read(&self.output).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let token = self.config.finished_token.as_str();
        if String::from_utf8_lossy(&content)
            .lines()
            .any(|line| line == token)
        {
            tracing::debug!("Job {} finished", self.config.name);
            self.finished = true;
        }

        Ok(self.finished)
    }

    /// Submitted, no longer in `snapshot`, and no sentinel line.
    pub async fn is_failed(&mut self, snapshot: &QueueSnapshot) -> SchedResult<bool> {
        if !self.submitted || self.is_running(snapshot) {
            return Ok(false);
        }
        Ok(!self.is_finished().await?)
    }

    /// [`is_failed`](Self::is_failed) against a freshly fetched snapshot.
    pub async fn is_failed_now(&mut self) -> SchedResult<bool> {
        if !self.submitted {
            return Ok(false);
        }
        let snapshot = if self.job_id.is_some() {
            self.query_queue().await?
        } else {
            QueueSnapshot::new()
        };
        self.is_failed(&snapshot).await
    }

    /// Delete the output and error files of a previous run.
    pub async fn clear_output_files(&self) -> SchedResult<()> {
        for path in [&self.output, &self.error] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Start a new submission epoch and put the job in the batch queue.
    ///
    /// Output and error files from the previous epoch are removed first so a
    /// stale sentinel line cannot mark the new submission finished.
    pub async fn submit(&mut self) -> SchedResult<BatchJobId> {
        self.finished = false;
        self.submitted = true;
        self.job_id = None;
        self.clear_output_files().await?;

        let request = SubmitRequest {
            name: &self.config.name,
            directory: &self.config.directory,
            script: &self.script,
            output: &self.output,
            error: &self.error,
            time: &self.config.time,
            memory: &self.config.memory,
        };
        let job_id = self.adapter.submit(&request).await?;

        self.job_id = Some(job_id);
        self.submitted_at = Some(Utc::now());
        Ok(job_id)
    }

    /// Run the job on this host, outside any container, bypassing the batch
    /// system. Returns whether the sentinel line was written.
    pub async fn run_local(&mut self) -> SchedResult<bool> {
        let script = self.local_script.clone();
        self.run_script_locally(&script).await
    }

    /// Run the submit script on this host, starting the container if the job
    /// is container-wrapped.
    pub async fn run_local_in_container(&mut self) -> SchedResult<bool> {
        let script = self.script.clone();
        self.run_script_locally(&script).await
    }

    async fn run_script_locally(&mut self, script: &Path) -> SchedResult<bool> {
        self.submitted = true;
        self.finished = false;

        let stdout = fs::File::create(&self.output).await?.into_std().await;
        let stderr = stdout.try_clone()?;

        tracing::info!("Running {} locally", self.config.name);
        let status = Command::new("sh")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .await?;
        tracing::debug!("Local run of {} exited with {}", self.config.name, status);

        self.is_finished().await
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.config.name)
            .field("kind", &self.adapter.kind())
            .field("script", &self.script)
            .field("output", &self.output)
            .field("job_id", &self.job_id)
            .field("submitted", &self.submitted)
            .field("finished", &self.finished)
            .finish()
    }
}
