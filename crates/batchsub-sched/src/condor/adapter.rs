//! HTCondor adapter for job submission and queue tracking.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use crate::adapter::{BatchAdapter, BatchJobId, QueueSnapshot, SchedulerKind, SubmitRequest};
use crate::condor::parser;
use crate::condor::submit::SubmitDescription;
use crate::error::SchedResult;
use crate::executor::{CommandSpec, ResilientExecutor};

/// Adapter for the HTCondor scheduler.
#[derive(Debug, Clone)]
pub struct CondorAdapter {
    executor: ResilientExecutor,
    /// Owner whose jobs make up the queue snapshot.
    user: String,
}

impl CondorAdapter {
    /// Create an HTCondor adapter that queries the jobs owned by `user`.
    pub fn new(executor: ResilientExecutor, user: impl Into<String>) -> Self {
        Self {
            executor,
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Build the `condor_q` invocation for the configured owner.
    pub fn queue_command(&self) -> CommandSpec {
        CommandSpec::new("condor_q")
            .arg("-constraint")
            .arg(format!("Owner == \"{}\"", self.user))
            .args(["-af", "ClusterId", "JobStatus"])
    }

    /// Create the log, output and error files up front, writable by anyone.
    ///
    /// The schedd may write them as a different user than the submitter.
    async fn prepare_files(description: &SubmitDescription, directory: &Path) -> SchedResult<()> {
        for path in [&description.log, &description.output, &description.error] {
            fs::write(path, b"").await?;
            set_world_writable(path).await?;
        }
        set_world_writable(directory).await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn set_world_writable(path: &Path) -> SchedResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_world_writable(_path: &Path) -> SchedResult<()> {
    Ok(())
}

#[async_trait]
impl BatchAdapter for CondorAdapter {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Condor
    }

    async fn query_queue(&self) -> SchedResult<QueueSnapshot> {
        let output = self.executor.run(&self.queue_command()).await?;
        parser::parse_condor_q_output(&output)
    }

    async fn submit(&self, request: &SubmitRequest<'_>) -> SchedResult<BatchJobId> {
        let description = SubmitDescription::for_request(request);
        Self::prepare_files(&description, request.directory).await?;

        let sub_file = description.path();
        fs::write(&sub_file, description.render()).await?;

        let command = CommandSpec::new("condor_submit").arg(sub_file.display().to_string());
        let result = self.executor.run(&command).await;

        if let Err(e) = fs::remove_file(&sub_file).await {
            tracing::warn!(
                "Could not remove submit description {}: {}",
                sub_file.display(),
                e
            );
        }

        let job_id = parser::parse_condor_submit_output(&result?)?;
        tracing::info!("Submitted {} to HTCondor as cluster {}", request.name, job_id);
        Ok(job_id)
    }
}
