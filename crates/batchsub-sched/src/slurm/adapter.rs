//! SLURM adapter for job submission and queue tracking.

use async_trait::async_trait;

use crate::adapter::{BatchAdapter, BatchJobId, QueueSnapshot, SchedulerKind, SubmitRequest};
use crate::error::SchedResult;
use crate::executor::{CommandSpec, ResilientExecutor};
use crate::slurm::parser;

/// Adapter for the SLURM workload manager.
#[derive(Debug, Clone)]
pub struct SlurmAdapter {
    executor: ResilientExecutor,
    /// User whose jobs make up the queue snapshot.
    user: String,
}

impl SlurmAdapter {
    /// Create a SLURM adapter that queries the queue of `user`.
    pub fn new(executor: ResilientExecutor, user: impl Into<String>) -> Self {
        Self {
            executor,
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Build the `squeue` invocation for the configured user.
    pub fn queue_command(&self) -> CommandSpec {
        CommandSpec::new("squeue").args(["-u", self.user.as_str()])
    }

    /// Build the `sbatch` invocation for a job.
    pub fn submission_command(request: &SubmitRequest<'_>) -> CommandSpec {
        CommandSpec::new("sbatch")
            .arg(format!("--mem={}", request.memory))
            .arg(format!("--time={}", request.time))
            .arg(format!("--output={}", request.output.display()))
            .arg(format!("--error={}", request.error.display()))
            .arg(request.script.display().to_string())
    }
}

#[async_trait]
impl BatchAdapter for SlurmAdapter {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Slurm
    }

    async fn query_queue(&self) -> SchedResult<QueueSnapshot> {
        let output = self.executor.run(&self.queue_command()).await?;
        parser::parse_squeue_output(&output)
    }

    async fn submit(&self, request: &SubmitRequest<'_>) -> SchedResult<BatchJobId> {
        let command = Self::submission_command(request);
        let output = self.executor.run(&command).await?;
        let job_id = parser::parse_sbatch_output(&output)?;
        tracing::info!("Submitted {} to SLURM as job {}", request.name, job_id);
        Ok(job_id)
    }
}
