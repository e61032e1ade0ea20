//! Bulk operations over jobs that share one batch system.
//!
//! Every bulk operation fetches a single queue snapshot and evaluates every
//! member against it, so polling a set of N jobs costs one scheduler query
//! rather than N.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::adapter::QueueSnapshot;
use crate::error::{SchedError, SchedResult};
use crate::job::Job;

/// Per-state member counts against one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobSetSummary {
    pub total: usize,
    pub unsubmitted: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
}

impl JobSetSummary {
    /// Every member has finished.
    pub fn is_complete(&self) -> bool {
        self.finished == self.total
    }
}

/// A collection of jobs bound to the same batch system.
#[derive(Debug)]
pub struct JobSet {
    jobs: Vec<Job>,
    rng: StdRng,
}

impl JobSet {
    /// Wrap a collection of jobs. Jobs bound to different batch systems are
    /// rejected.
    pub fn new(jobs: Vec<Job>) -> SchedResult<Self> {
        if let Some(first) = jobs.first() {
            let kind = first.kind();
            if let Some(other) = jobs.iter().find(|job| job.kind() != kind) {
                return Err(SchedError::ConfigError(format!(
                    "job '{}' uses {} but job '{}' uses {}; a job set needs a single batch system",
                    other.name(),
                    other.kind(),
                    first.name(),
                    kind
                )));
            }
        }

        Ok(Self {
            jobs,
            rng: StdRng::from_entropy(),
        })
    }

    /// Seed the generator used by [`test_job_locally`](Self::test_job_locally).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job_mut(&mut self, index: usize) -> Option<&mut Job> {
        self.jobs.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// One queue snapshot through the first member's adapter.
    async fn snapshot(&self) -> SchedResult<Option<QueueSnapshot>> {
        match self.jobs.first() {
            Some(job) => Ok(Some(job.query_queue().await?)),
            None => Ok(None),
        }
    }

    /// Whether every member has left the queue with its sentinel written.
    pub async fn check_completion(&mut self) -> SchedResult<bool> {
        let Some(snapshot) = self.snapshot().await? else {
            return Ok(true);
        };

        for job in &mut self.jobs {
            if job.is_running(&snapshot) || !job.is_finished().await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Submit every member that is not queued or running. Returns how many
    /// were submitted.
    pub async fn submit(&mut self) -> SchedResult<usize> {
        let Some(snapshot) = self.snapshot().await? else {
            return Ok(0);
        };

        let mut submitted = 0;
        for job in &mut self.jobs {
            if job.is_running(&snapshot) {
                tracing::debug!("Job {} is still queued, not resubmitting", job.name());
                continue;
            }
            job.submit().await?;
            submitted += 1;
        }
        Ok(submitted)
    }

    async fn failed_indices(&mut self, snapshot: &QueueSnapshot) -> SchedResult<Vec<usize>> {
        let mut failed = Vec::new();
        for (index, job) in self.jobs.iter_mut().enumerate() {
            if job.is_failed(snapshot).await? {
                failed.push(index);
            }
        }
        Ok(failed)
    }

    /// The members that were submitted, left the queue, and never wrote their
    /// sentinel.
    pub async fn failed_jobs(&mut self) -> SchedResult<Vec<&Job>> {
        let Some(snapshot) = self.snapshot().await? else {
            return Ok(Vec::new());
        };

        let failed = self.failed_indices(&snapshot).await?;
        Ok(failed.into_iter().map(|index| &self.jobs[index]).collect())
    }

    /// Submit exactly the failed members again. Returns how many were resubmitted.
    pub async fn resubmit_jobs(&mut self) -> SchedResult<usize> {
        let Some(snapshot) = self.snapshot().await? else {
            return Ok(0);
        };

        let failed = self.failed_indices(&snapshot).await?;
        for &index in &failed {
            let job = &mut self.jobs[index];
            tracing::info!("Resubmitting failed job {}", job.name());
            job.submit().await?;
        }
        Ok(failed.len())
    }

    /// Run one randomly chosen member on this host as a smoke test of the
    /// set's job definitions. Returns its index, or `None` for an empty set.
    pub async fn test_job_locally(&mut self) -> SchedResult<Option<usize>> {
        self.run_random_member(false).await
    }

    /// Like [`test_job_locally`](Self::test_job_locally), but container jobs
    /// run their wrapped script.
    pub async fn test_job_in_container(&mut self) -> SchedResult<Option<usize>> {
        self.run_random_member(true).await
    }

    async fn run_random_member(&mut self, in_container: bool) -> SchedResult<Option<usize>> {
        if self.jobs.is_empty() {
            return Ok(None);
        }

        let index = self.rng.gen_range(0..self.jobs.len());
        let job = &mut self.jobs[index];
        let finished = if in_container {
            job.run_local_in_container().await?
        } else {
            job.run_local().await?
        };
        tracing::info!(
            "Local test of {} {}",
            job.name(),
            if finished { "finished" } else { "did not finish" }
        );
        Ok(Some(index))
    }

    /// Count members by state against one snapshot.
    pub async fn summary(&mut self) -> SchedResult<JobSetSummary> {
        let mut summary = JobSetSummary {
            total: self.jobs.len(),
            ..Default::default()
        };
        let Some(snapshot) = self.snapshot().await? else {
            return Ok(summary);
        };

        for job in &mut self.jobs {
            if !job.is_submitted() {
                summary.unsubmitted += 1;
            } else if job.is_running(&snapshot) {
                summary.running += 1;
            } else if job.is_finished().await? {
                summary.finished += 1;
            } else {
                summary.failed += 1;
            }
        }
        Ok(summary)
    }
}
