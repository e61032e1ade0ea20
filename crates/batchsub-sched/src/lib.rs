//! Batch Job Submission for SLURM and HTCondor Clusters
//!
//! This crate runs shell jobs on whichever HPC batch system the host provides,
//! without the caller knowing which one it is, and tracks every job until it
//! has finished or needs to be resubmitted.
//!
//! # Overview
//!
//! 1. **Detection**: Probe for the batch system once per process
//! 2. **Translation**: Rewrite wall-time requests into the detected system's grammar
//! 3. **Submission**: Write a job script and hand it to the batch system
//! 4. **Tracking**: Poll one shared queue snapshot for a whole set of jobs
//! 5. **Recovery**: Collect failed jobs and resubmit them
//!
//! A job counts as finished only when its output file contains the sentinel
//! line (`__FINISHED__` by default). A job that has left the queue without
//! writing it has failed.
//!
//! # Supported Schedulers
//!
//! | Scheduler | Commands | Wall time |
//! |-----------|----------|-----------|
//! | HTCondor | condor_submit, condor_q | Job flavour (`espresso` .. `nextweek`) |
//! | SLURM | sbatch, squeue | `HH:MM:SS` |
//!
//! Every scheduler command is retried up to ten times before its error is
//! returned.
//!
//! # Example: Submit and Wait
//!
//! ```ignore
//! use batchsub_sched::{FactoryConfig, JobConfig, SchedulerFactory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let factory = SchedulerFactory::detect(&FactoryConfig::default()).await?;
//!
//!     let configs = (0..10).map(|i| {
//!         JobConfig::new(format!("sample_{i}"), "/scratch/run")
//!             .with_time("00:30:00")
//!             .with_memory("2G")
//!             .with_commands([
//!                 format!("./simulate --seed {i}"),
//!                 "echo '__FINISHED__'".to_string(),
//!             ])
//!     });
//!     let mut jobs = factory.create_job_set(configs).await?;
//!
//!     jobs.submit().await?;
//!     while !jobs.check_completion().await? {
//!         tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!         jobs.resubmit_jobs().await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Example: Local Smoke Test
//!
//! ```ignore
//! let mut jobs = factory.create_job_set(configs).await?.with_seed(42);
//! if let Some(index) = jobs.test_job_locally().await? {
//!     println!("ran {}", jobs.jobs()[index].name());
//! }
//! ```

pub mod adapter;
#[cfg(feature = "condor")]
pub mod condor;
pub mod config;
pub mod duration;
pub mod error;
pub mod executor;
pub mod factory;
pub mod job;
pub mod job_set;
pub mod script;
#[cfg(feature = "slurm")]
pub mod slurm;

// Re-exports
pub use adapter::{BatchAdapter, BatchJobId, QueueSnapshot, SchedulerKind, SubmitRequest};
#[cfg(feature = "condor")]
pub use condor::CondorAdapter;
pub use config::FactoryConfig;
pub use duration::{Tier, WallTime};
pub use error::{SchedError, SchedResult};
pub use executor::{CommandRunner, CommandSpec, ProcessRunner, ResilientExecutor, RetryPolicy};
pub use factory::{SchedulerFactory, detect_scheduler, translate_memory, translate_time};
pub use job::{DEFAULT_FINISHED_TOKEN, Job, JobConfig};
pub use job_set::{JobSet, JobSetSummary};
pub use script::{BatchScriptWrapper, ContainerWrapper};
#[cfg(feature = "slurm")]
pub use slurm::SlurmAdapter;
