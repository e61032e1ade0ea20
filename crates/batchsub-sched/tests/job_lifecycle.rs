//! Job Lifecycle Integration Tests
//!
//! These tests run real shell scripts through `run_local` and drive a job set
//! against an in-process batch system, so they need neither SLURM nor HTCondor.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use batchsub_sched::{
    BatchAdapter, BatchJobId, ContainerWrapper, Job, JobConfig, JobSet, QueueSnapshot, SchedResult,
    SchedulerFactory, SchedulerKind, SubmitRequest,
};

/// Batch system stand-in: accepts every submission and reports whichever
/// ids the test puts in its queue.
struct MockQueue {
    next_id: AtomicU64,
    queue: Mutex<QueueSnapshot>,
    scripts: Mutex<Vec<PathBuf>>,
}

impl MockQueue {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(58508061),
            queue: Mutex::new(QueueSnapshot::new()),
            scripts: Mutex::new(Vec::new()),
        }
    }

    /// Scripts handed to the batch system so far, in order.
    fn submitted_scripts(&self) -> Vec<PathBuf> {
        self.scripts.lock().unwrap().clone()
    }

    fn set_queue(&self, ids: impl IntoIterator<Item = BatchJobId>) {
        *self.queue.lock().unwrap() = ids.into_iter().collect();
    }
}

#[async_trait]
impl BatchAdapter for MockQueue {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Slurm
    }

    async fn query_queue(&self) -> SchedResult<QueueSnapshot> {
        Ok(self.queue.lock().unwrap().clone())
    }

    async fn submit(&self, request: &SubmitRequest<'_>) -> SchedResult<BatchJobId> {
        self.scripts.lock().unwrap().push(request.script.to_path_buf());
        Ok(BatchJobId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Writes a wrapper that announces itself and then sources the job script,
/// standing in for a container launcher.
struct EchoWrapper;

#[async_trait]
impl ContainerWrapper for EchoWrapper {
    async fn wrap(&self, script: &Path) -> SchedResult<PathBuf> {
        let target = script.with_file_name("wrapped_container.sh");
        let body = format!("#!/bin/sh\necho 'inside container'\n. {}\n", script.display());
        tokio::fs::write(&target, body).await?;
        Ok(target)
    }
}

fn testing_config(dir: &Path) -> JobConfig {
    JobConfig::new("testing", dir.join("testing_directory"))
        .with_time("00:00:01")
        .with_memory("50M")
        .with_output("testing_output")
        .with_error("testing_error")
}

#[tokio::test]
async fn test_local_run_success() {
    let dir = tempfile::tempdir().unwrap();
    let config =
        testing_config(dir.path()).with_commands(["echo 'Hello World'", "echo '__FINISHED__'"]);
    let mut job = Job::create(config, Arc::new(MockQueue::new()), None)
        .await
        .unwrap();

    assert!(job.run_local().await.unwrap());

    let output = std::fs::read_to_string(job.output_path()).unwrap();
    assert!(output.contains("Hello World"));
    assert!(output.contains("__FINISHED__"));
    assert!(job.is_finished().await.unwrap());
    assert!(!job.is_failed(&QueueSnapshot::new()).await.unwrap());
}

#[tokio::test]
async fn test_local_run_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = testing_config(dir.path()).with_commands([
        "echo 'Hello World'",
        "exit 1",
        "echo '__FINISHED__'",
    ]);
    let mut job = Job::create(config, Arc::new(MockQueue::new()), None)
        .await
        .unwrap();

    assert!(!job.run_local().await.unwrap());

    let output = std::fs::read_to_string(job.output_path()).unwrap();
    assert!(output.contains("Hello World"));
    assert!(!output.contains("__FINISHED__"));
    assert!(!job.is_finished().await.unwrap());
    assert!(job.is_failed(&QueueSnapshot::new()).await.unwrap());
}

#[tokio::test]
async fn test_local_run_captures_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let config = testing_config(dir.path()).with_commands(["echo oops >&2"]);
    let mut job = Job::create(config, Arc::new(MockQueue::new()), None)
        .await
        .unwrap();

    job.run_local().await.unwrap();
    let output = std::fs::read_to_string(job.output_path()).unwrap();
    assert_eq!(output, "oops\n");
}

#[tokio::test]
async fn test_custom_finished_token() {
    let dir = tempfile::tempdir().unwrap();
    let config = testing_config(dir.path())
        .with_finished_token("ALL DONE")
        .with_commands(["echo '__FINISHED__'", "echo 'ALL DONE'"]);
    let mut job = Job::create(config, Arc::new(MockQueue::new()), None)
        .await
        .unwrap();

    assert!(job.run_local().await.unwrap());
}

#[tokio::test]
async fn test_set_resubmits_until_complete() {
    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(MockQueue::new());
    let factory = SchedulerFactory::with_adapter(queue.clone());

    let configs = (0..3).map(|i| {
        JobConfig::new(format!("sample_{i}"), dir.path()).with_time("workday")
    });
    let mut set: JobSet = factory.create_job_set(configs).await.unwrap();
    assert_eq!(set.jobs()[0].time(), "00:08:00");

    assert_eq!(set.submit().await.unwrap(), 3);
    let ids: Vec<BatchJobId> = set.jobs().iter().map(|j| j.job_id().unwrap()).collect();
    queue.set_queue(ids.iter().copied());
    assert!(!set.check_completion().await.unwrap());
    assert!(set.failed_jobs().await.unwrap().is_empty());

    // sample_0 finished; the others dropped out of the queue silently.
    std::fs::write(set.jobs()[0].output_path(), "__FINISHED__\n").unwrap();
    queue.set_queue([]);
    assert_eq!(set.failed_jobs().await.unwrap().len(), 2);
    assert_eq!(set.resubmit_jobs().await.unwrap(), 2);

    let resubmitted: Vec<BatchJobId> = set.jobs()[1..]
        .iter()
        .map(|j| j.job_id().unwrap())
        .collect();
    assert!(resubmitted.iter().all(|id| !ids.contains(id)));

    for job in &set.jobs()[1..] {
        std::fs::write(job.output_path(), "__FINISHED__\n").unwrap();
    }
    assert!(set.check_completion().await.unwrap());
    assert_eq!(set.summary().await.unwrap().finished, 3);
}

#[tokio::test]
async fn test_container_job_submits_wrapped_script() {
    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(MockQueue::new());
    let config = testing_config(dir.path())
        .in_container(true)
        .with_commands(["echo 'Hello World'", "echo '__FINISHED__'"]);
    let mut job = Job::create(config, queue.clone(), Some(&EchoWrapper))
        .await
        .unwrap();

    assert_ne!(job.script_path(), job.local_script_path());
    assert!(job.script_path().ends_with("wrapped_container.sh"));
    assert!(job.local_script_path().ends_with("testing.sh"));

    job.submit().await.unwrap();
    assert_eq!(queue.submitted_scripts(), [job.script_path().to_path_buf()]);

    // Without the container only the job's own commands run.
    assert!(job.run_local().await.unwrap());
    let output = std::fs::read_to_string(job.output_path()).unwrap();
    assert!(!output.contains("inside container"));
    assert!(output.contains("Hello World"));

    // With it the wrapper runs first.
    assert!(job.run_local_in_container().await.unwrap());
    let output = std::fs::read_to_string(job.output_path()).unwrap();
    assert_eq!(output, "inside container\nHello World\n__FINISHED__\n");
}

#[tokio::test]
async fn test_set_runs_member_in_container() {
    let dir = tempfile::tempdir().unwrap();
    let factory = SchedulerFactory::with_adapter(Arc::new(MockQueue::new()))
        .with_wrapper(Arc::new(EchoWrapper));
    let config = JobConfig::new("boxed", dir.path())
        .with_time("00:00:01")
        .in_container(true)
        .with_command("echo '__FINISHED__'");
    let mut set = factory.create_job_set([config]).await.unwrap().with_seed(7);

    assert_eq!(set.test_job_in_container().await.unwrap(), Some(0));
    let output = std::fs::read_to_string(set.jobs()[0].output_path()).unwrap();
    assert!(output.starts_with("inside container\n"));

    assert_eq!(set.test_job_locally().await.unwrap(), Some(0));
    let output = std::fs::read_to_string(set.jobs()[0].output_path()).unwrap();
    assert_eq!(output, "__FINISHED__\n");
}
