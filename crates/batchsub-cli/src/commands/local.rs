//! Local command implementation.
//!
//! Pick one job from a job file and run it on this host, bypassing the batch
//! system, to check the job definitions before submitting them all.

use anyhow::Result;
use console::style;

use super::common::{SchedulerArgs, create_factory, load_job_file};

/// Execute the local command.
pub async fn execute(
    file: &str,
    args: &SchedulerArgs,
    seed: Option<u64>,
    in_container: bool,
) -> Result<()> {
    let job_file = load_job_file(file)?;
    let factory = create_factory(args).await?;

    let mut jobs = factory
        .create_job_set(job_file.jobs)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create jobs: {e}"))?;
    if let Some(seed) = seed {
        jobs = jobs.with_seed(seed);
    }

    let picked = if in_container {
        jobs.test_job_in_container().await
    } else {
        jobs.test_job_locally().await
    };
    let index = picked
        .map_err(|e| anyhow::anyhow!("Local run failed: {e}"))?
        .ok_or_else(|| anyhow::anyhow!("Job file defines no jobs"))?;

    let job = jobs
        .job_mut(index)
        .ok_or_else(|| anyhow::anyhow!("Picked job {index} is out of range"))?;
    let finished = job
        .is_finished()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read job output: {e}"))?;

    println!("{} Ran {} locally", style("→").cyan().bold(), job.name());
    println!("  Script: {}", job.local_script_path().display());
    println!("  Output: {}", job.output_path().display());

    if !finished {
        anyhow::bail!(
            "Job {} did not write '{}' to its output",
            job.name(),
            job.finished_token()
        );
    }

    println!("{} Job {} finished", style("✓").green().bold(), job.name());
    Ok(())
}
