//! Run command implementation.
//!
//! Submit every job in a job file, then poll the queue until all of them
//! have finished, resubmitting failures a bounded number of times.

use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::common::{
    SchedulerArgs, create_factory, load_job_file, print_summary, progress_message,
};

/// Polling and resubmission settings.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub poll_interval: u64,
    pub max_resubmits: u32,
    pub wait: bool,
}

/// Execute the run command.
pub async fn execute(file: &str, args: &SchedulerArgs, options: RunOptions) -> Result<()> {
    let job_file = load_job_file(file)?;
    let factory = create_factory(args).await?;

    println!(
        "{} Creating {} job(s) for {}",
        style("→").cyan().bold(),
        job_file.jobs.len(),
        style(factory.kind()).yellow()
    );

    let mut jobs = factory
        .create_job_set(job_file.jobs)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create jobs: {e}"))?;

    let submitted = jobs
        .submit()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to submit jobs: {e}"))?;

    println!(
        "{} Submitted {} job(s) at {}",
        style("✓").green().bold(),
        submitted,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for job in jobs.jobs() {
        if let Some(id) = job.job_id() {
            println!("  {:<24} {}", job.name(), style(id).dim());
        }
    }

    if !options.wait {
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Waiting for jobs to complete...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut rounds = 0;
    loop {
        tokio::time::sleep(Duration::from_secs(options.poll_interval)).await;

        let summary = jobs
            .summary()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query queue: {e}"))?;
        tracing::debug!("Queue poll: {:?}", summary);
        spinner.set_message(progress_message(&summary));

        if summary.is_complete() {
            spinner.finish_and_clear();
            println!("{} All jobs finished", style("✓").green().bold());
            print_summary(&summary);
            return Ok(());
        }

        if summary.failed == 0 {
            continue;
        }

        if rounds < options.max_resubmits {
            rounds += 1;
            let resubmitted = jobs
                .resubmit_jobs()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to resubmit jobs: {e}"))?;
            spinner.println(format!(
                "{} Resubmitted {} failed job(s) (round {}/{})",
                style("↻").yellow().bold(),
                resubmitted,
                rounds,
                options.max_resubmits
            ));
        } else if summary.running == 0 {
            spinner.finish_and_clear();
            let failed = jobs
                .failed_jobs()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to query queue: {e}"))?;
            for job in &failed {
                println!(
                    "  {} {} (see {})",
                    style("✗").red().bold(),
                    job.name(),
                    job.error_path().display()
                );
            }
            print_summary(&summary);
            anyhow::bail!(
                "{} job(s) failed after {} resubmission round(s)",
                failed.len(),
                rounds
            );
        }
    }
}
