//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde::Deserialize;

use batchsub_sched::{FactoryConfig, JobConfig, JobSetSummary, SchedulerFactory, SchedulerKind};

/// Global options that select and configure the batch system.
#[derive(Debug, Clone, Default)]
pub struct SchedulerArgs {
    pub scheduler: Option<String>,
    pub user: Option<String>,
}

impl SchedulerArgs {
    /// The forced batch system, if one was given.
    pub fn kind(&self) -> Result<Option<SchedulerKind>> {
        self.scheduler
            .as_deref()
            .map(|s| s.parse::<SchedulerKind>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Factory configuration reflecting the command-line options.
    pub fn factory_config(&self) -> Result<FactoryConfig> {
        let mut config = FactoryConfig::default();
        if let Some(kind) = self.kind()? {
            config = config.with_scheduler(kind);
        }
        if let Some(user) = &self.user {
            config = config.with_user(user.as_str());
        }
        Ok(config)
    }
}

/// A YAML file listing job definitions.
///
/// ```yaml
/// jobs:
///   - name: sample_0
///     directory: /scratch/run
///     time: "00:30:00"
///     memory: 2G
///     output: sample_0
///     error: sample_0
///     commands:
///       - ./simulate --seed 0
///       - echo '__FINISHED__'
/// ```
#[derive(Debug, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<JobConfig>,
}

/// Load a job file.
pub fn load_job_file(path: &str) -> Result<JobFile> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    let file: JobFile = serde_yaml_ng::from_str(&source)
        .with_context(|| format!("Failed to parse job file: {path}"))?;

    if file.jobs.is_empty() {
        anyhow::bail!("Job file {path} defines no jobs");
    }
    Ok(file)
}

/// Build a scheduler factory, probing the host unless a batch system was forced.
pub async fn create_factory(args: &SchedulerArgs) -> Result<SchedulerFactory> {
    let config = args.factory_config()?;
    SchedulerFactory::detect(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to set up batch system: {e}"))
}

/// Print per-state job counts.
pub fn print_summary(summary: &JobSetSummary) {
    println!(
        "  {} finished, {} running, {} failed, {} not submitted ({} total)",
        style(summary.finished).green(),
        style(summary.running).cyan(),
        style(summary.failed).red(),
        style(summary.unsubmitted).yellow(),
        summary.total
    );
}

/// One-line progress message for a spinner.
pub fn progress_message(summary: &JobSetSummary) -> String {
    format!(
        "{}/{} finished, {} running, {} failed",
        summary.finished, summary.total, summary.running, summary.failed
    )
}
