//! Detect command implementation.

use anyhow::Result;
use console::style;

use batchsub_sched::{ResilientExecutor, detect_scheduler};

use super::common::SchedulerArgs;

/// Execute the detect command.
pub async fn execute(args: &SchedulerArgs) -> Result<()> {
    let config = args.factory_config()?;
    let executor = ResilientExecutor::system()
        .with_policy(config.retry)
        .with_probe_policy(config.probe);

    let kind = detect_scheduler(&executor, &config)
        .await
        .map_err(|e| anyhow::anyhow!("Detection failed: {e}"))?;

    let how = if config.scheduler.is_some() {
        "forced"
    } else {
        "detected"
    };
    println!(
        "{} {} ({})",
        style("✓").green().bold(),
        style(kind).cyan().bold(),
        style(how).dim()
    );
    println!("  Queue command: {}", kind.queue_command());
    Ok(())
}
