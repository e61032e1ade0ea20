//! Translate command implementation.
//!
//! Show how a wall-time (and optionally memory) request is rewritten for a
//! batch system.

use anyhow::Result;
use console::style;

use batchsub_sched::{
    ResilientExecutor, SchedulerKind, detect_scheduler, translate_memory, translate_time,
};

use super::common::SchedulerArgs;

/// Execute the translate command.
pub async fn execute(
    time: &str,
    memory: Option<&str>,
    to: Option<&str>,
    args: &SchedulerArgs,
) -> Result<()> {
    let kind = match to {
        Some(to) => to
            .parse::<SchedulerKind>()
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        None => {
            let config = args.factory_config()?;
            let executor = ResilientExecutor::system().with_probe_policy(config.probe);
            detect_scheduler(&executor, &config)
                .await
                .map_err(|e| anyhow::anyhow!("Detection failed: {e}"))?
        }
    };

    let translated = translate_time(kind, time).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!(
        "{} {} {} {} ({})",
        style("time").bold(),
        time,
        style("→").cyan(),
        style(&translated).green(),
        kind
    );

    if let Some(memory) = memory {
        let memory = translate_memory(kind, memory).map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{} {}", style("memory").bold(), style(memory).green());
    }

    Ok(())
}
