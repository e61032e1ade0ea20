//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - batch job submission for SLURM and HTCondor",
        style("batchsub").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Batch systems:");
    for kind in batchsub_sched::SchedulerKind::ALL {
        let state = if kind.is_enabled() {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        println!("  {:<8} {:<10} {}", kind.name(), kind.queue_command(), state);
    }
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
