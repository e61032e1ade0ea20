//! batchsub Command-Line Interface
//!
//! Submit shell jobs to whichever batch system this host runs (HTCondor or
//! SLURM), wait for them, and resubmit the ones that fail.
//!
//! ```text
//! batchsub run -f jobs.yaml --poll-interval 60 --max-resubmits 3
//! batchsub local -f jobs.yaml --seed 42
//! batchsub translate --time 00:45:00 --to condor
//! batchsub detect
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::SchedulerArgs;
use commands::{detect, local, run, translate, version};

/// batchsub - batch job submission for SLURM and HTCondor clusters
#[derive(Parser)]
#[command(name = "batchsub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Batch system to use instead of probing the host (slurm, condor)
    #[arg(long, global = true, env = "BATCHSUB_SCHEDULER")]
    scheduler: Option<String>,

    /// User whose queue is tracked (defaults to $USER)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every job in a job file and wait for all of them to finish
    Run {
        /// Job file (YAML)
        #[arg(short, long)]
        file: String,

        /// Seconds between queue polls
        #[arg(long, default_value = "60")]
        poll_interval: u64,

        /// Rounds of resubmission before giving up on failed jobs
        #[arg(long, default_value = "3")]
        max_resubmits: u32,

        /// Submit and exit without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Run one job from a job file on this host as a smoke test
    Local {
        /// Job file (YAML)
        #[arg(short, long)]
        file: String,

        /// Seed for picking the job
        #[arg(long)]
        seed: Option<u64>,

        /// Run the container-wrapped script for container jobs
        #[arg(long)]
        in_container: bool,
    },

    /// Translate a wall-time request for a batch system
    Translate {
        /// Wall time (HH:MM:SS) or job flavour
        #[arg(short, long)]
        time: String,

        /// Memory request to check
        #[arg(short, long)]
        memory: Option<String>,

        /// Target batch system (defaults to the detected one)
        #[arg(long)]
        to: Option<String>,
    },

    /// Detect the batch system available on this host
    Detect,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let scheduler = SchedulerArgs {
        scheduler: cli.scheduler,
        user: cli.user,
    };

    // Execute command
    let result = match cli.command {
        Commands::Run {
            file,
            poll_interval,
            max_resubmits,
            no_wait,
        } => {
            let options = run::RunOptions {
                poll_interval,
                max_resubmits,
                wait: !no_wait,
            };
            run::execute(&file, &scheduler, options).await
        }

        Commands::Local {
            file,
            seed,
            in_container,
        } => local::execute(&file, &scheduler, seed, in_container).await,

        Commands::Translate { time, memory, to } => {
            translate::execute(&time, memory.as_deref(), to.as_deref(), &scheduler).await
        }

        Commands::Detect => detect::execute(&scheduler).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
