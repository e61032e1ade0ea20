//! SLURM integration: `squeue` for the queue, `sbatch` for submission.

mod adapter;
mod parser;

pub use adapter::SlurmAdapter;
pub use parser::{parse_sbatch_output, parse_squeue_output};
