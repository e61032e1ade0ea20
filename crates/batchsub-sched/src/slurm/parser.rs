//! Parsers for SLURM command output.

use crate::adapter::{BatchJobId, QueueSnapshot};
use crate::error::{SchedError, SchedResult};

/// Parse sbatch output to extract the job ID.
///
/// sbatch output format: "Submitted batch job 12345". The last token is the
/// id; trailing periods are tolerated.
pub fn parse_sbatch_output(output: &str) -> SchedResult<BatchJobId> {
    let trimmed = output.trim();

    let token = trimmed
        .split_whitespace()
        .last()
        .map(|t| t.trim_end_matches('.'))
        .unwrap_or_default();

    token
        .parse::<u64>()
        .map(BatchJobId)
        .map_err(|_| SchedError::parse("sbatch", format!("no job id in '{trimmed}'")))
}

/// Parse `squeue -u <user>` output into the set of listed job ids.
///
/// The first line is a header. Every other non-blank line starts with the
/// job id:
/// ```text
/// JOBID     USER     ACCOUNT          NAME     ST  TIME_LEFT NODES ...
/// 58508061  alice    def-group_cpu    test.sh  PD       1:00     1 ...
/// 58508070_[1-10] alice def-group_cpu arr.sh  PD       1:00     1 ...
/// ```
///
/// Array (`<id>_<index>`) and heterogeneous (`<id>+<offset>`) entries are
/// recorded under their base id, which is what `sbatch` reported.
pub fn parse_squeue_output(output: &str) -> SchedResult<QueueSnapshot> {
    let lines: Vec<&str> = output.trim_end().lines().collect();

    // Header only, or nothing at all.
    if lines.len() < 2 {
        return Ok(QueueSnapshot::new());
    }

    let mut snapshot = QueueSnapshot::new();
    for line in &lines[1..] {
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        let id = base_job_id(first).ok_or_else(|| {
            SchedError::parse("squeue", format!("expected a job id, found '{}'", line.trim()))
        })?;
        snapshot.insert(BatchJobId(id));
    }

    Ok(snapshot)
}

/// `58508070`, `58508070_3`, `58508070_[1-10]` and `123+0` all yield the
/// leading number.
fn base_job_id(field: &str) -> Option<u64> {
    let digits = field.bytes().take_while(u8::is_ascii_digit).count();
    let (id, rest) = field.split_at(digits);
    if !(rest.is_empty() || rest.starts_with('_') || rest.starts_with('+')) {
        return None;
    }
    id.parse().ok()
}
