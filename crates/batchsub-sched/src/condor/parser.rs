//! Parsers for HTCondor command output.

use crate::adapter::{BatchJobId, QueueSnapshot};
use crate::error::{SchedError, SchedResult};

/// HTCondor job status.
///
/// HTCondor reports the `JobStatus` ClassAd attribute as an integer:
/// - 1: Idle (waiting in queue)
/// - 2: Running
/// - 3: Removed
/// - 4: Completed
/// - 5: Held
/// - 6: Transferring output
/// - 7: Suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondorJobStatus {
    Idle,
    Running,
    Removed,
    Completed,
    Held,
    TransferringOutput,
    Suspended,
    Unknown(i64),
}

impl CondorJobStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => CondorJobStatus::Idle,
            2 => CondorJobStatus::Running,
            3 => CondorJobStatus::Removed,
            4 => CondorJobStatus::Completed,
            5 => CondorJobStatus::Held,
            6 => CondorJobStatus::TransferringOutput,
            7 => CondorJobStatus::Suspended,
            other => CondorJobStatus::Unknown(other),
        }
    }

    /// Whether the job still counts as queued or running.
    ///
    /// Held and suspended jobs are excluded; a job stuck in either state is
    /// reported as failed once it leaves the Idle/Running set.
    pub fn is_active(&self) -> bool {
        matches!(self, CondorJobStatus::Idle | CondorJobStatus::Running)
    }
}

/// Parse `condor_q -af ClusterId JobStatus` output.
///
/// Each line holds a cluster id and a status code:
/// ```text
/// 4521 2
/// 4522 1
/// 4523 5
/// ```
/// Clusters with several procs appear once per proc; the snapshot dedupes them.
pub fn parse_condor_q_output(output: &str) -> SchedResult<QueueSnapshot> {
    let mut snapshot = QueueSnapshot::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [cluster, status] = fields.as_slice() else {
            return Err(SchedError::parse(
                "condor_q",
                format!("expected '<ClusterId> <JobStatus>', found '{line}'"),
            ));
        };

        let cluster = cluster.parse::<u64>().map_err(|_| {
            SchedError::parse("condor_q", format!("invalid cluster id in '{line}'"))
        })?;
        let status = status.parse::<i64>().map_err(|_| {
            SchedError::parse("condor_q", format!("invalid job status in '{line}'"))
        })?;

        if CondorJobStatus::from_code(status).is_active() {
            snapshot.insert(BatchJobId(cluster));
        }
    }

    Ok(snapshot)
}

/// Parse condor_submit output to extract the cluster id.
///
/// condor_submit output format:
/// ```text
/// Submitting job(s).
/// 1 job(s) submitted to cluster 4521.
/// ```
pub fn parse_condor_submit_output(output: &str) -> SchedResult<BatchJobId> {
    let trimmed = output.trim();

    let token = trimmed
        .split_whitespace()
        .last()
        .map(|t| t.trim_end_matches('.'))
        .unwrap_or_default();

    token
        .parse::<u64>()
        .map(BatchJobId)
        .map_err(|_| SchedError::parse("condor_submit", format!("no cluster id in '{trimmed}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CondorJobStatus::from_code(1), CondorJobStatus::Idle);
        assert_eq!(CondorJobStatus::from_code(2), CondorJobStatus::Running);
        assert_eq!(CondorJobStatus::from_code(4), CondorJobStatus::Completed);
        assert_eq!(CondorJobStatus::from_code(5), CondorJobStatus::Held);
        assert_eq!(CondorJobStatus::from_code(42), CondorJobStatus::Unknown(42));

        assert!(CondorJobStatus::Idle.is_active());
        assert!(CondorJobStatus::Running.is_active());
        assert!(!CondorJobStatus::Held.is_active());
        assert!(!CondorJobStatus::Completed.is_active());
        assert!(!CondorJobStatus::Removed.is_active());
    }

    #[test]
    fn test_parse_condor_q_output() {
        let output = "4521 2\n4522 1\n4523 5\n4524 4\n4521 2\n";
        let snapshot = parse_condor_q_output(output).unwrap();
        let expected: QueueSnapshot = [4521u64, 4522].into_iter().collect();
        assert_eq!(snapshot, expected);
    }

    #[test]
    fn test_parse_condor_q_output_empty() {
        assert!(parse_condor_q_output("").unwrap().is_empty());
        assert!(parse_condor_q_output("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_condor_q_output_malformed() {
        assert!(parse_condor_q_output("4521\n").is_err());
        assert!(parse_condor_q_output("undefined 2\n").is_err());
        assert!(parse_condor_q_output("4521 running\n").is_err());
    }

    #[test]
    fn test_parse_condor_submit_output() {
        let output = "Submitting job(s).\n1 job(s) submitted to cluster 4521.\n";
        assert_eq!(parse_condor_submit_output(output).unwrap(), BatchJobId(4521));

        let output = "  1 job(s) submitted to cluster 77 \n";
        assert_eq!(parse_condor_submit_output(output).unwrap(), BatchJobId(77));
    }

    #[test]
    fn test_parse_condor_submit_output_error() {
        let output = "ERROR: Failed to connect to local queue manager\n";
        assert!(matches!(
            parse_condor_submit_output(output),
            Err(SchedError::ParseError { .. })
        ));
    }
}
