//! The scheduler adapter abstraction shared by every backend.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};

/// The kind of batch system a job is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// SLURM: requests a literal `HH:MM:SS` wall time.
    Slurm,
    /// HTCondor: requests a named job flavour.
    Condor,
}

impl SchedulerKind {
    /// Every kind, in detection priority order.
    pub const ALL: [SchedulerKind; 2] = [SchedulerKind::Condor, SchedulerKind::Slurm];

    pub fn name(&self) -> &'static str {
        match self {
            SchedulerKind::Slurm => "slurm",
            SchedulerKind::Condor => "condor",
        }
    }

    /// The control command whose presence reveals this batch system.
    pub fn queue_command(&self) -> &'static str {
        match self {
            SchedulerKind::Slurm => "squeue",
            SchedulerKind::Condor => "condor_q",
        }
    }

    /// Whether support for this kind was compiled in.
    pub fn is_enabled(&self) -> bool {
        match self {
            SchedulerKind::Slurm => cfg!(feature = "slurm"),
            SchedulerKind::Condor => cfg!(feature = "condor"),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchedulerKind {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slurm" => Ok(SchedulerKind::Slurm),
            "condor" | "htcondor" => Ok(SchedulerKind::Condor),
            other => Err(SchedError::ConfigError(format!(
                "unknown batch system '{other}' (expected 'slurm' or 'condor')"
            ))),
        }
    }
}

/// A scheduler-assigned job id (SLURM job id, HTCondor cluster id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchJobId(pub u64);

impl BatchJobId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ids queued or running for the invoking user at the moment it was fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    ids: FxHashSet<BatchJobId>,
}

impl QueueSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: BatchJobId) -> bool {
        self.ids.contains(&id)
    }

    pub fn insert(&mut self, id: BatchJobId) {
        self.ids.insert(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = BatchJobId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<BatchJobId> for QueueSnapshot {
    fn from_iter<I: IntoIterator<Item = BatchJobId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<u64> for QueueSnapshot {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        iter.into_iter().map(BatchJobId).collect()
    }
}

/// Everything a backend needs to put one job in its queue.
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    pub name: &'a str,
    pub directory: &'a Path,
    pub script: &'a Path,
    pub output: &'a Path,
    pub error: &'a Path,
    /// Wall time in the backend's own grammar.
    pub time: &'a str,
    pub memory: &'a str,
}

/// Backend-specific queue query and submission.
#[async_trait]
pub trait BatchAdapter: Send + Sync {
    /// Which batch system this adapter talks to.
    fn kind(&self) -> SchedulerKind;

    /// Fetch the ids currently queued or running for the invoking user.
    async fn query_queue(&self) -> SchedResult<QueueSnapshot>;

    /// Submit a job and return its new id.
    async fn submit(&self, request: &SubmitRequest<'_>) -> SchedResult<BatchJobId>;
}
