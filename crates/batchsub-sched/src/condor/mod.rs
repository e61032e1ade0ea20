//! HTCondor integration for HPC job submission.
//!
//! Jobs are described by a transient submit description file and handed to
//! `condor_submit`. The queue is read back with `condor_q`, keeping only
//! clusters that are idle or running. Wall time is requested as a job
//! flavour (see [`crate::duration::Tier`]).

mod adapter;
mod parser;
mod submit;

pub use adapter::CondorAdapter;
pub use parser::{CondorJobStatus, parse_condor_q_output, parse_condor_submit_output};
pub use submit::SubmitDescription;
