//! HTCondor submit description files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::adapter::SubmitRequest;

/// The key/value description handed to `condor_submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitDescription {
    pub executable: PathBuf,
    pub request_memory: String,
    pub request_cpus: u32,
    pub error: PathBuf,
    pub output: PathBuf,
    pub log: PathBuf,
    /// Job flavour name.
    pub flavour: String,
}

impl SubmitDescription {
    /// Describe a single-CPU vanilla-universe job for a request.
    pub fn for_request(request: &SubmitRequest<'_>) -> Self {
        Self {
            executable: request.script.to_path_buf(),
            request_memory: request.memory.to_string(),
            request_cpus: 1,
            error: request.error.to_path_buf(),
            output: request.output.to_path_buf(),
            log: log_path(request.output),
            flavour: request.time.to_string(),
        }
    }

    /// Where the description file for this job is written.
    pub fn path(&self) -> PathBuf {
        self.output.with_extension("sub")
    }

    /// Render the description, terminated by a `queue` statement.
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Universe = vanilla");
        let _ = writeln!(text, "Executable = {}", self.executable.display());
        let _ = writeln!(text, "request_memory = {}", self.request_memory);
        let _ = writeln!(text, "request_cpus = {}", self.request_cpus);
        let _ = writeln!(text, "Error = {}", self.error.display());
        let _ = writeln!(text, "Output = {}", self.output.display());
        let _ = writeln!(text, "Log = {}", self.log.display());
        let _ = writeln!(text, "should_transfer_files = NO");
        let _ = writeln!(text, "+JobFlavour = \"{}\"", self.flavour);
        text.push_str("queue\n");
        text
    }
}

/// The HTCondor user log lives next to the output file.
fn log_path(output: &Path) -> PathBuf {
    output.with_extension("log")
}
