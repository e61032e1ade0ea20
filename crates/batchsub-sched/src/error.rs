//! Error handling for batch submission.

use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur while submitting or tracking batch jobs.
#[derive(Error, Debug)]
pub enum SchedError {
    /// An external scheduler command failed on every attempt of its retry budget.
    #[error("Command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// A single command attempt exceeded its configured timeout.
    #[error("Command timeout: {0}")]
    Timeout(String),

    /// Scheduler output did not have the expected shape. Retrying will not help.
    #[error("Unexpected output from {command}: {message}")]
    ParseError { command: String, message: String },

    /// Invalid or untranslatable resource request, or an inconsistent job set.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Neither supported batch system was found on this host.
    #[error("No supported batch system (HTCondor or SLURM) was found")]
    NoScheduler,

    /// A path that has no backing protocol yet.
    #[error("Not implemented: {0}")]
    Unimplemented(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SchedError {
    /// Whether the error came from an external command rather than from
    /// configuration or parsing.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, SchedError::CommandFailed { .. } | SchedError::Timeout(_))
    }

    pub(crate) fn parse(command: impl Into<String>, message: impl Into<String>) -> Self {
        SchedError::ParseError {
            command: command.into(),
            message: message.into(),
        }
    }
}
