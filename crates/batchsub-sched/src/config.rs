//! Configuration for scheduler detection and adapter construction.

use crate::adapter::SchedulerKind;
use crate::error::{SchedError, SchedResult};
use crate::executor::RetryPolicy;

/// Environment variable that forces a batch system without probing.
pub const SCHEDULER_ENV: &str = "BATCHSUB_SCHEDULER";

/// Configuration for [`SchedulerFactory`](crate::factory::SchedulerFactory).
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Batch system to use. `None` probes the host.
    pub scheduler: Option<SchedulerKind>,

    /// Budget for submissions and queue queries.
    pub retry: RetryPolicy,

    /// Budget for detection probes.
    pub probe: RetryPolicy,

    /// User whose queue is tracked. `None` reads `USER`.
    pub user: Option<String>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            scheduler: std::env::var(SCHEDULER_ENV)
                .ok()
                .and_then(|s| s.parse().ok()),
            retry: RetryPolicy::SUBMIT,
            probe: RetryPolicy::PROBE,
            user: None,
        }
    }
}

impl FactoryConfig {
    /// Force a batch system.
    pub fn with_scheduler(mut self, kind: SchedulerKind) -> Self {
        self.scheduler = Some(kind);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_probe(mut self, probe: RetryPolicy) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// The configured user, falling back to the invoking OS user.
    pub fn resolve_user(&self) -> SchedResult<String> {
        match &self.user {
            Some(user) => Ok(user.clone()),
            None => current_user(),
        }
    }
}

/// The invoking OS user, from `USER`.
pub fn current_user() -> SchedResult<String> {
    match std::env::var("USER") {
        Ok(user) if !user.is_empty() => Ok(user),
        _ => Err(SchedError::ConfigError(
            "cannot determine the invoking user: USER is not set".to_string(),
        )),
    }
}
