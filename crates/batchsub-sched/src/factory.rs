//! Batch system detection and job construction.
//!
//! The factory resolves which batch system this host runs, builds the
//! matching adapter, and rewrites scheduler-agnostic job parameters into the
//! adapter's grammar before any [`Job`] is created.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::adapter::{BatchAdapter, SchedulerKind};
use crate::config::FactoryConfig;
use crate::duration::{self, WallTime};
use crate::error::{SchedError, SchedResult};
use crate::executor::{CommandSpec, ResilientExecutor};
use crate::job::{Job, JobConfig};
use crate::job_set::JobSet;
use crate::script::{BatchScriptWrapper, ContainerWrapper};

#[cfg(feature = "condor")]
use crate::condor::CondorAdapter;
#[cfg(feature = "slurm")]
use crate::slurm::SlurmAdapter;

/// Batch system detected for this process.
static DETECTED: OnceCell<SchedulerKind> = OnceCell::const_new();

/// Probe the host for each compiled-in batch system, HTCondor first.
///
/// A scheduler forced through [`FactoryConfig::scheduler`] is returned
/// without probing.
pub async fn detect(
    executor: &ResilientExecutor,
    config: &FactoryConfig,
) -> SchedResult<SchedulerKind> {
    if let Some(kind) = config.scheduler {
        return ensure_enabled(kind);
    }

    for kind in SchedulerKind::ALL.into_iter().filter(SchedulerKind::is_enabled) {
        let probe = CommandSpec::new("which").arg(kind.queue_command());
        if executor.probe(&probe).await {
            tracing::info!("Detected {} batch system", kind);
            return Ok(kind);
        }
    }

    Err(SchedError::NoScheduler)
}

/// [`detect`], remembered for the rest of the process.
///
/// The first successful probe wins; later calls return it without running
/// any command. A forced scheduler bypasses the cache.
pub async fn detect_scheduler(
    executor: &ResilientExecutor,
    config: &FactoryConfig,
) -> SchedResult<SchedulerKind> {
    if let Some(kind) = config.scheduler {
        return ensure_enabled(kind);
    }
    DETECTED
        .get_or_try_init(|| detect(executor, config))
        .await
        .copied()
}

fn ensure_enabled(kind: SchedulerKind) -> SchedResult<SchedulerKind> {
    if kind.is_enabled() {
        Ok(kind)
    } else {
        Err(SchedError::ConfigError(format!(
            "support for {kind} was not compiled into this build"
        )))
    }
}

/// Rewrite a wall-time request into the grammar of `kind`.
///
/// SLURM takes `HH:MM:SS`; a job flavour is replaced by its canonical wall
/// time. HTCondor takes a job flavour; a wall time is rounded up to the
/// shortest covering flavour. Anything else is a configuration error.
pub fn translate_time(kind: SchedulerKind, time: &str) -> SchedResult<String> {
    let translated = match kind {
        SchedulerKind::Slurm if duration::is_tier_name(time) => {
            duration::tier_to_wall_time(time)?.to_string()
        }
        SchedulerKind::Condor if duration::is_wall_time(time) => {
            duration::wall_time_to_tier(time)?.to_string()
        }
        _ => time.to_string(),
    };

    let valid = match kind {
        SchedulerKind::Slurm => WallTime::parse(&translated).is_some(),
        SchedulerKind::Condor => duration::is_tier_name(&translated),
    };
    if !valid {
        return Err(SchedError::ConfigError(format!(
            "'{time}' is neither a wall time (HH:MM:SS) nor a job flavour"
        )));
    }

    if translated != time {
        tracing::debug!("Translated wall time '{}' to '{}' for {}", time, translated, kind);
    }
    Ok(translated)
}

/// Check a memory request for `kind`.
///
/// `sbatch --mem` takes `<digits>` with an optional `K`, `M`, `G` or `T` unit.
/// HTCondor's `request_memory` additionally accepts a trailing `B` (`4GB`).
/// Requests in those forms pass through unchanged; there is no translation
/// for anything else.
pub fn translate_memory(kind: SchedulerKind, memory: &str) -> SchedResult<String> {
    let digits = memory.bytes().take_while(u8::is_ascii_digit).count();
    let unit = memory[digits..].to_ascii_uppercase();
    let valid_unit = match kind {
        SchedulerKind::Slurm => matches!(unit.as_str(), "" | "K" | "M" | "G" | "T"),
        SchedulerKind::Condor => matches!(
            unit.as_str(),
            "" | "K" | "M" | "G" | "T" | "KB" | "MB" | "GB" | "TB" | "B"
        ),
    };

    if digits > 0 && valid_unit {
        Ok(memory.to_string())
    } else {
        Err(SchedError::Unimplemented(format!(
            "memory request '{memory}' cannot be translated"
        )))
    }
}

/// Builds jobs bound to one batch system.
#[derive(Clone)]
pub struct SchedulerFactory {
    kind: SchedulerKind,
    adapter: Arc<dyn BatchAdapter>,
    wrapper: Arc<dyn ContainerWrapper>,
}

impl SchedulerFactory {
    /// Detect the host's batch system (once per process) and build a factory for it.
    pub async fn detect(config: &FactoryConfig) -> SchedResult<Self> {
        let executor = ResilientExecutor::system()
            .with_policy(config.retry)
            .with_probe_policy(config.probe);
        let kind = detect_scheduler(&executor, config).await?;
        Self::with_executor(kind, executor, config)
    }

    /// Build a factory for a known batch system, skipping detection.
    pub fn with_kind(kind: SchedulerKind, config: &FactoryConfig) -> SchedResult<Self> {
        let executor = ResilientExecutor::system()
            .with_policy(config.retry)
            .with_probe_policy(config.probe);
        Self::with_executor(kind, executor, config)
    }

    /// Build a factory whose scheduler commands go through `executor`.
    pub fn with_executor(
        kind: SchedulerKind,
        executor: ResilientExecutor,
        config: &FactoryConfig,
    ) -> SchedResult<Self> {
        let user = config.resolve_user()?;
        let adapter = build_adapter(ensure_enabled(kind)?, executor.clone(), user)?;
        Ok(Self {
            kind,
            adapter,
            wrapper: Arc::new(BatchScriptWrapper::new(executor)),
        })
    }

    /// Build a factory around an existing adapter.
    pub fn with_adapter(adapter: Arc<dyn BatchAdapter>) -> Self {
        Self {
            kind: adapter.kind(),
            adapter,
            wrapper: Arc::new(BatchScriptWrapper::new(ResilientExecutor::system())),
        }
    }

    /// Replace the container wrapper used for `in_container` jobs.
    pub fn with_wrapper(mut self, wrapper: Arc<dyn ContainerWrapper>) -> Self {
        self.wrapper = wrapper;
        self
    }

    pub fn kind(&self) -> SchedulerKind {
        self.kind
    }

    pub fn adapter(&self) -> &Arc<dyn BatchAdapter> {
        &self.adapter
    }

    /// Rewrite a job definition into this batch system's grammar.
    pub fn translate(&self, mut config: JobConfig) -> SchedResult<JobConfig> {
        config.time = translate_time(self.kind, &config.time)?;
        config.memory = translate_memory(self.kind, &config.memory)?;
        Ok(config)
    }

    /// Translate a job definition and create the job.
    pub async fn create_job(&self, config: JobConfig) -> SchedResult<Job> {
        let config = self.translate(config)?;
        Job::create(config, self.adapter.clone(), Some(self.wrapper.as_ref())).await
    }

    /// Create every job and collect them into a set.
    pub async fn create_job_set<I>(&self, configs: I) -> SchedResult<JobSet>
    where
        I: IntoIterator<Item = JobConfig>,
    {
        let mut jobs = Vec::new();
        for config in configs {
            jobs.push(self.create_job(config).await?);
        }
        JobSet::new(jobs)
    }
}

impl std::fmt::Debug for SchedulerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerFactory")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[allow(unused_variables)]
fn build_adapter(
    kind: SchedulerKind,
    executor: ResilientExecutor,
    user: String,
) -> SchedResult<Arc<dyn BatchAdapter>> {
    match kind {
        #[cfg(feature = "slurm")]
        SchedulerKind::Slurm => Ok(Arc::new(SlurmAdapter::new(executor, user))),
        #[cfg(feature = "condor")]
        SchedulerKind::Condor => Ok(Arc::new(CondorAdapter::new(executor, user))),
        #[allow(unreachable_patterns)]
        other => Err(SchedError::ConfigError(format!(
            "support for {other} was not compiled into this build"
        ))),
    }
}
