//! Job shell scripts and container wrapping.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::SchedResult;
use crate::executor::{CommandSpec, ResilientExecutor};

/// Interpreter line written at the top of every job script.
pub const SHEBANG: &str = "#!/bin/sh";

/// Render a script: interpreter line, then one line per command, in order.
pub fn render_script(commands: &[String]) -> String {
    let mut script = String::new();
    script.push_str(SHEBANG);
    script.push('\n');
    for command in commands {
        script.push_str(command);
        script.push('\n');
    }
    script
}

/// Write a job script and mark it executable.
pub async fn write_script(path: &Path, commands: &[String]) -> SchedResult<()> {
    fs::write(path, render_script(commands)).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }
    Ok(())
}

/// Produces a script that runs an existing script inside a container.
#[async_trait]
pub trait ContainerWrapper: Send + Sync {
    /// Wrap `script` and return the path of the new script.
    async fn wrap(&self, script: &Path) -> SchedResult<PathBuf>;
}

/// Wraps scripts with the site-provided `batchScript` tool, which emits a
/// script that starts a Singularity/Apptainer container and sources the
/// given script inside it.
#[derive(Debug, Clone)]
pub struct BatchScriptWrapper {
    executor: ResilientExecutor,
    program: String,
}

impl BatchScriptWrapper {
    pub fn new(executor: ResilientExecutor) -> Self {
        Self {
            executor,
            program: "batchScript".to_string(),
        }
    }

    /// Use a different wrapper executable with the same calling convention.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// `<dir>/<stem>_container.sh` for `<dir>/<stem>.sh`.
    pub fn container_script_path(script: &Path) -> PathBuf {
        let stem = script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        script.with_file_name(format!("{stem}_container.sh"))
    }
}

#[async_trait]
impl ContainerWrapper for BatchScriptWrapper {
    async fn wrap(&self, script: &Path) -> SchedResult<PathBuf> {
        let target = Self::container_script_path(script);
        let command = CommandSpec::new(self.program.as_str())
            .arg(format!("source {}", script.display()))
            .arg("-O")
            .arg(target.display().to_string());
        self.executor.run(&command).await?;
        tracing::debug!("Wrapped {} into {}", script.display(), target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::testing::ScriptedRunner;

    #[test]
    fn test_render_script() {
        let commands = vec!["cd /work".to_string(), "python test.py".to_string()];
        assert_eq!(render_script(&commands), "#!/bin/sh\ncd /work\npython test.py\n");
        assert_eq!(render_script(&[]), "#!/bin/sh\n");
    }

    #[tokio::test]
    async fn test_write_script_is_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.sh");
        write_script(&path, &["echo hi".to_string()]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh\n"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_container_script_path() {
        assert_eq!(
            BatchScriptWrapper::container_script_path(Path::new("/work/testing.sh")),
            PathBuf::from("/work/testing_container.sh")
        );
        // Stems ending in 's' or 'h' keep them.
        assert_eq!(
            BatchScriptWrapper::container_script_path(Path::new("/work/hash.sh")),
            PathBuf::from("/work/hash_container.sh")
        );
    }

    #[tokio::test]
    async fn test_batch_script_wrapper_invocation() {
        let runner = Arc::new(ScriptedRunner::new().reply(""));
        let wrapper = BatchScriptWrapper::new(ResilientExecutor::new(runner.clone()));

        let wrapped = wrapper.wrap(Path::new("/work/testing.sh")).await.unwrap();
        assert_eq!(wrapped, PathBuf::from("/work/testing_container.sh"));

        let calls = runner.calls();
        assert_eq!(calls[0].program, "batchScript");
        assert_eq!(
            calls[0].args,
            vec!["source /work/testing.sh", "-O", "/work/testing_container.sh"]
        );
    }
}
