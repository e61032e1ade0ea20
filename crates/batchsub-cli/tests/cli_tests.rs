//! CLI end-to-end tests.
//!
//! These run the `batchsub` binary with the batch system forced through
//! `--scheduler`, so no probe of the host takes place and no scheduler
//! command is executed.

use std::path::Path;
use std::process::{Command, Output};

fn batchsub(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_batchsub"))
        .args(args)
        .env_remove("BATCHSUB_SCHEDULER")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_job_file(dir: &Path, commands: &[&str]) -> String {
    let mut yaml = format!(
        "jobs:\n  - name: testing\n    directory: {}\n    time: \"00:00:01\"\n    memory: 50M\n    output: testing_output\n    error: testing_error\n    commands:\n",
        dir.join("testing_directory").display()
    );
    for command in commands {
        yaml.push_str(&format!("      - \"{command}\"\n"));
    }
    let path = dir.join("jobs.yaml");
    std::fs::write(&path, yaml).unwrap();
    path.display().to_string()
}

// ============================================================================
// translate
// ============================================================================

mod translate_tests {
    use super::*;

    #[test]
    fn test_wall_time_to_condor() {
        let output = batchsub(&["translate", "--time", "00:08:00", "--to", "condor"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("workday"));
    }

    #[test]
    fn test_oversized_wall_time_is_clamped() {
        let output = batchsub(&["translate", "--time", "10:00:00", "--to", "condor"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("nextweek"));
    }

    #[test]
    fn test_flavour_to_slurm() {
        let output = batchsub(&["translate", "--time", "tomorrow", "--to", "slurm", "-m", "2G"]);
        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("01:00:00"));
        assert!(out.contains("2G"));
    }

    #[test]
    fn test_invalid_time_fails() {
        let output = batchsub(&["translate", "--time", "soon", "--to", "slurm"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("soon"));
    }

    #[test]
    fn test_unknown_target_fails() {
        let output = batchsub(&["translate", "--time", "00:00:01", "--to", "pbs"]);
        assert!(!output.status.success());
    }
}

// ============================================================================
// detect
// ============================================================================

mod detect_tests {
    use super::*;

    #[test]
    fn test_forced_scheduler() {
        let output = batchsub(&["detect", "--scheduler", "slurm"]);
        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("slurm"));
        assert!(out.contains("forced"));
    }
}

// ============================================================================
// local
// ============================================================================

mod local_tests {
    use super::*;

    #[test]
    fn test_local_success() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_job_file(dir.path(), &["echo 'Hello World'", "echo '__FINISHED__'"]);

        let output = batchsub(&[
            "local", "-f", &file, "--seed", "1", "--scheduler", "slurm", "--user", "tester",
        ]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let out_file = dir.path().join("testing_directory/testing_output.out");
        let content = std::fs::read_to_string(out_file).unwrap();
        assert!(content.contains("Hello World"));
        assert!(content.contains("__FINISHED__"));
    }

    #[test]
    fn test_local_failure_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_job_file(
            dir.path(),
            &["echo 'Hello World'", "exit 1", "echo '__FINISHED__'"],
        );

        let output = batchsub(&[
            "local", "-f", &file, "--scheduler", "condor", "--user", "tester",
        ]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("__FINISHED__"));
    }

    #[test]
    fn test_missing_job_file() {
        let output = batchsub(&[
            "local", "-f", "/nonexistent/jobs.yaml", "--scheduler", "slurm",
        ]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("File not found"));
    }
}

// ============================================================================
// argument parsing
// ============================================================================

mod parsing_tests {
    use super::*;

    #[test]
    fn test_run_requires_file() {
        let output = batchsub(&["run"]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_unknown_subcommand() {
        let output = batchsub(&["cancel"]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_version() {
        let output = batchsub(&["version"]);
        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("batchsub"));
        assert!(out.contains("condor_q"));
    }
}
