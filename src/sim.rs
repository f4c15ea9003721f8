// src/sim.rs
//
// Blocking simulator process invocation.
//
// Both measurement paths end in one external simulator run. The invocation
// is blocking with no timeout: a hung simulator blocks the harness, which
// is an accepted limitation of the sequential execution model.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::builder::BuildError;
use crate::metrics::{parse_stats_file, StatsError, WindowMetrics};

/// Run a simulator binary with the given arguments inside the simulator
/// repository root, suspending until it exits. Nonzero exit is an error.
pub fn run_simulator(sim_root: &Path, binary: &Path, args: &[String]) -> Result<(), ExecError> {
    let status = Command::new(binary)
        .args(args)
        .current_dir(sim_root)
        .status()
        .map_err(|e| ExecError::Spawn {
            program: binary.display().to_string(),
            source: e.to_string(),
        })?;
    if !status.success() {
        return Err(ExecError::NonZeroExit {
            program: binary.display().to_string(),
            args: args.join(" "),
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Capability to execute one cold (no checkpoint) measurement window.
pub trait StandaloneRunner {
    /// Warm up for `warmup` instructions, measure for `window` instructions,
    /// write statistics to `stats_path`, and parse them.
    fn run_window(
        &self,
        binary: &Path,
        warmup: u64,
        window: u64,
        stats_path: &Path,
    ) -> Result<WindowMetrics, ExecError>;
}

/// Subprocess-backed standalone runner.
pub struct ProcessStandaloneRunner {
    sim_root: PathBuf,
    trace: PathBuf,
}

impl ProcessStandaloneRunner {
    pub fn new(sim_root: PathBuf, trace: PathBuf) -> Self {
        Self { sim_root, trace }
    }
}

impl StandaloneRunner for ProcessStandaloneRunner {
    fn run_window(
        &self,
        binary: &Path,
        warmup: u64,
        window: u64,
        stats_path: &Path,
    ) -> Result<WindowMetrics, ExecError> {
        if let Some(parent) = stats_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecError::Io {
                path: parent.display().to_string(),
                source: e.to_string(),
            })?;
        }

        let args = vec![
            "--warmup-instructions".to_string(),
            warmup.to_string(),
            "--simulation-instructions".to_string(),
            window.to_string(),
            "--json".to_string(),
            stats_path.display().to_string(),
            self.trace.display().to_string(),
        ];
        run_simulator(&self.sim_root, binary, &args)?;

        Ok(parse_stats_file(stats_path)?)
    }
}

/// Errors from executing a simulator process (either measurement path).
#[derive(Debug, Clone)]
pub enum ExecError {
    Spawn {
        program: String,
        source: String,
    },
    NonZeroExit {
        program: String,
        args: String,
        status: String,
    },
    Io {
        path: String,
        source: String,
    },
    Stats(StatsError),
    Build(BuildError),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Spawn { program, source } => {
                write!(f, "Failed to spawn simulator '{}': {}", program, source)
            }
            ExecError::NonZeroExit {
                program,
                args,
                status,
            } => {
                write!(
                    f,
                    "Simulator '{} {}' exited with {}",
                    program, args, status
                )
            }
            ExecError::Io { path, source } => {
                write!(f, "Simulator I/O error at '{}': {}", path, source)
            }
            ExecError::Stats(e) => write!(f, "{}", e),
            ExecError::Build(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ExecError {}

impl From<StatsError> for ExecError {
    fn from(e: StatsError) -> Self {
        ExecError::Stats(e)
    }
}

impl From<BuildError> for ExecError {
    fn from(e: BuildError) -> Self {
        ExecError::Build(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_simulator_missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_simulator(
            dir.path(),
            Path::new("./no_such_binary"),
            &["--flag".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_run_simulator_nonzero_exit_carries_command() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_simulator(
            dir.path(),
            Path::new("/bin/false"),
            &["--warmup-instructions".to_string(), "100".to_string()],
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/bin/false"), "{}", msg);
        assert!(msg.contains("--warmup-instructions"), "{}", msg);
    }

    #[test]
    fn test_run_simulator_zero_exit_ok() {
        let dir = tempfile::tempdir().unwrap();
        run_simulator(dir.path(), Path::new("/bin/true"), &[]).unwrap();
    }
}
