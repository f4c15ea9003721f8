// src/checkpoint.rs
//
// Checkpoint collaborator: baseline checkpoint creation and
// checkpoint-path window execution.
//
// The runner owns the shared_base distinction: with shared_base the one
// baseline checkpoint is restored for every action; without it a
// per-action checkpoint is created after warming up under the action's own
// configuration. The baseline checkpoint is only ever read once created.

use std::fs;
use std::path::{Path, PathBuf};

use crate::action::{Action, ActionSpace};
use crate::builder::BuildManager;
use crate::config::RunConfig;
use crate::metrics::{parse_stats_file, WindowMetrics};
use crate::sim::{run_simulator, ExecError};

/// Handle to the baseline checkpoint created once per run.
#[derive(Debug, Clone)]
pub struct BaselineCheckpoint {
    pub cache_path: PathBuf,
}

/// Outcome of running one measurement window from a checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub metrics: WindowMetrics,
    pub stats_path: PathBuf,
    pub cache_path: PathBuf,
}

/// Capability to create the baseline checkpoint and execute
/// checkpoint-path measurement windows.
pub trait CheckpointRunner {
    fn initialise_checkpoint(
        &self,
        base: &Action,
        space: &ActionSpace,
    ) -> Result<BaselineCheckpoint, ExecError>;

    fn run_window(
        &self,
        action: &Action,
        space: &ActionSpace,
        baseline: &BaselineCheckpoint,
        step: usize,
    ) -> Result<CheckpointResult, ExecError>;
}

/// Subprocess-backed checkpoint runner.
pub struct SimCheckpointRunner<'a, B: BuildManager> {
    build: &'a B,
    config: &'a RunConfig,
}

impl<'a, B: BuildManager> SimCheckpointRunner<'a, B> {
    pub fn new(build: &'a B, config: &'a RunConfig) -> Self {
        Self { build, config }
    }

    /// Warm up under the given action's configuration and save a checkpoint
    /// at `cache_path`.
    fn create_checkpoint(
        &self,
        action: &Action,
        space: &ActionSpace,
        cache_path: &Path,
    ) -> Result<(), ExecError> {
        let build = self.build.ensure_binary(&action.as_config_updates(space))?;
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecError::Io {
                path: parent.display().to_string(),
                source: e.to_string(),
            })?;
        }
        let args = vec![
            "--warmup-instructions".to_string(),
            self.config.warmup.to_string(),
            "--simulation-instructions".to_string(),
            "0".to_string(),
            "--checkpoint-save".to_string(),
            cache_path.display().to_string(),
            self.config.trace.display().to_string(),
        ];
        run_simulator(&self.config.sim_root, &build.binary_path, &args)
    }
}

impl<'a, B: BuildManager> CheckpointRunner for SimCheckpointRunner<'a, B> {
    fn initialise_checkpoint(
        &self,
        base: &Action,
        space: &ActionSpace,
    ) -> Result<BaselineCheckpoint, ExecError> {
        let cache_path = self.config.baseline_cache_path();
        self.create_checkpoint(base, space, &cache_path)?;
        Ok(BaselineCheckpoint { cache_path })
    }

    fn run_window(
        &self,
        action: &Action,
        space: &ActionSpace,
        baseline: &BaselineCheckpoint,
        step: usize,
    ) -> Result<CheckpointResult, ExecError> {
        let cache_path = if self.config.shared_base {
            baseline.cache_path.clone()
        } else {
            let cache_path = self.config.checkpoint_cache_path(step);
            self.create_checkpoint(action, space, &cache_path)?;
            cache_path
        };

        let build = self.build.ensure_binary(&action.as_config_updates(space))?;
        let stats_path = self.config.checkpoint_stats_path(step);
        if let Some(parent) = stats_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecError::Io {
                path: parent.display().to_string(),
                source: e.to_string(),
            })?;
        }

        let args = vec![
            "--checkpoint-restore".to_string(),
            cache_path.display().to_string(),
            "--warmup-instructions".to_string(),
            self.config.resume_warmup.to_string(),
            "--simulation-instructions".to_string(),
            self.config.window.to_string(),
            "--json".to_string(),
            stats_path.display().to_string(),
            self.config.trace.display().to_string(),
        ];
        run_simulator(&self.config.sim_root, &build.binary_path, &args)?;

        let metrics = parse_stats_file(&stats_path)?;
        Ok(CheckpointResult {
            metrics,
            stats_path,
            cache_path,
        })
    }
}
