// src/config.rs
//
// Resolved run parameters for one comparison run.
//
// RunConfig is built once from the CLI surface and read-only afterwards.
// It owns the artifact path layout under the output directory:
//
//   <output>/checkpoint/   checkpoint caches + checkpoint-path stats
//   <output>/standalone/   standalone-path stats
//   <output>/comparison_summary.json

use std::path::{Path, PathBuf};

/// Default instructions run post-restore before measurement begins.
pub const DEFAULT_RESUME_WARMUP: u64 = 100;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Workload trace to simulate.
    pub trace: PathBuf,
    /// Warmup instruction count used to create the checkpoint.
    pub warmup: u64,
    /// Measurement window instruction count.
    pub window: u64,
    /// Instructions run post-restore before measurement (checkpoint path).
    pub resume_warmup: u64,
    /// Optional override for the standalone-path warmup count.
    pub resume_solo: Option<u64>,
    /// Reuse one baseline checkpoint across all actions.
    pub shared_base: bool,
    /// Root directory for checkpoints, stats, and the summary.
    pub output_dir: PathBuf,
    /// Simulator repository root; build and run commands execute here.
    pub sim_root: PathBuf,
}

impl RunConfig {
    pub fn new(trace: &Path, warmup: u64, window: u64, output_dir: &Path) -> Self {
        Self {
            trace: trace.to_path_buf(),
            warmup,
            window,
            resume_warmup: DEFAULT_RESUME_WARMUP,
            resume_solo: None,
            shared_base: false,
            output_dir: output_dir.to_path_buf(),
            sim_root: PathBuf::from("."),
        }
    }

    /// Standalone-path warmup count: the explicit override if given,
    /// otherwise `warmup + resume_warmup` so the cold run reaches the same
    /// total pre-measurement instruction count as warmup-then-resume.
    pub fn standalone_warmup(&self) -> u64 {
        self.resume_solo.unwrap_or(self.warmup + self.resume_warmup)
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.output_dir.join("checkpoint")
    }

    pub fn standalone_dir(&self) -> PathBuf {
        self.output_dir.join("standalone")
    }

    /// Step-indexed stats artifact path for the standalone path.
    pub fn standalone_stats_path(&self, step: usize) -> PathBuf {
        self.standalone_dir()
            .join(format!("iter_{:04}_standalone.json", step))
    }

    /// Step-indexed stats artifact path for the checkpoint path.
    pub fn checkpoint_stats_path(&self, step: usize) -> PathBuf {
        self.checkpoint_dir()
            .join(format!("iter_{:04}_checkpoint.json", step))
    }

    /// Step-indexed per-action checkpoint cache path.
    pub fn checkpoint_cache_path(&self, step: usize) -> PathBuf {
        self.checkpoint_dir().join(format!("iter_{:04}.ckpt", step))
    }

    /// Cache path of the shared baseline checkpoint.
    pub fn baseline_cache_path(&self) -> PathBuf {
        self.checkpoint_dir().join("base.ckpt")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("comparison_summary.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig::new(
            Path::new("traces/example.champsimtrace.xz"),
            1_000_000,
            200_000,
            Path::new("rl_runs/compare_checkpoint"),
        )
    }

    #[test]
    fn test_standalone_warmup_default_is_warmup_plus_resume() {
        let cfg = config();
        assert_eq!(cfg.resume_warmup, 100);
        assert_eq!(cfg.standalone_warmup(), 1_000_100);
    }

    #[test]
    fn test_standalone_warmup_override_wins() {
        let mut cfg = config();
        cfg.resume_solo = Some(5000);
        assert_eq!(cfg.standalone_warmup(), 5000);
    }

    #[test]
    fn test_artifact_paths_are_step_indexed() {
        let cfg = config();
        assert!(cfg
            .standalone_stats_path(3)
            .ends_with("standalone/iter_0003_standalone.json"));
        assert!(cfg
            .checkpoint_stats_path(12)
            .ends_with("checkpoint/iter_0012_checkpoint.json"));
        assert!(cfg
            .checkpoint_cache_path(0)
            .ends_with("checkpoint/iter_0000.ckpt"));
        assert!(cfg.summary_path().ends_with("comparison_summary.json"));
    }
}
