// src/compare.rs
//
// Comparison orchestration: the paired checkpoint/standalone experiment
// per action, and the aggregated summary record.
//
// Execution is strictly sequential: actions run one at a time in
// deduplicated first-occurrence order, and each path is a blocking
// simulator invocation. Any path failure aborts the whole run; a
// silently-skipped mismeasurement would corrupt the fidelity conclusion,
// so there is no partial-result skipping and no retry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::action::{Action, ActionSpace, ActionSpaceError, ActionSpecError};
use crate::builder::{BuildError, BuildManager};
use crate::checkpoint::{BaselineCheckpoint, CheckpointRunner};
use crate::config::RunConfig;
use crate::metrics::{metric_delta, StatsError};
use crate::sim::{ExecError, StandaloneRunner};

/// Per-action comparison record in the persisted summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionComparison {
    /// The action's head -> value assignments.
    pub values: BTreeMap<String, String>,
    /// Checkpoint-path window metrics.
    pub checkpoint: BTreeMap<String, f64>,
    /// Standalone-path window metrics.
    pub standalone: BTreeMap<String, f64>,
    /// Field-wise standalone - checkpoint delta.
    pub delta: BTreeMap<String, f64>,
    pub checkpoint_stats: PathBuf,
    pub standalone_stats: PathBuf,
    pub checkpoint_cache: PathBuf,
    pub binary: PathBuf,
}

/// Top-level persisted record, written once after all actions complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub trace: PathBuf,
    pub warmup_instructions: u64,
    pub window_instructions: u64,
    pub resume_warmup_checkpoint: u64,
    pub resume_warmup_standalone: u64,
    pub shared_base: bool,
    /// One record per unique action, in deduplicated first-occurrence order.
    pub actions: Vec<ActionComparison>,
}

impl ComparisonSummary {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            trace: config.trace.clone(),
            warmup_instructions: config.warmup,
            window_instructions: config.window,
            resume_warmup_checkpoint: config.resume_warmup,
            resume_warmup_standalone: config.standalone_warmup(),
            shared_base: config.shared_base,
            actions: Vec::new(),
        }
    }

    /// Write the summary document. No incremental persistence: a mid-run
    /// failure leaves no summary artifact.
    pub fn write_to_file(&self, path: &Path) -> Result<(), HarnessError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HarnessError::Io {
                path: parent.display().to_string(),
                source: e.to_string(),
            })?;
        }
        let file = File::create(path).map_err(|e| HarnessError::Io {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| HarnessError::Io {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
        Ok(())
    }
}

/// Runs the paired checkpoint/standalone experiment for each action and
/// aggregates the results.
pub struct ComparisonDriver<'a, B, C, S>
where
    B: BuildManager,
    C: CheckpointRunner,
    S: StandaloneRunner,
{
    config: &'a RunConfig,
    space: &'a ActionSpace,
    build: &'a B,
    checkpoint: &'a C,
    standalone: &'a S,
}

impl<'a, B, C, S> ComparisonDriver<'a, B, C, S>
where
    B: BuildManager,
    C: CheckpointRunner,
    S: StandaloneRunner,
{
    pub fn new(
        config: &'a RunConfig,
        space: &'a ActionSpace,
        build: &'a B,
        checkpoint: &'a C,
        standalone: &'a S,
    ) -> Self {
        Self {
            config,
            space,
            build,
            checkpoint,
            standalone,
        }
    }

    /// Initialize the baseline checkpoint, then compare every action in
    /// order. Fatal on the first failure of either path.
    pub fn run(
        &self,
        actions: &[Action],
        base_action: &Action,
    ) -> Result<ComparisonSummary, HarnessError> {
        let baseline = self
            .checkpoint
            .initialise_checkpoint(base_action, self.space)?;

        let mut summary = ComparisonSummary::new(self.config);
        for (step, action) in actions.iter().enumerate() {
            println!("[{}] comparing action {}", step, action);
            let record = self.compare_action(action, &baseline, step)?;
            println!(
                "  checkpoint ipc={:.6} | standalone ipc={:.6} | delta={:+.6}",
                record.checkpoint["ipc"], record.standalone["ipc"], record.delta["ipc"]
            );
            summary.actions.push(record);
        }
        Ok(summary)
    }

    fn compare_action(
        &self,
        action: &Action,
        baseline: &BaselineCheckpoint,
        step: usize,
    ) -> Result<ActionComparison, HarnessError> {
        // Checkpoint path. The runner decides between reusing the baseline
        // checkpoint and creating a per-action one; shared_base passes
        // through via the run config.
        let checkpoint_result = self
            .checkpoint
            .run_window(action, self.space, baseline, step)?;
        let checkpoint_metrics = checkpoint_result.metrics.as_map();

        // Standalone path: same total pre-measurement instruction count as
        // warmup-then-resume, unless explicitly overridden.
        let build = self
            .build
            .ensure_binary(&action.as_config_updates(self.space))?;
        let stats_path = self.config.standalone_stats_path(step);
        let standalone_metrics = self
            .standalone
            .run_window(
                &build.binary_path,
                self.config.standalone_warmup(),
                self.config.window,
                &stats_path,
            )?
            .as_map();

        let delta = metric_delta(&standalone_metrics, &checkpoint_metrics)?;

        Ok(ActionComparison {
            values: action.values.clone(),
            checkpoint: checkpoint_metrics,
            standalone: standalone_metrics,
            delta,
            checkpoint_stats: checkpoint_result.stats_path,
            standalone_stats: stats_path,
            checkpoint_cache: checkpoint_result.cache_path,
            binary: build.binary_path,
        })
    }
}

/// Top-level harness error. Every variant carries diagnostic context; all
/// errors propagate to the CLI and terminate the process with nonzero
/// status.
#[derive(Debug)]
pub enum HarnessError {
    Spec(ActionSpecError),
    Space(ActionSpaceError),
    Build(BuildError),
    Exec(ExecError),
    Stats(StatsError),
    Io { path: String, source: String },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Spec(e) => write!(f, "{}", e),
            HarnessError::Space(e) => write!(f, "{}", e),
            HarnessError::Build(e) => write!(f, "{}", e),
            HarnessError::Exec(e) => write!(f, "{}", e),
            HarnessError::Stats(e) => write!(f, "{}", e),
            HarnessError::Io { path, source } => {
                write!(f, "I/O error at '{}': {}", path, source)
            }
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<ActionSpecError> for HarnessError {
    fn from(e: ActionSpecError) -> Self {
        HarnessError::Spec(e)
    }
}

impl From<ActionSpaceError> for HarnessError {
    fn from(e: ActionSpaceError) -> Self {
        HarnessError::Space(e)
    }
}

impl From<BuildError> for HarnessError {
    fn from(e: BuildError) -> Self {
        HarnessError::Build(e)
    }
}

impl From<ExecError> for HarnessError {
    fn from(e: ExecError) -> Self {
        HarnessError::Exec(e)
    }
}

impl From<StatsError> for HarnessError {
    fn from(e: StatsError) -> Self {
        HarnessError::Stats(e)
    }
}
