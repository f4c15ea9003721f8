//! Checkpoint fidelity harness.
//!
//! Proves that resuming a microarchitectural simulator from a saved
//! checkpoint produces window metrics statistically equivalent to running
//! the same warmup-plus-window workload cold. The binary (`src/main.rs`)
//! is a thin CLI around these components.
//!
//! # Architecture
//!
//! - **Actions** (`action`): the configurable parameter space, spec-string
//!   parsing, and stable deduplication.
//! - **Metrics** (`metrics`): fixed-schema window metrics and the
//!   field-wise differencer.
//! - **Collaborators** (`builder`, `checkpoint`, `sim`): capability traits
//!   for compiling simulator binaries, creating/restoring checkpoints, and
//!   cold runs, each with a subprocess-backed implementation. The driver
//!   is tested against fakes of these traits.
//! - **Driver** (`compare`): the sequential per-action comparison protocol
//!   and the persisted summary record.

pub mod action;
pub mod builder;
pub mod checkpoint;
pub mod compare;
pub mod config;
pub mod metrics;
pub mod sim;

// --- Re-exports for ergonomic external use ---------------------------------

pub use action::{
    dedupe_actions, load_action_space, parse_action_spec, Action, ActionSpace, ActionSpaceError,
    ActionSpecError, HeadSpec,
};

pub use builder::{BuildError, BuildManager, BuildResult, MakeBuildManager};

pub use checkpoint::{BaselineCheckpoint, CheckpointResult, CheckpointRunner, SimCheckpointRunner};

pub use compare::{ActionComparison, ComparisonDriver, ComparisonSummary, HarnessError};

pub use config::{RunConfig, DEFAULT_RESUME_WARMUP};

pub use metrics::{metric_delta, parse_stats_file, StatsError, WindowMetrics};

pub use sim::{run_simulator, ExecError, ProcessStandaloneRunner, StandaloneRunner};
