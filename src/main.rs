// src/main.rs
//
// CLI entrypoint: compare checkpointed simulator windows with standalone
// runs across a set of architectural actions.
//
// Control flow: CLI arguments -> load action space & base action -> build
// requested action list -> deduplicate -> initialize baseline checkpoint
// -> comparison driver per action -> persist one summary document.
//
// All errors are fatal: the harness measures fidelity, and masking a
// failed run would corrupt the comparison.

use clap::Parser;
use std::path::PathBuf;

use ckptdiff::{
    dedupe_actions, load_action_space, parse_action_spec, ComparisonDriver, HarnessError,
    MakeBuildManager, ProcessStandaloneRunner, RunConfig, SimCheckpointRunner,
};

#[derive(Debug, Parser)]
#[command(
    name = "ckptdiff",
    about = "Compare checkpointed simulator windows with standalone runs",
    version
)]
struct Args {
    /// Path to the workload trace to simulate.
    #[arg(long)]
    trace: PathBuf,

    /// Warmup instruction count used to create the checkpoint.
    #[arg(long)]
    warmup: u64,

    /// Measurement window instruction count.
    #[arg(long)]
    window: u64,

    /// Instructions to run after restoring the checkpoint before
    /// measurement begins.
    #[arg(long, default_value_t = 100)]
    resume_warmup: u64,

    /// Path to the JSON definition of the action space.
    #[arg(long, default_value = "configs/action_space.json")]
    action_space: PathBuf,

    /// Root directory for checkpoints, stats, and summary output.
    #[arg(long, default_value = "rl_runs/compare_checkpoint")]
    output: PathBuf,

    /// Reuse a single baseline checkpoint for all actions instead of
    /// per-action warmup.
    #[arg(long)]
    shared_base: bool,

    /// Include the action space's base configuration in the comparison.
    #[arg(long)]
    include_base: bool,

    /// Action specification 'head=value,head=value'. Repeat for multiple
    /// actions.
    #[arg(long = "action")]
    actions: Vec<String>,

    /// Optional warmup override for standalone runs. Defaults to
    /// warmup + resume-warmup.
    #[arg(long)]
    resume_solo: Option<u64>,

    /// Simulator repository root; build and run commands execute here.
    #[arg(long, default_value = ".")]
    sim_root: PathBuf,
}

fn run(args: Args) -> Result<(), HarnessError> {
    let (space, base_action, template) = load_action_space(&args.action_space)?;

    let mut selected = Vec::new();
    if args.include_base {
        selected.push(base_action.clone());
    }
    for spec in &args.actions {
        let mapping = parse_action_spec(spec)?;
        selected.push(space.from_dict(&mapping)?);
    }
    if selected.is_empty() {
        selected.push(base_action.clone());
    }
    let actions = dedupe_actions(selected);

    let config = RunConfig {
        trace: args.trace,
        warmup: args.warmup,
        window: args.window,
        resume_warmup: args.resume_warmup,
        resume_solo: args.resume_solo,
        shared_base: args.shared_base,
        output_dir: args.output,
        sim_root: args.sim_root,
    };

    println!(
        "ckptdiff | trace={} warmup={} window={} resume_warmup={} standalone_warmup={} shared_base={}",
        config.trace.display(),
        config.warmup,
        config.window,
        config.resume_warmup,
        config.standalone_warmup(),
        config.shared_base
    );
    println!("loaded {} action(s) to compare", actions.len());

    let build = MakeBuildManager::new(config.sim_root.clone(), template);
    let checkpoint = SimCheckpointRunner::new(&build, &config);
    let standalone = ProcessStandaloneRunner::new(config.sim_root.clone(), config.trace.clone());
    let driver = ComparisonDriver::new(&config, &space, &build, &checkpoint, &standalone);

    let summary = driver.run(&actions, &base_action)?;

    let summary_path = config.summary_path();
    summary.write_to_file(&summary_path)?;
    println!("saved comparison summary to {}", summary_path.display());
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
