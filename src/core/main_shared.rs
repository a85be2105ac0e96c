use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use clap::Parser;
use log::{debug, info, warn};

use crate::core::cli::Args;
use crate::core::engine::perturbation::{EngineOptions, PerturbationEngine};
use crate::core::logging::init_logging;
use crate::core::mutator::VcxprojMutator;
use crate::core::oracle::CommandBuildOracle;
use crate::core::report::{LogReporter, ResultWriter};
use crate::core::revert::Reverter;
use crate::core::solution::load_solution;
use crate::types::config::{CliOverrides, RevertStrategy, config, init_with_overrides};
use crate::types::{AppError, AppResult, RunSummary, Solution};

pub const LOG_FILE: &str = "maggot.log";
pub const BUILD_LOG_DIR: &str = "Build";
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Process exit code for a finished run.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.fatal.is_some() {
        1
    } else if summary.interrupted {
        2
    } else {
        0
    }
}

/// git and snapshot reverts skip the results directory, but an svn cleanup
/// would delete it along with the build output.
pub fn check_results_location(
    strategy: RevertStrategy,
    solution: &Solution,
    results_dir: &Path,
) -> AppResult<()> {
    if strategy != RevertStrategy::Svn {
        return Ok(());
    }
    match solution
        .projects()
        .iter()
        .find(|p| results_dir.starts_with(&p.directory))
    {
        Some(project) => Err(AppError::Config(format!(
            "results directory {} is inside project directory {} and would be removed by svn \
             cleanup; pass --results-dir outside the project",
            results_dir.display(),
            project.directory.display()
        ))),
        None => Ok(()),
    }
}

pub async fn run_main() -> AppResult<()> {
    // clap prints usage and exits when the solution argument is missing
    let args = Args::parse();

    if let Some(cwd_arg) = args.cwd.as_ref() {
        let cwd = PathBuf::from(cwd_arg).canonicalize()?;
        env::set_current_dir(&cwd)?;
    }

    let solution_path = PathBuf::from(&args.solution);
    if !solution_path.is_file() {
        println!("Specified solution file does not exist.");
        std::process::exit(1);
    }
    let solution_path = solution_path.canonicalize()?;

    let cli_overrides = CliOverrides {
        log_level: args.log_level.clone(),
        log_color: args.log_color.clone(),
        build_cmd: args.build_cmd.clone(),
        build_timeout: args.build_timeout,
        build_scope: args.build_scope,
        revert: args.revert,
        results_dir: args.results_dir.clone(),
    };
    init_with_overrides(&cli_overrides);

    let results_root = PathBuf::from(config().results_dir());
    let writer = ResultWriter::create(&results_root, Local::now())?;
    let results_dir = writer.directory().canonicalize()?;

    init_logging(Some(&results_dir.join(LOG_FILE)))?;
    debug!("Results directory: {}", results_dir.display());

    let solution = load_solution(&solution_path, &config().ignore_matcher())?;
    if solution.project_count() == 0 {
        return Err(AppError::Custom(format!(
            "{} contains no C++ projects to process",
            solution_path.display()
        )));
    }

    let build = config().build();
    let oracle = CommandBuildOracle::new(
        build.cmd(),
        build.timeout(),
        results_dir.join(BUILD_LOG_DIR),
    );
    info!("Build command: {}", build.cmd());

    let revert = config().revert();
    let snapshot_store = revert
        .snapshot_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| results_dir.join(SNAPSHOT_DIR));
    check_results_location(revert.strategy(), &solution, &results_dir)?;
    let reverter = Reverter::from_strategy(
        revert.strategy(),
        snapshot_store,
        vec![results_dir.clone()],
    );
    info!("Revert strategy: {}", revert.strategy());

    let options = EngineOptions {
        scope: build.scope(),
        strict_match: config().mutation().strict_match(),
    };

    // Setup running flag to handle signals from ctrl-c
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);
    ctrlc::set_handler(move || {
        warn!("Received Ctrl-C, finishing the current build before stopping..");
        running_ctrlc.store(false, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Custom(format!("Error creating a Ctrl-C handler: {e}")))?;

    let mut engine = PerturbationEngine::new(
        oracle,
        reverter,
        VcxprojMutator,
        (LogReporter::new(), writer),
        options,
    )
    .with_running_flag(running);

    let summary = engine.run(&solution).await;

    let code = exit_code(&summary);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
