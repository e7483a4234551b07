mod commands;
mod logging;
mod progress;

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, FitArgs, FlattenArgs, KeypointArgs, RenameArgs};
use dotenv::dotenv;
use posefit::config::{load_configuration, PipelineConfig};
use posefit::stages::{FittingStage, FlattenStage, KeypointStage};
use posefit::{flatten, naming, BatchDriver, BatchSummary, DiskFs, ProcessRunner, Stage};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();

    let args = Cli::parse();

    let result = load_configuration(args.config.as_deref())
        .context("Error loading configuration")
        .and_then(|config| run(config, args.command));

    if let Err(err) = result {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn run(mut config: PipelineConfig, command: Option<Commands>) -> Result<()> {
    match command {
        Some(Commands::Rename(args)) => run_rename(&mut config, args),
        Some(Commands::Keypoints(args)) => run_keypoints(&mut config, args),
        Some(Commands::Fit(args)) => run_fit(&mut config, args),
        Some(Commands::Flatten(args)) => run_flatten(&mut config, args),
        Some(Commands::PrintConfig) => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        None => {
            Cli::command().print_long_help()?;
            Ok(())
        }
    }
}

fn run_rename(config: &mut PipelineConfig, args: RenameArgs) -> Result<()> {
    if args.labels.is_some() {
        config.rename.label_table = args.labels;
    }
    if args.videos.is_some() {
        config.keypoints.videos = args.videos;
    }
    if args.ignore_case {
        config.rename.case_sensitive = false;
    }
    if args.group_by_folder {
        config.rename.group_by_folder = true;
    }
    let paths = config.resolve()?;

    let labels = naming::load_labels(&paths.label_table)?;
    let plan = naming::plan(
        &labels,
        &DiskFs,
        &paths.video_dir,
        &config.rename.plan_options(),
    )?;

    println!("\n=== DRY RUN ===");
    for entry in &plan.entries {
        println!(
            "{} -> {}",
            relative(&entry.source, &paths.video_dir),
            relative(&entry.destination, &paths.video_dir)
        );
    }
    info!(
        "{} rename(s) planned, {} row(s) skipped",
        format!("{}", plan.entries.len()).green(),
        format!("{}", plan.warnings.len()).yellow(),
    );

    if !args.apply {
        println!("\nNothing renamed. If OK, run again with --apply.");
        return Ok(());
    }

    println!("\n=== RENAMING ===");
    let report = naming::apply(&plan);
    info!(
        "{} renamed, {} unchanged, {} failed",
        format!("{}", report.renamed).green(),
        format!("{}", report.unchanged).cyan(),
        format!("{}", report.failed.len()).red(),
    );
    Ok(())
}

fn run_keypoints(config: &mut PipelineConfig, args: KeypointArgs) -> Result<()> {
    let kp = &mut config.keypoints;
    kp.video_overlay |= args.video_overlay;
    kp.show_logs |= args.show_logs;
    if let Some(n) = args.num_gpu {
        kp.num_gpu = n;
    }
    if let Some(start) = args.gpu_start {
        kp.gpu_start = start;
    }
    let paths = config.resolve()?;

    info!("JSONs  -> {}", paths.json_root.display());
    if config.keypoints.video_overlay {
        info!("Mode   -> JSON + overlay video ({})", paths.overlay_root.display());
    } else {
        info!(
            "Mode   -> JSON + RAW frames ({}, .{})",
            paths.images_root.display(),
            config.keypoints.images_format
        );
    }

    let stage = KeypointStage::new(&paths, &config.keypoints, &DiskFs)?;
    run_stage(&stage, args.force)
}

fn run_fit(config: &mut PipelineConfig, args: FitArgs) -> Result<()> {
    let fit = &mut config.fitting;
    if !args.only.is_empty() {
        fit.only = args.only;
    }
    if let Some(gender) = args.gender {
        fit.gender = gender;
    }
    fit.use_cuda |= args.use_cuda;
    fit.visualize |= args.visualize;
    let paths = config.resolve()?;

    let stage = FittingStage::new(
        &paths,
        &config.fitting,
        config.keypoints.images_format,
        &DiskFs,
    )?;
    run_stage(&stage, args.force)
}

fn run_flatten(config: &mut PipelineConfig, args: FlattenArgs) -> Result<()> {
    if args.out_dir.is_some() {
        config.flatten.out_dir = args.out_dir;
    }
    config.flatten.include_secondary |= args.also_pkls;
    let paths = config.resolve()?;

    if let Some(results_dir) = args.results_dir {
        let copied = flatten::flatten(
            &results_dir,
            &paths.flat_out_root,
            config.flatten.include_secondary,
        )
        .with_context(|| format!("Error flattening {}", results_dir.display()))?;
        println!("Copied {} OBJ(s) to {}", copied, paths.flat_out_root.display());
        return Ok(());
    }

    let stage = FlattenStage::new(&paths, config.flatten.include_secondary, &args.only);
    run_stage(&stage, true)
}

fn run_stage(stage: &dyn Stage, force: bool) -> Result<()> {
    let reporter = CliReporter::new();
    let summary = BatchDriver::new(&ProcessRunner, &DiskFs)
        .with_reporter(&reporter)
        .force(force)
        .run(stage)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    for failure in summary.failures() {
        let reason = failure
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        warn!("{} failed: {}", failure.id.red(), reason);
    }
    info!(
        "[{}] {} succeeded, {} skipped, {} failed, {} total ({:.2}s)",
        summary.stage,
        format!("{}", summary.succeeded).green(),
        format!("{}", summary.skipped).cyan(),
        format!("{}", summary.failed).red(),
        summary.total,
        summary.duration.as_secs_f64(),
    );
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
