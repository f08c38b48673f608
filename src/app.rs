//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads profile/reference tables
//! - runs calibration and the alignment search
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{AlignArgs, CalibrateArgs, Command, DemoArgs, ExportArgs, ModelChoice, SearchArgs};
use crate::data::SyntheticConfig;
use crate::domain::AlignConfig;
use crate::error::{AlignError, Result};
use crate::io::{Ingested, RowError};

pub mod pipeline;

use pipeline::AlignmentRun;

/// Entry point for the `smpalign` binary.
pub fn run() -> Result<()> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Align(args) => handle_align(args),
        Command::Calibrate(args) => handle_calibrate(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_align(args: AlignArgs) -> Result<()> {
    let config = align_config_from_args(&args.search);

    let reference = loaded(
        "reference",
        crate::io::load_reference_csv(&args.reference, args.quantity, args.site.as_deref())?,
    );

    let run = match (&args.profile, &args.shot_noise) {
        (Some(path), _) => {
            let profile = loaded("profile", crate::io::load_quantity_profile_csv(path, args.quantity)?);
            pipeline::run_alignment(profile, &reference, &config)?
        }
        (None, Some(path)) => {
            let shot_noise = loaded("shot-noise", crate::io::load_shot_noise_csv(path)?);
            let model = args
                .model
                .unwrap_or_else(|| ModelChoice::for_quantity(reference.quantity))
                .build(args.coefficients.as_deref())?;
            pipeline::calibrate_and_align(&shot_noise, &model, &reference, &config)?
        }
        (None, None) => {
            return Err(AlignError::InvalidParameter(
                "align needs --profile or --shot-noise".to_string(),
            ));
        }
    };

    present(&run, &config, args.table, &args.export)
}

fn handle_calibrate(args: CalibrateArgs) -> Result<()> {
    let model = args.model.build(args.coefficients.as_deref())?;
    let shot_noise = loaded("shot-noise", crate::io::load_shot_noise_csv(&args.shot_noise)?);
    let calibrated = model.calibrate(&shot_noise)?;

    // Without an output file the CSV goes to stdout, so the summary stays off it.
    match &args.output {
        Some(path) => {
            println!("{}", crate::report::format_calibration_summary(&calibrated));
            crate::io::write_calibrated_csv(path, &calibrated)?;
            info!(path = %path.display(), "wrote calibrated profile");
        }
        None => crate::io::write_calibrated(std::io::stdout().lock(), &calibrated)?,
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<()> {
    let config = align_config_from_args(&args.search);
    let synthetic = SyntheticConfig {
        drift: args.drift,
        noise_sd: args.noise,
        seed: args.data_seed,
        ..SyntheticConfig::default()
    };
    let model = ModelChoice::for_quantity(args.quantity).build(None)?;

    let (site, run) = pipeline::run_demo(&synthetic, &model, &config)?;
    println!(
        "Synthetic site {}: {} samples over {:.0}mm, drift={:+.1}%",
        site.reference.site,
        site.shot_noise.len(),
        site.snow_depth,
        synthetic.drift * 100.0
    );
    present(&run, &config, args.table, &args.export)
}

fn present(run: &AlignmentRun, config: &AlignConfig, table: bool, export: &ExportArgs) -> Result<()> {
    println!("{}", crate::report::format_alignment_summary(&run.result, config));
    if table {
        println!("{}", crate::report::format_comparison(&run.result.comparison));
    }

    if let Some(path) = &export.comparison {
        crate::io::write_comparison_csv(path, &run.result.comparison)?;
    }
    if let Some(path) = &export.aligned {
        crate::io::write_aligned_csv(path, &run.aligned, run.result.quantity.column_name())?;
    }
    if let Some(path) = &export.json {
        crate::io::write_result_json(path, &run.result, config)?;
    }
    Ok(())
}

/// Unwrap an ingest result, logging the rows that were skipped.
fn loaded<T>(what: &str, ingested: Ingested<T>) -> T {
    info!(table = what, rows = ingested.rows_used(), "loaded");
    for RowError { line, message } in &ingested.row_errors {
        debug!(table = what, line, "{message}");
    }
    ingested.data
}

pub fn align_config_from_args(args: &SearchArgs) -> AlignConfig {
    AlignConfig {
        trials: args.trials,
        layer_height: args.layer_height,
        max_total_stretch: args.max_total_stretch,
        max_layer_stretch: args.max_layer_stretch,
        half_window: args.window,
        seed: args.seed,
        resample_step: args.resample_step,
        drop_incomplete: !args.keep_incomplete,
        parallel: !args.sequential,
    }
}
