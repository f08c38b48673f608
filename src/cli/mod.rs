//! Command-line parsing for the SMP profile aligner.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the calibration/search code.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use crate::calibration::{CALONNE_2020, CalibrationModel, DensityCoefficients, KING_2020, SsaCoefficients};
use crate::domain::Quantity;
use crate::error::{AlignError, Result};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "smpalign", version, about = "SMP profile calibration and alignment")]
pub struct Cli {
    /// Log at debug level (otherwise RUST_LOG, default info).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Align a penetration profile to a pit reference and report the best scaling.
    Align(AlignArgs),
    /// Convert a shot-noise table to density or SSA.
    Calibrate(CalibrateArgs),
    /// Run calibration and alignment on a synthetic site with a known drift.
    Demo(DemoArgs),
}

/// Calibration model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelChoice {
    Density,
    Ssa,
    SsaLoglog,
}

impl ModelChoice {
    /// Default model for a quantity.
    pub fn for_quantity(quantity: Quantity) -> Self {
        match quantity {
            Quantity::Density => ModelChoice::Density,
            Quantity::Ssa => ModelChoice::Ssa,
        }
    }

    /// Build the model, with published coefficients unless `custom` is given.
    ///
    /// The log-log SSA form has no published default and needs `custom`.
    pub fn build(self, custom: Option<&[f64]>) -> Result<CalibrationModel> {
        Ok(match (self, custom) {
            (ModelChoice::Density, None) => CalibrationModel::Density(KING_2020),
            (ModelChoice::Ssa, None) => CalibrationModel::Ssa(CALONNE_2020),
            (ModelChoice::SsaLoglog, None) => {
                return Err(AlignError::InvalidParameter(
                    "the ssa-loglog model needs --coefficients (3 values)".to_string(),
                ));
            }
            (ModelChoice::Density, Some(c)) => CalibrationModel::Density(DensityCoefficients(coefficients(c)?)),
            (ModelChoice::Ssa, Some(c)) => CalibrationModel::Ssa(SsaCoefficients(coefficients(c)?)),
            (ModelChoice::SsaLoglog, Some(c)) => CalibrationModel::SsaLogLog(SsaCoefficients(coefficients(c)?)),
        })
    }
}

fn coefficients<const N: usize>(values: &[f64]) -> Result<[f64; N]> {
    <[f64; N]>::try_from(values).map_err(|_| {
        AlignError::InvalidParameter(format!("expected {N} coefficients, got {}", values.len()))
    })
}

/// Search options shared by `align` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Number of random scaling trials.
    #[arg(short = 'n', long, default_value_t = 2000)]
    pub trials: usize,

    /// Nominal layer thickness (mm).
    #[arg(long, default_value_t = 50.0)]
    pub layer_height: f64,

    /// Bound on the net stretch of all layers (fraction).
    #[arg(long, default_value_t = 0.15)]
    pub max_total_stretch: f64,

    /// Bound on the stretch of any single layer (fraction).
    #[arg(long, default_value_t = 0.75)]
    pub max_layer_stretch: f64,

    /// Half height of the reference sampling window (mm).
    #[arg(long, default_value_t = 15.0)]
    pub window: f64,

    /// Random seed for the trial scalings.
    #[arg(long, default_value_t = 2021)]
    pub seed: u64,

    /// Output step of the warped profile (mm); source spacing by default.
    #[arg(long)]
    pub resample_step: Option<f64>,

    /// Score rows with empty sample windows as NaN instead of dropping them.
    #[arg(long)]
    pub keep_incomplete: bool,

    /// Run trials on a single thread.
    #[arg(long)]
    pub sequential: bool,
}

/// Optional result exports.
#[derive(Debug, Args, Clone, Default)]
pub struct ExportArgs {
    /// Export the reference comparison table to CSV.
    #[arg(long = "export-comparison", value_name = "CSV")]
    pub comparison: Option<PathBuf>,

    /// Export the aligned profile to CSV.
    #[arg(long = "export-aligned", value_name = "CSV")]
    pub aligned: Option<PathBuf>,

    /// Export the result and search settings to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub json: Option<PathBuf>,
}

/// Options for aligning a measured profile.
#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("input").required(true).args(["profile", "shot_noise"])))]
pub struct AlignArgs {
    /// Calibrated profile CSV (`depth` + `density` or `ssa`).
    #[arg(long, value_name = "CSV")]
    pub profile: Option<PathBuf>,

    /// Shot-noise CSV, calibrated on the fly with `--model`.
    #[arg(long, value_name = "CSV")]
    pub shot_noise: Option<PathBuf>,

    /// Pit reference CSV.
    #[arg(short, long, value_name = "CSV")]
    pub reference: PathBuf,

    /// Quantity to compare when a table carries both columns.
    #[arg(short, long, value_enum)]
    pub quantity: Option<Quantity>,

    /// Calibration model for `--shot-noise` (defaults to the reference quantity's model).
    #[arg(long, value_enum)]
    pub model: Option<ModelChoice>,

    /// Custom coefficients for `--model`, comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub coefficients: Option<Vec<f64>>,

    /// Site label (defaults to the reference table's `site` column).
    #[arg(long)]
    pub site: Option<String>,

    /// Print the comparison table.
    #[arg(long)]
    pub table: bool,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub export: ExportArgs,
}

/// Options for calibrating a shot-noise table.
#[derive(Debug, Args, Clone)]
pub struct CalibrateArgs {
    /// Shot-noise CSV.
    #[arg(long, value_name = "CSV")]
    pub shot_noise: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ModelChoice::Density)]
    pub model: ModelChoice,

    /// Custom coefficients (4 for density, 3 for SSA), comma separated. Required for ssa-loglog.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub coefficients: Option<Vec<f64>>,

    /// Output CSV.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for the synthetic end-to-end run.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[arg(short, long, value_enum, default_value_t = Quantity::Density)]
    pub quantity: Quantity,

    /// Fractional depth-registration drift applied to the synthetic profile.
    #[arg(long, default_value_t = 0.05, allow_hyphen_values = true)]
    pub drift: f64,

    /// Standard deviation of the noise on ln F.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Seed for the synthetic site.
    #[arg(long, default_value_t = 7)]
    pub data_seed: u64,

    /// Print the comparison table.
    #[arg(long)]
    pub table: bool,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub export: ExportArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_requires_a_profile_source() {
        assert!(Cli::try_parse_from(["smpalign", "align", "-r", "ref.csv"]).is_err());
        let cli = Cli::try_parse_from([
            "smpalign",
            "align",
            "--profile",
            "p.csv",
            "-r",
            "ref.csv",
            "-q",
            "ssa",
            "-n",
            "100",
            "--sequential",
        ])
        .unwrap();
        let Command::Align(args) = cli.command else {
            panic!("expected align");
        };
        assert_eq!(args.quantity, Some(Quantity::Ssa));
        assert_eq!(args.search.trials, 100);
        assert!(args.search.sequential);
        assert_eq!(args.search.layer_height, 50.0);
    }

    #[test]
    fn custom_coefficients_are_checked_by_arity() {
        let cli = Cli::try_parse_from([
            "smpalign",
            "calibrate",
            "--shot-noise",
            "s.csv",
            "-m",
            "ssa",
            "--coefficients",
            "0.5,-18,-3.5",
        ])
        .unwrap();
        let Command::Calibrate(args) = cli.command else {
            panic!("expected calibrate");
        };
        let model = args.model.build(args.coefficients.as_deref()).unwrap();
        assert_eq!(model, CalibrationModel::Ssa(SsaCoefficients([0.5, -18.0, -3.5])));
        assert!(ModelChoice::Density.build(Some(&[1.0, 2.0])).is_err());
    }

    #[test]
    fn loglog_model_has_no_default_coefficients() {
        assert!(matches!(
            ModelChoice::SsaLoglog.build(None),
            Err(AlignError::InvalidParameter(_))
        ));
        let model = ModelChoice::SsaLoglog.build(Some(&[3.0, -0.5, -0.2])).unwrap();
        assert_eq!(model, CalibrationModel::SsaLogLog(SsaCoefficients([3.0, -0.5, -0.2])));

        let cli = Cli::try_parse_from([
            "smpalign",
            "align",
            "--shot-noise",
            "s.csv",
            "-r",
            "ref.csv",
            "--model",
            "ssa-loglog",
            "--coefficients",
            "3,-0.5,-0.2",
        ])
        .unwrap();
        let Command::Align(args) = cli.command else {
            panic!("expected align");
        };
        assert_eq!(args.coefficients, Some(vec![3.0, -0.5, -0.2]));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
