//! Shared calibrate/align pipeline used by the `align` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! shot-noise calibration -> alignment search -> re-warp with the winner
//!
//! The command handlers can then focus on loading inputs and presentation.

use tracing::info;

use crate::align::align_profile;
use crate::calibration::CalibrationModel;
use crate::data::{SyntheticConfig, SyntheticSite, generate_site};
use crate::domain::{AlignConfig, AlignmentResult, QuantityProfile, ReferenceProfile, ShotNoiseProfile, WarpedProfile};
use crate::error::Result;

/// All computed outputs of a single alignment run.
#[derive(Debug, Clone)]
pub struct AlignmentRun {
    pub profile: QuantityProfile,
    pub result: AlignmentResult,
    /// `profile` re-registered with the winning scaling.
    pub aligned: WarpedProfile,
}

/// Align an already calibrated profile and re-warp it with the winner.
pub fn run_alignment(
    profile: QuantityProfile,
    reference: &ReferenceProfile,
    config: &AlignConfig,
) -> Result<AlignmentRun> {
    let result = align_profile(&profile, reference, config)?;
    let aligned = result.apply(&profile, config)?;
    Ok(AlignmentRun {
        profile,
        result,
        aligned,
    })
}

/// Calibrate a shot-noise profile with `model`, then align it.
pub fn calibrate_and_align(
    shot_noise: &ShotNoiseProfile,
    model: &CalibrationModel,
    reference: &ReferenceProfile,
    config: &AlignConfig,
) -> Result<AlignmentRun> {
    let profile = model.calibrate(shot_noise)?.to_quantity_profile()?;
    info!(samples = profile.len(), quantity = %profile.quantity, "calibrated shot-noise profile");
    run_alignment(profile, reference, config)
}

/// Generate a synthetic site and run it end to end.
pub fn run_demo(
    synthetic: &SyntheticConfig,
    model: &CalibrationModel,
    config: &AlignConfig,
) -> Result<(SyntheticSite, AlignmentRun)> {
    let site = generate_site(synthetic, model)?;
    let run = calibrate_and_align(&site.shot_noise, model, &site.reference, config)?;
    Ok((site, run))
}
