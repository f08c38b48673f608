//! Stochastic alignment search.
//!
//! Each trial:
//!
//! 1. draws a scaling vector seeded from `(seed, trial)`
//! 2. warps the profile with it
//! 3. samples the warped profile at the reference depths
//! 4. scores the samples against the reference
//!
//! Trials share only immutable inputs, so they run in parallel on the rayon
//! pool. The winner is picked by a total order (r desc, RMSE asc, trial index
//! asc), which makes the result independent of scheduling.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::align::extract::extract_samples;
use crate::align::scaling::{StretchBudget, trial_scaling};
use crate::align::skill::{build_comparison, calc_skill};
use crate::align::warp::warp_quantity_profile;
use crate::domain::{
    AlignConfig, AlignmentResult, ComparisonTable, QuantityProfile, ReferenceProfile, ScalingVector, Skill,
    WarpedProfile,
};
use crate::error::{AlignError, Result};

#[derive(Debug, Clone)]
struct TrialOutcome {
    idx: usize,
    scaling: ScalingVector,
    skill: Skill,
}

/// Search for the layer scaling that best registers `profile` to `reference`.
pub fn align_profile(
    profile: &QuantityProfile,
    reference: &ReferenceProfile,
    config: &AlignConfig,
) -> Result<AlignmentResult> {
    config.validate()?;
    if profile.quantity != reference.quantity {
        return Err(AlignError::InputData(format!(
            "profile carries {} but the reference carries {}",
            profile.quantity, reference.quantity
        )));
    }
    if profile.len() < 2 {
        return Err(AlignError::InputData("profile needs at least two samples".to_string()));
    }
    if reference.is_empty() {
        return Err(AlignError::InputData("reference table has no rows".to_string()));
    }

    let layer_count = layer_count(profile, reference, config.layer_height)?;
    let budget = StretchBudget {
        max_total: config.max_total_stretch,
        max_layer: config.max_layer_stretch,
    };
    let targets = reference.rel_depths();

    info!(
        site = %reference.site,
        quantity = %reference.quantity,
        trials = config.trials,
        "Scaling profile against {} reference with {} members",
        reference.quantity,
        config.trials
    );
    debug!(layer_count, n_obs = reference.len(), "search setup");

    let run = |idx: usize| -> Result<TrialOutcome> {
        let scaling = trial_scaling(config.seed, idx, layer_count, budget)?;
        let table = evaluate(profile, reference, &targets, &scaling, config)?;
        let skill = calc_skill(&table, config.drop_incomplete);
        Ok(TrialOutcome { idx, scaling, skill })
    };

    let outcomes: Vec<TrialOutcome> = if config.parallel {
        (0..config.trials).into_par_iter().map(run).collect::<Result<_>>()?
    } else {
        (0..config.trials).map(run).collect::<Result<_>>()?
    };

    let best = select_best(&outcomes).ok_or_else(|| {
        AlignError::InvalidParameter("search ran no trials".to_string())
    })?;
    if best.skill.r.is_nan() {
        warn!(
            site = %reference.site,
            "no trial produced a finite correlation; too few comparable reference rows"
        );
    }
    debug!(trial = best.idx, r = best.skill.r, rmse = best.skill.rmse, "selected trial");

    // Rebuild the winner's comparison table rather than keeping one per trial.
    let comparison = evaluate(profile, reference, &targets, &best.scaling, config)?;

    Ok(AlignmentResult {
        site: reference.site.clone(),
        quantity: reference.quantity,
        r: best.skill.r,
        rmse: best.skill.rmse,
        total_stretch: best.scaling.total(),
        scaling: best.scaling.clone(),
        n_obs: reference.len(),
        n_comp: best.skill.n_complete,
        n_trials: config.trials,
        best_trial: best.idx,
        layer_count,
        comparison,
    })
}

impl AlignmentResult {
    /// Re-register `profile` with the winning scaling.
    pub fn apply(&self, profile: &QuantityProfile, config: &AlignConfig) -> Result<WarpedProfile> {
        warp_quantity_profile(profile, &self.scaling, config.layer_height, config.resample_step)
    }
}

/// Number of nominal layers spanning the shorter of the two profiles.
pub fn layer_count(profile: &QuantityProfile, reference: &ReferenceProfile, layer_height: f64) -> Result<usize> {
    let extent = profile.max_depth().min(reference.max_height());
    if !(extent.is_finite() && extent > 0.0) {
        return Err(AlignError::InputData(format!(
            "profiles share no positive depth extent (profile {:.1} mm, reference {:.1} mm)",
            profile.max_depth(),
            reference.max_height()
        )));
    }
    Ok((extent / layer_height).ceil() as usize)
}

fn evaluate(
    profile: &QuantityProfile,
    reference: &ReferenceProfile,
    targets: &[f64],
    scaling: &ScalingVector,
    config: &AlignConfig,
) -> Result<ComparisonTable> {
    let warped = warp_quantity_profile(profile, scaling, config.layer_height, config.resample_step)?;
    let samples = extract_samples(&warped.depth, &warped.value, targets, config.half_window);
    Ok(build_comparison(samples, reference))
}

fn select_best(outcomes: &[TrialOutcome]) -> Option<&TrialOutcome> {
    outcomes.iter().min_by(|a, b| rank_order(a, b))
}

/// Ranking order: higher r first, then lower RMSE, then earlier trial. `NaN`
/// metrics sort after every finite value.
fn rank_order(a: &TrialOutcome, b: &TrialOutcome) -> Ordering {
    nan_last(b.skill.r, a.skill.r, true)
        .then_with(|| nan_last(a.skill.rmse, b.skill.rmse, false))
        .then_with(|| a.idx.cmp(&b.idx))
}

/// Compare two metrics so that `NaN` ranks last regardless of direction.
///
/// With `reversed`, arguments arrive swapped for a descending sort, so the
/// `NaN` placement is flipped back.
fn nan_last(x: f64, y: f64, reversed: bool) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) if reversed => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if reversed => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}
