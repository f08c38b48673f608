//! Synthetic penetration profiles and pit references.
//!
//! Force and element size follow smooth depth laws (log-linear force, linear
//! `l`), with Gaussian noise on `ln F`. The reference is computed from the
//! noise-free laws at the true depths, while the instrument profile is
//! recorded with a known depth-registration drift: the sample at instrument
//! depth `x` describes snow at physical depth `x * (1 + drift)`.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::calibration::CalibrationModel;
use crate::domain::{GrainType, ReferenceProfile, ReferenceRecord, ShotNoiseProfile, ShotNoiseRecord};
use crate::error::{AlignError, Result};

/// Grain classes cycled through the reference rows, top to bottom.
const GRAIN_CYCLE: [&str; 4] = ["N", "R", "F", "DH"];

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub site: String,
    /// Number of profile samples.
    pub n_samples: usize,
    /// Profile spacing (mm).
    pub spacing: f64,
    /// Median force at the surface and at the bottom (N).
    pub force_top: f64,
    pub force_bottom: f64,
    /// Element size at the surface and at the bottom (mm).
    pub l_top: f64,
    pub l_bottom: f64,
    /// Standard deviation of the noise added to `ln F`.
    pub noise_sd: f64,
    /// Fractional depth-registration drift of the instrument profile.
    pub drift: f64,
    /// Reference sample depths below the surface (mm).
    pub reference_depths: Vec<f64>,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            site: "SYN01".to_string(),
            n_samples: 500,
            spacing: 1.0,
            force_top: 0.05,
            force_bottom: 5.0,
            l_top: 0.08,
            l_bottom: 0.25,
            noise_sd: 0.05,
            drift: 0.05,
            reference_depths: vec![50.0, 150.0, 250.0, 350.0, 450.0],
            seed: 2021,
        }
    }
}

/// A generated profile/reference pair for one site.
#[derive(Debug, Clone)]
pub struct SyntheticSite {
    pub shot_noise: ShotNoiseProfile,
    pub reference: ReferenceProfile,
    /// Total snow depth (mm).
    pub snow_depth: f64,
}

pub fn generate_site(config: &SyntheticConfig, model: &CalibrationModel) -> Result<SyntheticSite> {
    if config.n_samples < 2 {
        return Err(AlignError::InvalidParameter("n_samples must be >= 2".to_string()));
    }
    if !(config.spacing.is_finite() && config.spacing > 0.0) {
        return Err(AlignError::InvalidParameter("spacing must be finite and > 0".to_string()));
    }
    let positive = [config.force_top, config.force_bottom, config.l_top, config.l_bottom];
    if positive.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
        return Err(AlignError::InvalidParameter(
            "force and element size bounds must be finite and > 0".to_string(),
        ));
    }
    if !(config.drift.is_finite() && config.drift > -1.0) {
        return Err(AlignError::InvalidParameter("drift must be finite and > -1".to_string()));
    }
    let normal = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AlignError::InvalidParameter(format!("noise distribution error: {e}")))?;

    let snow_depth = (config.n_samples - 1) as f64 * config.spacing;
    let laws = DepthLaws {
        snow_depth,
        ln_force_top: config.force_top.ln(),
        ln_force_bottom: config.force_bottom.ln(),
        l_top: config.l_top,
        l_bottom: config.l_bottom,
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let records = (0..config.n_samples)
        .map(|i| {
            let depth = i as f64 * config.spacing;
            let physical = (depth * (1.0 + config.drift)).min(snow_depth);
            let (ln_force, l) = laws.at(physical);
            let force_median = (ln_force + normal.sample(&mut rng)).exp();
            ShotNoiseRecord {
                depth,
                force_median,
                lambda: 1.0 / l,
                f0: force_median * l,
                delta: 0.5 * l,
                l,
            }
        })
        .collect();

    let reference_records = config
        .reference_depths
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_finite() && **d >= 0.0 && **d <= snow_depth)
        .map(|(i, &rel_depth)| {
            let (ln_force, l) = laws.at(rel_depth);
            let value = model.evaluate(i, ln_force.exp(), l)?;
            Ok(ReferenceRecord {
                height: snow_depth - rel_depth,
                rel_depth,
                value,
                grain_type: Some(GrainType::new(GRAIN_CYCLE[i % GRAIN_CYCLE.len()])),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let reference = ReferenceProfile::new(config.site.clone(), model.quantity(), reference_records)?;

    Ok(SyntheticSite {
        shot_noise: ShotNoiseProfile::new(records),
        reference,
        snow_depth,
    })
}

struct DepthLaws {
    snow_depth: f64,
    ln_force_top: f64,
    ln_force_bottom: f64,
    l_top: f64,
    l_bottom: f64,
}

impl DepthLaws {
    /// `(ln F, l)` at physical depth `depth`.
    fn at(&self, depth: f64) -> (f64, f64) {
        let u = (depth / self.snow_depth).clamp(0.0, 1.0);
        (
            self.ln_force_top + u * (self.ln_force_bottom - self.ln_force_top),
            self.l_top + u * (self.l_bottom - self.l_top),
        )
    }
}
