//! Closed-form regressions from shot-noise descriptors to density and SSA.
//!
//! With `F` the median force and `L` the element size:
//!
//! - density:    `round(c0 + c1·ln F + c2·ln F·L + c3·L, 1)`
//! - SSA:        `round(c0 + c1·ln L + c2·ln F, 1)`
//! - SSA loglog: `exp(c0 + c1·ln L + c2·ln F)` (unrounded)
//!
//! Non-positive `F` (and `L` where it is logged) is a caller error; values are
//! never clamped or coerced.

use serde::{Deserialize, Serialize};

use crate::domain::{Quantity, QuantityProfile, ShotNoiseProfile, ShotNoiseRecord};
use crate::error::{AlignError, Result};
use crate::math::round_to;

/// King et al. (2020) density coefficients.
pub const KING_2020: DensityCoefficients = DensityCoefficients([312.54, 50.27, -50.26, -85.38]);

/// Calonne et al. (2020) SSA coefficients for the linear form.
pub const CALONNE_2020: SsaCoefficients = SsaCoefficients([0.57, -18.56, -3.66]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityCoefficients(pub [f64; 4]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SsaCoefficients(pub [f64; 3]);

/// A calibration model together with its coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", content = "coefficients", rename_all = "snake_case")]
pub enum CalibrationModel {
    Density(DensityCoefficients),
    Ssa(SsaCoefficients),
    SsaLogLog(SsaCoefficients),
}

impl CalibrationModel {
    pub fn quantity(&self) -> Quantity {
        match self {
            CalibrationModel::Density(_) => Quantity::Density,
            CalibrationModel::Ssa(_) | CalibrationModel::SsaLogLog(_) => Quantity::Ssa,
        }
    }

    /// Evaluate the model for one `(force_median, l)` pair.
    ///
    /// `index` only labels the error.
    pub fn evaluate(&self, index: usize, force: f64, l: f64) -> Result<f64> {
        match self {
            CalibrationModel::Density(c) => density(index, force, l, c),
            CalibrationModel::Ssa(c) => ssa(index, force, l, c),
            CalibrationModel::SsaLogLog(c) => ssa_loglog(index, force, l, c),
        }
    }

    /// Bare values, one per shot-noise record.
    pub fn values(&self, profile: &ShotNoiseProfile) -> Result<Vec<f64>> {
        profile
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| self.evaluate(i, r.force_median, r.l))
            .collect()
    }

    /// The input table with the calibrated value appended to every record.
    pub fn calibrate(&self, profile: &ShotNoiseProfile) -> Result<CalibratedProfile> {
        let values = self.values(profile)?;
        let records = profile
            .records
            .iter()
            .zip(values)
            .map(|(record, value)| CalibratedRecord {
                record: *record,
                value,
            })
            .collect();
        Ok(CalibratedProfile {
            quantity: self.quantity(),
            records,
        })
    }
}

/// Shot-noise record plus its calibrated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedRecord {
    #[serde(flatten)]
    pub record: ShotNoiseRecord,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedProfile {
    pub quantity: Quantity,
    pub records: Vec<CalibratedRecord>,
}

impl CalibratedProfile {
    /// Project to the `(depth, value)` profile used by the alignment search.
    pub fn to_quantity_profile(&self) -> Result<QuantityProfile> {
        let depth = self.records.iter().map(|r| r.record.depth).collect();
        let value = self.records.iter().map(|r| r.value).collect();
        QuantityProfile::new(self.quantity, depth, value)
    }
}

pub fn density(index: usize, force: f64, l: f64, c: &DensityCoefficients) -> Result<f64> {
    if !(force.is_finite() && force > 0.0) || !l.is_finite() {
        return Err(AlignError::NumericDomain { index, force, l });
    }
    let ln_f = force.ln();
    let c = &c.0;
    Ok(round_to(c[0] + c[1] * ln_f + c[2] * ln_f * l + c[3] * l, 1))
}

pub fn ssa(index: usize, force: f64, l: f64, c: &SsaCoefficients) -> Result<f64> {
    let (ln_l, ln_f) = log_pair(index, force, l)?;
    let c = &c.0;
    Ok(round_to(c[0] + c[1] * ln_l + c[2] * ln_f, 1))
}

pub fn ssa_loglog(index: usize, force: f64, l: f64, c: &SsaCoefficients) -> Result<f64> {
    let (ln_l, ln_f) = log_pair(index, force, l)?;
    let c = &c.0;
    Ok((c[0] + c[1] * ln_l + c[2] * ln_f).exp())
}

fn log_pair(index: usize, force: f64, l: f64) -> Result<(f64, f64)> {
    if !(force.is_finite() && force > 0.0 && l.is_finite() && l > 0.0) {
        return Err(AlignError::NumericDomain { index, force, l });
    }
    Ok((l.ln(), force.ln()))
}
