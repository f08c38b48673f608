//! Fit calibration coefficients from paired observations.
//!
//! Each observation pairs a shot-noise window (`force_median`, `l`) with a
//! co-located reference measurement. The models are linear in their
//! coefficients once `F` and `L` are log-transformed, so a single OLS solve
//! recovers them:
//!
//! - density: design row `[1, ln F, ln F·L, L]`
//! - SSA:     design row `[1, ln L, ln F]`
//!
//! Fitted coefficients are unrounded; the rounding in the forward models is
//! applied to predictions only.

use nalgebra::{DMatrix, DVector};

use crate::calibration::model::{DensityCoefficients, SsaCoefficients};
use crate::error::{AlignError, Result};
use crate::math::solve_least_squares;

/// One calibration observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPair {
    pub force_median: f64,
    pub l: f64,
    pub reference: f64,
}

pub fn fit_density_coefficients(pairs: &[CalibrationPair]) -> Result<DensityCoefficients> {
    let beta = fit(pairs, 4, |i, p, row| {
        check_positive(i, p, false)?;
        let ln_f = p.force_median.ln();
        row.copy_from_slice(&[1.0, ln_f, ln_f * p.l, p.l]);
        Ok(())
    })?;
    Ok(DensityCoefficients([beta[0], beta[1], beta[2], beta[3]]))
}

pub fn fit_ssa_coefficients(pairs: &[CalibrationPair]) -> Result<SsaCoefficients> {
    let beta = fit(pairs, 3, |i, p, row| {
        check_positive(i, p, true)?;
        row.copy_from_slice(&[1.0, p.l.ln(), p.force_median.ln()]);
        Ok(())
    })?;
    Ok(SsaCoefficients([beta[0], beta[1], beta[2]]))
}

fn fit<F>(pairs: &[CalibrationPair], k: usize, mut fill_row: F) -> Result<DVector<f64>>
where
    F: FnMut(usize, &CalibrationPair, &mut [f64]) -> Result<()>,
{
    let n = pairs.len();
    if n < k {
        return Err(AlignError::InsufficientData(format!(
            "need at least {k} calibration pairs, got {n}"
        )));
    }
    if let Some(i) = pairs.iter().position(|p| !p.reference.is_finite()) {
        return Err(AlignError::InputData(format!(
            "calibration pair {i} has a non-finite reference value"
        )));
    }

    let mut x = DMatrix::<f64>::zeros(n, k);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; k];
    for (i, p) in pairs.iter().enumerate() {
        fill_row(i, p, &mut row)?;
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
        y[i] = p.reference;
    }

    solve_least_squares(&x, &y).ok_or_else(|| {
        AlignError::InsufficientData("calibration design is singular (inputs do not vary enough)".to_string())
    })
}

fn check_positive(index: usize, p: &CalibrationPair, l_logged: bool) -> Result<()> {
    let force_ok = p.force_median.is_finite() && p.force_median > 0.0;
    let l_ok = p.l.is_finite() && (!l_logged || p.l > 0.0);
    if force_ok && l_ok {
        Ok(())
    } else {
        Err(AlignError::NumericDomain {
            index,
            force: p.force_median,
            l: p.l,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::model::{CALONNE_2020, KING_2020};

    fn grid() -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                out.push((0.05 + 0.4 * i as f64, 0.08 + 0.07 * j as f64));
            }
        }
        out
    }

    #[test]
    fn recovers_density_coefficients_from_exact_data() {
        let c = KING_2020.0;
        let pairs: Vec<CalibrationPair> = grid()
            .into_iter()
            .map(|(f, l)| CalibrationPair {
                force_median: f,
                l,
                reference: c[0] + c[1] * f.ln() + c[2] * f.ln() * l + c[3] * l,
            })
            .collect();

        let fit = fit_density_coefficients(&pairs).unwrap();
        for (a, b) in fit.0.iter().zip(c.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn recovers_ssa_coefficients_from_exact_data() {
        let c = CALONNE_2020.0;
        let pairs: Vec<CalibrationPair> = grid()
            .into_iter()
            .map(|(f, l)| CalibrationPair {
                force_median: f,
                l,
                reference: c[0] + c[1] * l.ln() + c[2] * f.ln(),
            })
            .collect();

        let fit = fit_ssa_coefficients(&pairs).unwrap();
        for (a, b) in fit.0.iter().zip(c.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn too_few_or_invalid_pairs_fail() {
        let pair = CalibrationPair {
            force_median: 1.0,
            l: 0.1,
            reference: 300.0,
        };
        assert!(matches!(
            fit_density_coefficients(&[pair; 3]),
            Err(AlignError::InsufficientData(_))
        ));
        // Constant inputs make the design singular.
        assert!(matches!(
            fit_ssa_coefficients(&[pair; 5]),
            Err(AlignError::InsufficientData(_))
        ));

        let bad = CalibrationPair { l: 0.0, ..pair };
        let mut pairs = vec![pair; 4];
        pairs.push(bad);
        assert!(matches!(
            fit_ssa_coefficients(&pairs),
            Err(AlignError::NumericDomain { index: 4, .. })
        ));
    }
}
