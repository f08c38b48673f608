//! Re-register a depth profile by stretching/eroding nominal layers.
//!
//! The source profile is cut into layers of `layer_height`. Layer `i` gets a
//! new thickness `layer_height * (1 + scaling[i])`; the cumulative thicknesses
//! define a new depth axis sampled every `resample_step`. Each layer's source
//! values are resampled onto the part of the new axis that the stretched layer
//! covers.
//!
//! Layers with two or fewer source samples are dropped, so the output can be
//! shorter than the input.
//!
//! Layer `i` starts at source depth `i * layer_height`, and the output depth
//! axis always starts at 0. A source profile whose first sample is not at 0
//! therefore comes back shifted onto a surface-referenced axis.

use crate::domain::{QuantityProfile, ScalingVector, WarpedProfile};
use crate::error::{AlignError, Result};
use crate::math::{nearest_index, resample_linear};

/// Apply `scaling` to a regularly spaced `(depth, value)` profile.
///
/// `resample_step` defaults to the source spacing.
pub fn warp_profile(
    depth: &[f64],
    value: &[f64],
    scaling: &ScalingVector,
    layer_height: f64,
    resample_step: Option<f64>,
) -> Result<WarpedProfile> {
    if depth.len() != value.len() {
        return Err(AlignError::InvalidParameter(format!(
            "depth/value length mismatch ({} vs {})",
            depth.len(),
            value.len()
        )));
    }
    if depth.len() < 2 {
        return Err(AlignError::InvalidParameter(
            "profile needs at least two samples to warp".to_string(),
        ));
    }
    // Spacing is assumed regular; the first interval defines it.
    let source_step = depth[1] - depth[0];
    if !(source_step.is_finite() && source_step > 0.0) {
        return Err(AlignError::InvalidParameter(
            "profile depth must be ascending".to_string(),
        ));
    }
    if !(layer_height.is_finite() && layer_height > 0.0) {
        return Err(AlignError::InvalidParameter(format!(
            "layer_height must be finite and > 0 (got {layer_height})"
        )));
    }
    let step = resample_step.unwrap_or(source_step);
    if !(step.is_finite() && step > 0.0) {
        return Err(AlignError::InvalidParameter(format!(
            "resample_step must be finite and > 0 (got {step})"
        )));
    }
    if let Some(s) = scaling.as_slice().iter().find(|s| !(s.is_finite() && **s > -1.0)) {
        return Err(AlignError::InvalidParameter(format!(
            "layer stretch must be finite and > -1 (got {s})"
        )));
    }

    let thickness: Vec<f64> = scaling
        .as_slice()
        .iter()
        .map(|s| layer_height * (1.0 + s))
        .collect();
    let total: f64 = thickness.iter().sum();
    let grid_len = ((total / step) - 1e-9).ceil().max(0.0) as usize;
    let grid: Vec<f64> = (0..grid_len).map(|j| j as f64 * step).collect();

    let mut out = WarpedProfile {
        depth: Vec::with_capacity(grid_len),
        value: Vec::with_capacity(grid_len),
    };

    let mut cumulative = 0.0;
    let mut out_start = 0usize;

    for (i, t) in thickness.iter().enumerate() {
        let src_lo = boundary_index(depth, source_step, layer_height * i as f64);
        let src_hi = boundary_index(depth, source_step, layer_height * (i + 1) as f64);

        cumulative += t;
        let snapped = cumulative - cumulative.rem_euclid(step);
        let out_end = boundary_index(&grid, step, snapped).max(out_start);

        let source = &value[src_lo..src_hi.max(src_lo)];
        let n_out = out_end - out_start;
        if source.len() > 2 && n_out > 0 {
            out.depth.extend_from_slice(&grid[out_start..out_end]);
            out.value.extend(resample_linear(source, n_out));
        }

        // Carry the offset forward even for dropped layers.
        out_start = out_end;
    }

    Ok(out)
}

/// [`warp_profile`] over a [`QuantityProfile`].
pub fn warp_quantity_profile(
    profile: &QuantityProfile,
    scaling: &ScalingVector,
    layer_height: f64,
    resample_step: Option<f64>,
) -> Result<WarpedProfile> {
    warp_profile(&profile.depth, &profile.value, scaling, layer_height, resample_step)
}

/// First index of `axis` belonging to a layer that starts at `x`.
///
/// Nearest sample (ties low) inside the axis; one past the end once `x` lies
/// more than half a step beyond the last sample.
fn boundary_index(axis: &[f64], step: f64, x: f64) -> usize {
    match axis.last() {
        None => 0,
        Some(&last) if x > last + 0.5 * step => axis.len(),
        Some(_) => nearest_index(axis, x).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::scaling::{StretchBudget, trial_scaling};

    fn ramp(n: usize, spacing: f64) -> (Vec<f64>, Vec<f64>) {
        let depth: Vec<f64> = (0..n).map(|i| i as f64 * spacing).collect();
        let value: Vec<f64> = depth.iter().map(|d| 100.0 + 0.5 * d).collect();
        (depth, value)
    }

    #[test]
    fn zero_scaling_is_identity() {
        let (depth, value) = ramp(500, 1.0);
        let warped = warp_profile(&depth, &value, &ScalingVector::zeros(10), 50.0, None).unwrap();
        assert_eq!(warped.len(), 500);
        for i in 0..warped.len() {
            assert!((warped.depth[i] - depth[i]).abs() < 1e-9);
            assert!((warped.value[i] - value[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_scaling_over_a_partial_extent_is_identity() {
        // Layers cover only the top 450 mm of a 1 m profile.
        let (depth, value) = ramp(1000, 1.0);
        let warped = warp_profile(&depth, &value, &ScalingVector::zeros(9), 50.0, None).unwrap();
        assert_eq!(warped.len(), 450);
        assert_eq!(&warped.value[..], &value[..450]);
    }

    #[test]
    fn output_axis_starts_at_the_surface() {
        let (depth, value) = ramp(500, 1.0);
        let offset: Vec<f64> = depth.iter().map(|d| d + 2.5).collect();
        let warped = warp_profile(&offset, &value, &ScalingVector::zeros(9), 50.0, None).unwrap();
        assert_eq!(warped.len(), 450);
        assert_eq!(warped.depth[0], 0.0);
        assert_eq!(warped.depth[449], 449.0);
        assert_eq!(warped.value[0], value[0]);
    }

    #[test]
    fn warped_depth_is_monotone_and_aligned_with_values() {
        let (depth, value) = ramp(400, 1.0);
        let budget = StretchBudget {
            max_total: 0.15,
            max_layer: 0.75,
        };
        for trial in 0..50 {
            let scaling = trial_scaling(99, trial, 8, budget).unwrap();
            let warped = warp_profile(&depth, &value, &scaling, 50.0, None).unwrap();
            assert_eq!(warped.depth.len(), warped.value.len());
            assert!(warped.depth.windows(2).all(|w| w[1] >= w[0]));
            assert!(!warped.is_empty());
        }
    }

    #[test]
    fn stretching_a_layer_moves_later_layers_deeper() {
        let (depth, value) = ramp(200, 1.0);
        let scaling = ScalingVector(vec![0.5, 0.0, -0.5, 0.0]);
        let warped = warp_profile(&depth, &value, &scaling, 50.0, None).unwrap();

        // Layer 0 spans 75 mm, layer 1 starts where source depth 50 landed.
        let idx = warped.depth.iter().position(|d| *d == 75.0).unwrap();
        assert!((warped.value[idx] - (100.0 + 0.5 * 50.0)).abs() < 1e-9);
        // Total thickness is unchanged, so the output spans the same extent.
        assert_eq!(warped.len(), 200);
        assert!((warped.value[0] - value[0]).abs() < 1e-12);
    }

    #[test]
    fn coarser_resample_step_thins_the_output() {
        let (depth, value) = ramp(200, 1.0);
        let warped = warp_profile(&depth, &value, &ScalingVector::zeros(4), 50.0, Some(5.0)).unwrap();
        assert_eq!(warped.len(), 40);
        assert!(warped.depth.windows(2).all(|w| (w[1] - w[0] - 5.0).abs() < 1e-9));
    }

    #[test]
    fn thin_layers_are_dropped() {
        // Two source samples per layer: every layer is skipped.
        let (depth, value) = ramp(20, 1.0);
        let warped = warp_profile(&depth, &value, &ScalingVector::zeros(10), 2.0, None).unwrap();
        assert!(warped.is_empty());
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let (depth, value) = ramp(10, 1.0);
        let zeros = ScalingVector::zeros(2);
        assert!(warp_profile(&depth, &value[..5], &zeros, 5.0, None).is_err());
        assert!(warp_profile(&depth, &value, &zeros, 0.0, None).is_err());
        assert!(warp_profile(&depth, &value, &zeros, 5.0, Some(-1.0)).is_err());
        assert!(warp_profile(&depth, &value, &ScalingVector(vec![-1.0, 0.0]), 5.0, None).is_err());
    }
}
