//! Windowed sampling of a profile at arbitrary target depths.

use crate::domain::SampleStats;
use crate::math::{mean, median, std_dev};

/// Summarize the samples within `half_window` of each target depth.
///
/// `depth` must be non-decreasing (raw and warped profiles both are). One row
/// per target, in target order; empty windows give [`SampleStats::empty`].
pub fn extract_samples(depth: &[f64], value: &[f64], targets: &[f64], half_window: f64) -> Vec<SampleStats> {
    let n = depth.len().min(value.len());
    let depth = &depth[..n];

    targets
        .iter()
        .map(|&target| {
            if !target.is_finite() {
                return SampleStats::empty();
            }
            let lo = depth.partition_point(|&d| d < target - half_window);
            let hi = depth.partition_point(|&d| d <= target + half_window);
            summarize(&value[lo..hi.max(lo)])
        })
        .collect()
}

fn summarize(window: &[f64]) -> SampleStats {
    if window.is_empty() {
        return SampleStats::empty();
    }
    SampleStats {
        count: window.len(),
        mean: mean(window),
        median: median(window),
        stdev: std_dev(window),
    }
}
