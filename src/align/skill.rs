//! Skill of an extracted profile against reference measurements.

use crate::domain::{ComparisonRow, ComparisonTable, ReferenceProfile, SampleStats, Skill};
use crate::math::{pearson, rmse};

/// Join extracted statistics row-by-row with the reference they were taken for.
pub fn build_comparison(samples: Vec<SampleStats>, reference: &ReferenceProfile) -> ComparisonTable {
    let rows = samples
        .into_iter()
        .zip(reference.records.iter())
        .map(|(samples, reference)| ComparisonRow {
            samples,
            reference: reference.clone(),
        })
        .collect();
    ComparisonTable { rows }
}

/// Pearson `r` and RMSE between extracted means and reference values.
///
/// With `drop_incomplete`, rows with an empty window or a missing reference
/// value are removed first; otherwise they poison the metrics with `NaN`.
/// New snow and ice rows are always excluded. Fewer than two scored rows give
/// `NaN` for both metrics.
pub fn calc_skill(table: &ComparisonTable, drop_incomplete: bool) -> Skill {
    let complete: Vec<&ComparisonRow> = table
        .rows
        .iter()
        .filter(|row| !drop_incomplete || row.is_complete())
        .collect();
    let n_complete = complete.len();

    let (sampled, reference): (Vec<f64>, Vec<f64>) = complete
        .into_iter()
        .filter(|row| !row.reference.grain_type.as_ref().is_some_and(|g| g.is_excluded()))
        .map(|row| (row.samples.mean, row.reference.value))
        .unzip();
    let n_scored = sampled.len();

    if n_scored < 2 {
        return Skill {
            r: f64::NAN,
            rmse: f64::NAN,
            n_complete,
            n_scored,
        };
    }

    Skill {
        r: pearson(&sampled, &reference),
        rmse: rmse(&sampled, &reference),
        n_complete,
        n_scored,
    }
}
