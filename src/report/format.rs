//! Formatted terminal output for alignment and calibration runs.
//!
//! We keep formatting code in one place so:
//! - the math/search code stays clean and testable
//! - output changes are localized

use crate::calibration::CalibratedProfile;
use crate::domain::{AlignConfig, AlignmentResult, ComparisonTable};

/// Format the run summary (setup, skill and chosen scaling).
pub fn format_alignment_summary(result: &AlignmentResult, config: &AlignConfig) -> String {
    let mut out = String::new();

    out.push_str("=== smpalign - SMP profile alignment ===\n");
    out.push_str(&format!("Site: {}\n", result.site));
    out.push_str(&format!(
        "Quantity: {} ({})\n",
        result.quantity,
        result.quantity.unit_label()
    ));
    out.push_str(&format!(
        "Search: trials={} | layer={:.1}mm | window=±{:.1}mm | seed={}\n",
        result.n_trials, config.layer_height, config.half_window, config.seed
    ));
    out.push_str(&format!(
        "Budget: |total|<={:.1}% | |layer|<={:.1}%\n",
        config.max_total_stretch * 100.0,
        config.max_layer_stretch * 100.0
    ));

    out.push_str("\nBest trial:\n");
    out.push_str(&format!("- trial: {}\n", result.best_trial));
    out.push_str(&format!("- r    : {}\n", fmt_metric(result.r, 3)));
    out.push_str(&format!("- rmse : {}\n", fmt_metric(result.rmse, 2)));
    out.push_str(&format!(
        "- obs  : {} reference, {} compared\n",
        result.n_obs, result.n_comp
    ));
    out.push_str(&format!("- total stretch: {:+.2}%\n", result.total_stretch_percent()));
    out.push_str(&format!("- scaling ({} layers): {}\n", result.layer_count, fmt_vec(result.scaling.as_slice())));
    out.push('\n');

    out
}

/// Format the reference-vs-extracted comparison table.
pub fn format_comparison(table: &ComparisonTable) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>9} {:>9} {:>10} {:>10} {:>8} {:>6} {:<6}\n",
            "height", "rel_depth", "reference", "mean", "stdev", "n", "grain"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<9} {:-<9} {:-<10} {:-<10} {:-<8} {:-<6} {:-<6}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for row in &table.rows {
        let r = &row.reference;
        let s = &row.samples;
        out.push_str(
            format!(
                "{:>9.1} {:>9.1} {:>10} {:>10} {:>8} {:>6} {:<6}\n",
                r.height,
                r.rel_depth,
                fmt_metric(r.value, 1),
                fmt_metric(s.mean, 1),
                fmt_metric(s.stdev, 2),
                s.count,
                r.grain_type.as_ref().map(|g| g.as_str()).unwrap_or("-"),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format a short summary of a calibrated profile.
pub fn format_calibration_summary(profile: &CalibratedProfile) -> String {
    let values: Vec<f64> = profile.records.iter().map(|r| r.value).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (top, bottom) = match (profile.records.first(), profile.records.last()) {
        (Some(first), Some(last)) => (first.record.depth, last.record.depth),
        _ => (f64::NAN, f64::NAN),
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Calibrated {} ({}): n={} | depth=[{:.1}, {:.1}]mm | value=[{}, {}]\n",
        profile.quantity,
        profile.quantity.unit_label(),
        values.len(),
        top,
        bottom,
        fmt_metric(min, 1),
        fmt_metric(max, 1),
    ));
    out
}

fn fmt_metric(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        "n/a".to_string()
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:+.3}")).collect();
    format!("[{}]", parts.join(", "))
}
