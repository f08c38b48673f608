//! Export alignment and calibration results to CSV/JSON.
//!
//! The CSV exports are meant to be easy to consume in spreadsheets or
//! downstream scripts; the JSON export is the complete result.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::calibration::CalibratedProfile;
use crate::domain::{AlignConfig, AlignmentResult, ComparisonTable, WarpedProfile};
use crate::error::{AlignError, Result};

/// Write one row per reference observation with its extracted statistics.
pub fn write_comparison_csv(path: &Path, table: &ComparisonTable) -> Result<()> {
    write_comparison(create(path)?, table)
}

pub fn write_comparison<W: Write>(writer: W, table: &ComparisonTable) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record([
        "height",
        "rel_depth",
        "reference",
        "grain_type",
        "count",
        "mean",
        "median",
        "stdev",
    ])?;
    for row in &table.rows {
        let r = &row.reference;
        let s = &row.samples;
        w.write_record([
            fmt_num(r.height),
            fmt_num(r.rel_depth),
            fmt_num(r.value),
            r.grain_type.as_ref().map(|g| g.as_str().to_string()).unwrap_or_default(),
            s.count.to_string(),
            fmt_num(s.mean),
            fmt_num(s.median),
            fmt_num(s.stdev),
        ])?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write an aligned `(depth, value)` profile.
pub fn write_aligned_csv(path: &Path, profile: &WarpedProfile, column: &str) -> Result<()> {
    let mut w = csv::Writer::from_writer(create(path)?);
    w.write_record(["depth", column])?;
    for (d, v) in profile.depth.iter().zip(&profile.value) {
        w.write_record([fmt_num(*d), fmt_num(*v)])?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write the shot-noise table with the calibrated column appended.
pub fn write_calibrated_csv(path: &Path, profile: &CalibratedProfile) -> Result<()> {
    write_calibrated(create(path)?, profile)
}

pub fn write_calibrated<W: Write>(writer: W, profile: &CalibratedProfile) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record([
        "depth",
        "force_median",
        "lambda",
        "f0",
        "delta",
        "l",
        profile.quantity.column_name(),
    ])?;
    for c in &profile.records {
        let r = &c.record;
        w.write_record([
            fmt_num(r.depth),
            fmt_num(r.force_median),
            fmt_num(r.lambda),
            fmt_num(r.f0),
            fmt_num(r.delta),
            fmt_num(r.l),
            fmt_num(c.value),
        ])?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// JSON document: the search settings next to the result they produced.
#[derive(Debug, Serialize)]
struct ResultDocument<'a> {
    config: &'a AlignConfig,
    result: &'a AlignmentResult,
}

/// Write the full alignment result (and the config that produced it) as
/// pretty JSON.
pub fn write_result_json(path: &Path, result: &AlignmentResult, config: &AlignConfig) -> Result<()> {
    let json = result_json(result, config)?;
    std::fs::write(path, json).map_err(|e| AlignError::io(path, e))
}

pub fn result_json(result: &AlignmentResult, config: &AlignConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ResultDocument { config, result })?)
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| AlignError::io(path, e))
}

/// Missing statistics are written as empty cells.
fn fmt_num(v: f64) -> String {
    if v.is_finite() { v.to_string() } else { String::new() }
}
