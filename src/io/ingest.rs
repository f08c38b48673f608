//! CSV ingest for shot-noise profiles, quantity profiles and pit references.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors, nothing guessed)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Quantity resolved once** from the header, never per row
//! - **No alignment logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::domain::{
    GrainType, Quantity, QuantityProfile, ReferenceProfile, ReferenceRecord, ShotNoiseProfile, ShotNoiseRecord,
};
use crate::error::{AlignError, Result};

/// Accepted names for the depth-below-surface column.
const DEPTH_COLUMNS: [&str; 3] = ["depth", "rel_height", "rel_depth"];
/// Accepted names for the reference depth-below-surface column.
const REL_DEPTH_COLUMNS: [&str; 2] = ["rel_depth", "rel_height"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the parsed table plus what was skipped.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub data: T,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl<T> Ingested<T> {
    pub fn rows_used(&self) -> usize {
        self.rows_read - self.row_errors.len()
    }
}

pub fn load_shot_noise_csv(path: &Path) -> Result<Ingested<ShotNoiseProfile>> {
    read_shot_noise(open(path)?)
}

pub fn load_quantity_profile_csv(path: &Path, explicit: Option<Quantity>) -> Result<Ingested<QuantityProfile>> {
    read_quantity_profile(open(path)?, explicit)
}

/// Load a reference table. `site` overrides the table's `site` column.
pub fn load_reference_csv(
    path: &Path,
    explicit: Option<Quantity>,
    site: Option<&str>,
) -> Result<Ingested<ReferenceProfile>> {
    read_reference(open(path)?, explicit, site)
}

pub fn read_shot_noise<R: Read>(reader: R) -> Result<Ingested<ShotNoiseProfile>> {
    let (headers, mut reader) = start(reader)?;
    let depth_col = require_any(&headers, &DEPTH_COLUMNS)?;
    let cols = ["force_median", "lambda", "f0", "delta", "l"]
        .into_iter()
        .map(|c| require(&headers, c))
        .collect::<Result<Vec<usize>>>()?;

    let (rows, row_errors, rows_read) = parse_rows(&mut reader, |record| {
        Ok(ShotNoiseRecord {
            depth: field(record, depth_col)?,
            force_median: field(record, cols[0])?,
            lambda: field(record, cols[1])?,
            f0: field(record, cols[2])?,
            delta: field(record, cols[3])?,
            l: field(record, cols[4])?,
        })
    })?;

    let profile = ShotNoiseProfile::new(rows);
    if profile.records.windows(2).any(|w| w[1].depth <= w[0].depth) {
        return Err(AlignError::InputData(
            "shot-noise profile depth must be strictly ascending".to_string(),
        ));
    }
    Ok(Ingested {
        data: profile,
        row_errors,
        rows_read,
    })
}

pub fn read_quantity_profile<R: Read>(reader: R, explicit: Option<Quantity>) -> Result<Ingested<QuantityProfile>> {
    let (headers, mut reader) = start(reader)?;
    let quantity = Quantity::resolve(headers.keys().map(String::as_str), explicit)?;
    let depth_col = require_any(&headers, &DEPTH_COLUMNS)?;
    let value_col = require(&headers, quantity.column_name())?;

    let (rows, row_errors, rows_read) = parse_rows(&mut reader, |record| {
        Ok((field(record, depth_col)?, field(record, value_col)?))
    })?;
    let (depth, value) = rows.into_iter().unzip();

    Ok(Ingested {
        data: QuantityProfile::new(quantity, depth, value)?,
        row_errors,
        rows_read,
    })
}

pub fn read_reference<R: Read>(
    reader: R,
    explicit: Option<Quantity>,
    site: Option<&str>,
) -> Result<Ingested<ReferenceProfile>> {
    let (headers, mut reader) = start(reader)?;
    let quantity = Quantity::resolve(headers.keys().map(String::as_str), explicit)?;
    let height_col = require(&headers, "height")?;
    let rel_col = require_any(&headers, &REL_DEPTH_COLUMNS)?;
    let value_col = require(&headers, quantity.column_name())?;
    let grain_col = headers.get("grain_type").copied();
    let site_col = headers.get("site").copied();

    let (rows, row_errors, rows_read) = parse_rows(&mut reader, |record| {
        let parsed = ReferenceRecord {
            height: field(record, height_col)?,
            rel_depth: field(record, rel_col)?,
            value: field(record, value_col)?,
            grain_type: grain_col
                .and_then(|c| record.get(c))
                .filter(|g| !g.is_empty())
                .map(GrainType::new),
        };
        let row_site = site_col
            .and_then(|c| record.get(c))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok((parsed, row_site))
    })?;

    // Skipped rows do not contribute a site.
    let mut sites: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());
    for (record, row_site) in rows {
        if let Some(s) = row_site.filter(|s| !sites.contains(s)) {
            sites.push(s);
        }
        records.push(record);
    }

    if sites.len() > 1 && site.is_none() {
        warn!(sites = ?sites, "reference table mixes sites; using the first");
    }
    let site = site
        .map(str::to_string)
        .or_else(|| sites.into_iter().next())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(Ingested {
        data: ReferenceProfile::new(site, quantity, records)?,
        row_errors,
        rows_read,
    })
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| AlignError::io(path, e))
}

fn start<R: Read>(reader: R) -> Result<(HashMap<String, usize>, csv::Reader<R>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = build_header_map(reader.headers()?);
    Ok((headers, reader))
}

/// Parse every record with `parse`, collecting row errors.
///
/// Fails when no row survives.
fn parse_rows<R, T, F>(reader: &mut csv::Reader<R>, mut parse: F) -> Result<(Vec<T>, Vec<RowError>, usize)>
where
    R: Read,
    F: FnMut(&StringRecord) -> std::result::Result<T, String>,
{
    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;
        match result {
            Ok(record) => match parse(&record) {
                Ok(row) => rows.push(row),
                Err(message) => row_errors.push(RowError { line, message }),
            },
            Err(e) => row_errors.push(RowError {
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), rows_read, "skipped unusable CSV rows");
    }
    if rows.is_empty() {
        return Err(AlignError::InputData(
            "no valid rows remain after parsing".to_string(),
        ));
    }
    Ok((rows, row_errors, rows_read))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn require(headers: &HashMap<String, usize>, name: &str) -> Result<usize> {
    headers
        .get(name)
        .copied()
        .ok_or_else(|| AlignError::InputData(format!("missing required column '{name}'")))
}

fn require_any(headers: &HashMap<String, usize>, names: &[&str]) -> Result<usize> {
    names
        .iter()
        .find_map(|n| headers.get(*n).copied())
        .ok_or_else(|| AlignError::InputData(format!("missing required column (one of {})", names.join(", "))))
}

fn field(record: &StringRecord, col: usize) -> std::result::Result<f64, String> {
    let raw = record.get(col).unwrap_or("");
    if raw.is_empty() {
        return Err(format!("empty value in column {}", col + 1));
    }
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("invalid number '{raw}' in column {}", col + 1))?;
    if !v.is_finite() {
        return Err(format!("non-finite value '{raw}' in column {}", col + 1));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_shot_noise_table() {
        let csv = "rel_height,force_median,lambda,f0,delta,l\n\
                   0.0,0.10,5.0,0.2,0.1,0.20\n\
                   2.5,0.12,5.1,0.2,0.1,0.21\n\
                   5.0,oops,5.2,0.2,0.1,0.22\n\
                   7.5,0.15,5.3,0.2,0.1,0.23\n";
        let out = read_shot_noise(csv.as_bytes()).unwrap();
        assert_eq!(out.rows_read, 4);
        assert_eq!(out.rows_used(), 3);
        assert_eq!(out.row_errors[0].line, 4);
        assert_eq!(out.data.depths(), vec![0.0, 2.5, 7.5]);
    }

    #[test]
    fn reference_quantity_comes_from_the_header() {
        let csv = "\u{feff}Height,rel_height,SSA,grain_type,site\n\
                   450,50,35.2,R,RS01\n\
                   350,150,,F,RS01\n\
                   250,250,22.1,,RS01\n";
        let out = read_reference(csv.as_bytes(), None, None).unwrap();
        let reference = out.data;
        assert_eq!(reference.quantity, Quantity::Ssa);
        assert_eq!(reference.site, "RS01");
        assert_eq!(reference.len(), 2);
        assert_eq!(out.row_errors.len(), 1);
        assert_eq!(reference.records[0].grain_type, Some(GrainType::new("R")));
        assert_eq!(reference.records[1].grain_type, None);
        assert_eq!(reference.max_height(), 450.0);
    }

    #[test]
    fn skipped_rows_do_not_name_the_site() {
        let csv = "site,height,rel_depth,density\n\
                   OTHER,450,50,\n\
                   RS01,350,150,260\n\
                   RS01,250,250,280\n";
        let out = read_reference(csv.as_bytes(), None, None).unwrap();
        assert_eq!(out.row_errors.len(), 1);
        assert_eq!(out.row_errors[0].line, 2);
        assert_eq!(out.data.site, "RS01");
        assert_eq!(out.data.len(), 2);
    }

    #[test]
    fn ambiguous_reference_needs_an_explicit_quantity() {
        let csv = "height,rel_depth,density,ssa\n450,50,210,35\n350,150,260,28\n";
        let err = read_reference(csv.as_bytes(), None, None).unwrap_err();
        assert!(matches!(err, AlignError::InputData(_)));

        let out = read_reference(csv.as_bytes(), Some(Quantity::Density), Some("SITE")).unwrap();
        assert_eq!(out.data.quantity, Quantity::Density);
        assert_eq!(out.data.site, "SITE");
        assert_eq!(out.data.records[1].value, 260.0);
    }

    #[test]
    fn reference_without_quantity_column_is_rejected() {
        let csv = "height,rel_depth,grain_type\n450,50,R\n";
        assert!(matches!(
            read_reference(csv.as_bytes(), None, None),
            Err(AlignError::InputData(_))
        ));
    }

    #[test]
    fn quantity_profile_reads_depth_aliases() {
        let csv = "depth,density\n0,120\n1,125\n2,131\n";
        let out = read_quantity_profile(csv.as_bytes(), None).unwrap();
        assert_eq!(out.data.quantity, Quantity::Density);
        assert_eq!(out.data.value, vec![120.0, 125.0, 131.0]);
    }

    #[test]
    fn missing_columns_and_empty_tables_fail() {
        let csv = "depth,force_median\n0,1\n";
        assert!(matches!(read_shot_noise(csv.as_bytes()), Err(AlignError::InputData(_))));

        let csv = "depth,density\n";
        assert!(matches!(
            read_quantity_profile(csv.as_bytes(), None),
            Err(AlignError::InputData(_))
        ));
    }
}
