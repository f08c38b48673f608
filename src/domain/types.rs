//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during calibration and alignment
//! - exported to JSON/CSV
//! - built by tests and the synthetic data generator without any I/O

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

/// Physical quantity compared between the penetration profile and the pit.
///
/// Resolved once at the input boundary (see [`Quantity::resolve`]) instead of
/// being re-derived from column names at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Density,
    Ssa,
}

impl Quantity {
    pub const ALL: [Quantity; 2] = [Quantity::Density, Quantity::Ssa];

    /// Canonical column name in profile/reference tables.
    pub fn column_name(self) -> &'static str {
        match self {
            Quantity::Density => "density",
            Quantity::Ssa => "ssa",
        }
    }

    pub fn unit_label(self) -> &'static str {
        match self {
            Quantity::Density => "kg/m^3",
            Quantity::Ssa => "m^2/kg",
        }
    }

    /// Decide which quantity a table carries from its column names.
    ///
    /// Exactly one of `density`/`ssa` must be present. When both are present
    /// the caller has to pick one via `explicit`; column order never decides.
    pub fn resolve<'a, I>(columns: I, explicit: Option<Quantity>) -> Result<Quantity>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let columns: Vec<&str> = columns.into_iter().collect();
        let found: Vec<Quantity> = Quantity::ALL
            .into_iter()
            .filter(|q| columns.iter().any(|c| *c == q.column_name()))
            .collect();

        match (explicit, found.as_slice()) {
            (Some(q), found) if found.contains(&q) => Ok(q),
            (Some(q), _) => Err(AlignError::InputData(format!(
                "requested quantity '{}' but the table has no such column",
                q.column_name()
            ))),
            (None, [q]) => Ok(*q),
            (None, []) => Err(AlignError::InputData(
                "table has neither a 'density' nor an 'ssa' column".to_string(),
            )),
            (None, _) => Err(AlignError::InputData(
                "table has both 'density' and 'ssa' columns; choose one explicitly".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One window of the shot-noise analysis of a penetration profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotNoiseRecord {
    /// Depth below the snow surface (mm).
    pub depth: f64,
    /// Median penetration force in the window (N).
    pub force_median: f64,
    /// Shot-noise intensity (1/mm).
    pub lambda: f64,
    /// Rupture force (N).
    pub f0: f64,
    /// Deflection at rupture (mm).
    pub delta: f64,
    /// Microstructural element size (mm).
    pub l: f64,
}

/// Regularly spaced shot-noise records, ordered by depth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShotNoiseProfile {
    pub records: Vec<ShotNoiseRecord>,
}

impl ShotNoiseProfile {
    pub fn new(records: Vec<ShotNoiseRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.depth).collect()
    }
}

/// A depth profile of one calibrated quantity; the thing that gets aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityProfile {
    pub quantity: Quantity,
    pub depth: Vec<f64>,
    pub value: Vec<f64>,
}

impl QuantityProfile {
    /// Build a profile, checking that the arrays line up and depth ascends.
    pub fn new(quantity: Quantity, depth: Vec<f64>, value: Vec<f64>) -> Result<Self> {
        if depth.len() != value.len() {
            return Err(AlignError::InputData(format!(
                "profile depth/value length mismatch ({} vs {})",
                depth.len(),
                value.len()
            )));
        }
        if depth.is_empty() {
            return Err(AlignError::InputData("profile has no samples".to_string()));
        }
        if depth.iter().any(|d| !d.is_finite()) {
            return Err(AlignError::InputData("profile depth contains non-finite values".to_string()));
        }
        if depth.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AlignError::InputData("profile depth must be strictly ascending".to_string()));
        }
        Ok(Self {
            quantity,
            depth,
            value,
        })
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    pub fn max_depth(&self) -> f64 {
        self.depth.last().copied().unwrap_or(0.0)
    }
}

/// Grain class code recorded in the pit stratigraphy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrainType(pub String);

impl GrainType {
    /// Classes too sparsely sampled in pits to be meaningful comparators.
    pub const EXCLUDED: [&'static str; 4] = ["n", "i", "new-snow", "ice"];

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// New snow and ice are excluded from skill scoring.
    pub fn is_excluded(&self) -> bool {
        let code = self.0.trim().to_ascii_lowercase();
        Self::EXCLUDED.contains(&code.as_str())
    }
}

/// One physical reference measurement from the pit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Height of the sample midpoint above ground (mm). The largest height
    /// approximates the pit's snow depth.
    pub height: f64,
    /// Depth of the sample midpoint below the snow surface (mm).
    pub rel_depth: f64,
    /// Measured density or SSA, per the owning profile's quantity.
    pub value: f64,
    pub grain_type: Option<GrainType>,
}

/// Sparse reference observations for a single site and quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    pub site: String,
    pub quantity: Quantity,
    pub records: Vec<ReferenceRecord>,
}

impl ReferenceProfile {
    pub fn new(site: impl Into<String>, quantity: Quantity, records: Vec<ReferenceRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(AlignError::InputData("reference table has no rows".to_string()));
        }
        if records.iter().any(|r| !(r.height.is_finite() && r.rel_depth.is_finite())) {
            return Err(AlignError::InputData(
                "reference heights/depths must be finite".to_string(),
            ));
        }
        Ok(Self {
            site: site.into(),
            quantity,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_height(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.height)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn rel_depths(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.rel_depth).collect()
    }
}

/// Per-layer stretch (+) / erosion (-) fractions, in spatial layer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalingVector(pub Vec<f64>);

impl ScalingVector {
    /// The identity transform over `layer_count` layers.
    pub fn zeros(layer_count: usize) -> Self {
        Self(vec![0.0; layer_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Net change of the whole profile length, as a fraction.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

/// A re-registered profile produced by the warper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarpedProfile {
    pub depth: Vec<f64>,
    pub value: Vec<f64>,
}

impl WarpedProfile {
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }
}

/// Summary statistics of the profile samples around one target depth.
///
/// An empty window has `count == 0` and `NaN` everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub stdev: f64,
}

impl SampleStats {
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            stdev: f64::NAN,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.count > 0 && self.mean.is_finite() && self.median.is_finite() && self.stdev.is_finite()
    }
}

/// Extracted statistics joined with the reference row they were sampled for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub samples: SampleStats,
    pub reference: ReferenceRecord,
}

impl ComparisonRow {
    /// Every statistic and the reference value are usable. A missing grain
    /// type does not make a row incomplete.
    pub fn is_complete(&self) -> bool {
        self.samples.is_complete() && self.reference.value.is_finite()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Agreement between extracted samples and reference values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Pearson correlation; `NaN` with fewer than two rows or zero variance.
    pub r: f64,
    pub rmse: f64,
    /// Rows left after dropping incomplete rows.
    pub n_complete: usize,
    /// Rows actually scored (after grain exclusion).
    pub n_scored: usize,
}

/// Search configuration.
///
/// Derived from CLI flags in the binary; `Default` holds the standard setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Number of random trials.
    pub trials: usize,
    /// Nominal layer thickness (mm).
    pub layer_height: f64,
    /// Bound on `|sum(scaling)|`.
    pub max_total_stretch: f64,
    /// Bound on each `|scaling[i]|`.
    pub max_layer_stretch: f64,
    /// Half height of the reference sampler (mm).
    pub half_window: f64,
    pub seed: u64,
    /// Output step of the warped profile (mm); source spacing when `None`.
    pub resample_step: Option<f64>,
    pub drop_incomplete: bool,
    /// Run trials on the rayon pool.
    pub parallel: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            trials: 2000,
            layer_height: 50.0,
            max_total_stretch: 0.15,
            max_layer_stretch: 0.75,
            half_window: 15.0,
            seed: 2021,
            resample_step: None,
            drop_incomplete: true,
            parallel: true,
        }
    }
}

impl AlignConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(AlignError::InvalidParameter("trials must be > 0".to_string()));
        }
        let positive = [
            ("layer_height", self.layer_height),
            ("half_window", self.half_window),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(AlignError::InvalidParameter(format!("{name} must be finite and > 0 (got {v})")));
            }
        }
        if !(self.max_total_stretch.is_finite() && self.max_total_stretch >= 0.0) {
            return Err(AlignError::InvalidParameter(format!(
                "max_total_stretch must be finite and >= 0 (got {})",
                self.max_total_stretch
            )));
        }
        // A layer stretched by -100% or more would have no thickness left.
        if !(self.max_layer_stretch.is_finite() && (0.0..1.0).contains(&self.max_layer_stretch)) {
            return Err(AlignError::InvalidParameter(format!(
                "max_layer_stretch must be in [0, 1) (got {})",
                self.max_layer_stretch
            )));
        }
        if let Some(step) = self.resample_step {
            if !(step.is_finite() && step > 0.0) {
                return Err(AlignError::InvalidParameter(format!(
                    "resample_step must be finite and > 0 (got {step})"
                )));
            }
        }
        Ok(())
    }
}

/// The retained outcome of an alignment search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub site: String,
    pub quantity: Quantity,
    pub r: f64,
    pub rmse: f64,
    pub scaling: ScalingVector,
    /// Sum of the chosen scaling vector (net stretch fraction).
    pub total_stretch: f64,
    /// Reference observations available.
    pub n_obs: usize,
    /// Complete comparison rows in the winning trial.
    pub n_comp: usize,
    pub n_trials: usize,
    pub best_trial: usize,
    pub layer_count: usize,
    pub comparison: ComparisonTable,
}

impl AlignmentResult {
    pub fn total_stretch_percent(&self) -> f64 {
        self.total_stretch * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_picks_the_only_quantity_column() {
        let q = Quantity::resolve(["height", "rel_depth", "ssa", "site"], None).unwrap();
        assert_eq!(q, Quantity::Ssa);
    }

    #[test]
    fn resolve_rejects_missing_and_ambiguous_columns() {
        let none = Quantity::resolve(["height", "rel_depth"], None);
        assert!(matches!(none, Err(AlignError::InputData(_))));

        let both = Quantity::resolve(["ssa", "density"], None);
        assert!(matches!(both, Err(AlignError::InputData(_))));

        let chosen = Quantity::resolve(["ssa", "density"], Some(Quantity::Density)).unwrap();
        assert_eq!(chosen, Quantity::Density);

        let absent = Quantity::resolve(["ssa"], Some(Quantity::Density));
        assert!(matches!(absent, Err(AlignError::InputData(_))));
    }

    #[test]
    fn grain_exclusion_is_case_insensitive() {
        assert!(GrainType::new("N").is_excluded());
        assert!(GrainType::new(" i ").is_excluded());
        assert!(GrainType::new("ice").is_excluded());
        assert!(!GrainType::new("DH").is_excluded());
        assert!(!GrainType::new("R").is_excluded());
    }

    #[test]
    fn quantity_profile_requires_ascending_depth() {
        let err = QuantityProfile::new(Quantity::Density, vec![0.0, 2.0, 1.0], vec![1.0; 3]);
        assert!(matches!(err, Err(AlignError::InputData(_))));
        let err = QuantityProfile::new(Quantity::Density, vec![0.0, 1.0], vec![1.0]);
        assert!(matches!(err, Err(AlignError::InputData(_))));
    }

    #[test]
    fn default_config_is_valid_and_checks_ranges() {
        assert!(AlignConfig::default().validate().is_ok());
        let bad = AlignConfig {
            max_layer_stretch: 1.0,
            ..AlignConfig::default()
        };
        assert!(matches!(bad.validate(), Err(AlignError::InvalidParameter(_))));
        let bad = AlignConfig {
            trials: 0,
            ..AlignConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
