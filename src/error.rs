//! Crate-wide error type.
//!
//! Only fatal conditions live here. Sparse comparisons and empty extraction
//! windows are not errors: they surface as `NaN` statistics/metrics and the
//! caller decides what to do with them.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AlignError>;

#[derive(Debug, Error)]
pub enum AlignError {
    /// Reference/profile tables are unusable as given (missing or ambiguous
    /// quantity column, mismatched quantities, no rows).
    #[error("input data error: {0}")]
    InputData(String),

    /// A calibration formula received a non-positive (or non-finite) input.
    #[error("numeric domain error at row {index}: force_median={force}, l={l} (both must be > 0)")]
    NumericDomain { index: usize, force: f64, l: f64 },

    /// The candidate generator exhausted its retry budget.
    #[error(
        "could not draw {layer_count} layer stretches within |sum| <= {max_total_stretch} \
         (per layer <= {max_layer_stretch}) after {attempts} attempts"
    )]
    ScalingBudgetUnsatisfiable {
        layer_count: usize,
        max_total_stretch: f64,
        max_layer_stretch: f64,
        attempts: usize,
    },

    /// A configuration or function argument is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Not enough observations to fit a model.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlignError {
    /// Process exit code for the `smpalign` binary.
    ///
    /// - 2: usage, configuration or file problems
    /// - 3: input data problems
    /// - 4: numeric/search failures
    pub fn exit_code(&self) -> u8 {
        match self {
            AlignError::InvalidParameter(_)
            | AlignError::Io { .. }
            | AlignError::Csv(_)
            | AlignError::Json(_) => 2,
            AlignError::InputData(_) | AlignError::InsufficientData(_) => 3,
            AlignError::NumericDomain { .. } | AlignError::ScalingBudgetUnsatisfiable { .. } => 4,
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AlignError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(AlignError::InvalidParameter("x".into()).exit_code(), 2);
        assert_eq!(AlignError::InputData("x".into()).exit_code(), 3);
        let e = AlignError::ScalingBudgetUnsatisfiable {
            layer_count: 3,
            max_total_stretch: 0.0,
            max_layer_stretch: 0.5,
            attempts: 10,
        };
        assert_eq!(e.exit_code(), 4);
        assert!(e.to_string().contains("after 10 attempts"));
    }
}
