//! Shot-noise calibration.
//!
//! - forward models mapping `(force_median, l)` to density/SSA (`model`)
//! - least squares fitting of their coefficients (`regress`)

pub mod model;
pub mod regress;

pub use model::*;
pub use regress::*;
