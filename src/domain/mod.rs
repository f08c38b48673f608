//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the compared quantity (`Quantity`) and its boundary resolution
//! - input tables (`ShotNoiseProfile`, `QuantityProfile`, `ReferenceProfile`)
//! - per-trial intermediates (`ScalingVector`, `WarpedProfile`, `ComparisonTable`)
//! - search configuration and output (`AlignConfig`, `AlignmentResult`)

pub mod types;

pub use types::*;
