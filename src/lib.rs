//! `smp-align` library crate.
//!
//! Calibrates snow micro-penetrometer (SMP) shot-noise profiles to density or
//! specific surface area and registers them against sparse snow-pit
//! measurements by a seeded random search over per-layer stretch factors.
//!
//! The binary (`smpalign`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - calibration and alignment are reusable from other tools

pub mod align;
pub mod app;
pub mod calibration;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
