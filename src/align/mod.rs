//! Profile alignment engine.
//!
//! Responsibilities:
//!
//! - draw per-layer stretch candidates under a budget (`scaling`)
//! - warp a profile with a candidate (`warp`)
//! - sample a profile at reference depths (`extract`)
//! - score samples against the reference (`skill`)
//! - run and rank the trials (`search`)

pub mod extract;
pub mod scaling;
pub mod search;
pub mod skill;
pub mod warp;

pub use extract::*;
pub use scaling::*;
pub use search::*;
pub use skill::*;
pub use warp::*;
