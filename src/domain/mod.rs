//! Domain types used throughout the search.
//!
//! This module defines:
//!
//! - inputs (`Dataset`, `ScalingPoints`, `ParamSet`)
//! - options (`SearchConfig`, `Strategy`, `GradientConfig`)
//! - outputs (`FitOutput`, `CurveOutput`, `SearchReport`)

pub mod types;

pub use types::*;
