//! Dataset evaluation functions.
//!
//! Transforms are kept behind a small trait so the search code can stay generic
//! over whatever the caller plugs in.

pub mod model;

pub use model::*;
