//! Input/output helpers.
//!
//! - search config from JSON (`json`)
//! - fit result JSON read/write (`json`)

pub mod json;

pub use json::*;
