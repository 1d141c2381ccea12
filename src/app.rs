//! Top-level orchestration.
//!
//! A run is a single library call:
//!
//! - build per-parameter plans from the trial values and config
//! - normalize datasets (defaults, truncation, scaling, joint finite filter)
//! - run the configured search strategy
//! - map the winning curves back into each dataset's units

pub mod pipeline;

pub use pipeline::*;
