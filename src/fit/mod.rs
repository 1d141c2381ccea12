//! Parameter search orchestration.
//!
//! Responsibilities:
//!
//! - build per-parameter plans (trial value + neighborhood half-width)
//! - evaluate candidate parameter vectors against the normalized datasets
//! - run either search strategy (grid refinement or bounded gradient)

pub mod evaluator;
pub mod gradient;
pub mod grid;
pub mod neighborhood;
pub mod plan;
pub mod strategy;

pub use evaluator::*;
pub use gradient::*;
pub use grid::*;
pub use neighborhood::*;
pub use plan::*;
pub use strategy::*;
