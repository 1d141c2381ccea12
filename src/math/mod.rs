//! Numerical building blocks: affine scaling and the dispersion objective.

pub mod dispersion;
pub mod scaling;

pub use dispersion::*;
pub use scaling::*;
