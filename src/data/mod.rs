//! Input preparation: truncation, domain scaling and the joint finite filter.

pub mod normalize;

pub use normalize::*;
