//! `curve-collapse` library crate.
//!
//! Searches for the free parameters that make several transformed curves
//! coincide. Each dataset carries a domain, an optional transform of it and
//! optional reference points that rescale the domain in and the outputs back.
//! The search minimizes the summed per-position spread of the curves by grid
//! refinement (default) or a bounded gradient method.
//!
//! The entry point is [`optimize_arguments`]. The library only emits `tracing`
//! events; installing a subscriber is up to the caller.

pub mod app;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;

pub use app::optimize_arguments;
pub use domain::{
    CurveOutput, Dataset, FitOutput, GradientConfig, GradientReport, ParamSet, RefPoints,
    RoundSummary, ScalingPoints, SearchConfig, SearchReport, Strategy,
};
pub use error::{CollapseError, ErrorKind, EvalError};
pub use models::{CurveFn, Identity, Infallible, SharedCurveFn, infallible};
