//! Shared domain types.
//!
//! Inputs (`Dataset`, `ParamSet`, `SearchConfig`) are plain builders; outputs
//! (`FitOutput` and friends) are serializable so runs can be exported and reloaded.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::math::PointPair;
use crate::models::{CurveFn, SharedCurveFn};

/// Two reference points `(x1, y1)` and `(x2, y2)` in one coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefPoints {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl RefPoints {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn xs(&self) -> PointPair {
        PointPair::new(self.x1, self.x2)
    }

    pub fn ys(&self) -> PointPair {
        PointPair::new(self.y1, self.y2)
    }
}

/// Scaling reference points for one dataset.
///
/// The x coordinates map the dataset's native domain (home) into the shared
/// search domain (away). The y coordinates are used the other way round: fitted
/// outputs live on the away side and are mapped back onto the home side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingPoints {
    pub home_points: RefPoints,
    pub away_points: RefPoints,
}

impl ScalingPoints {
    pub fn new(home_points: RefPoints, away_points: RefPoints) -> Self {
        Self {
            home_points,
            away_points,
        }
    }

    /// `(home, away)` pairs for the forward domain transform.
    pub fn domain_pairs(&self) -> (PointPair, PointPair) {
        (self.home_points.xs(), self.away_points.xs())
    }

    /// `(home, away)` pairs for the output transform (sides swapped).
    pub fn range_pairs(&self) -> (PointPair, PointPair) {
        (self.away_points.ys(), self.home_points.ys())
    }
}

/// One curve to collapse: a domain plus an optional transform of it.
#[derive(Clone)]
pub struct Dataset {
    pub xs: Vec<f64>,
    /// Transform `(xs, args) -> ys`; the identity when absent.
    pub y_func: Option<SharedCurveFn>,
    /// Parameter names handed to `y_func`, in call order; empty when absent.
    pub arg_names: Option<Vec<String>>,
    pub scaling: Option<ScalingPoints>,
}

impl Dataset {
    pub fn new(xs: impl Into<Vec<f64>>) -> Self {
        Self {
            xs: xs.into(),
            y_func: None,
            arg_names: None,
            scaling: None,
        }
    }

    /// Attach a transform and the parameters it consumes.
    pub fn with_fn<F, I, S>(self, arg_names: I, f: F) -> Self
    where
        F: CurveFn + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_y_func(std::sync::Arc::new(f)).with_arg_names(arg_names)
    }

    pub fn with_y_func(mut self, f: SharedCurveFn) -> Self {
        self.y_func = Some(f);
        self
    }

    pub fn with_arg_names<I, S>(mut self, arg_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arg_names = Some(arg_names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingPoints) -> Self {
        self.scaling = Some(scaling);
        self
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("xs", &self.xs)
            .field("y_func", &self.y_func.as_ref().map(|_| "<fn>"))
            .field("arg_names", &self.arg_names)
            .field("scaling", &self.scaling)
            .finish()
    }
}

/// Named parameter values in a fixed order.
///
/// The order is the insertion order of the trial values and defines the
/// enumeration order of the grid search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParamSetRecord")]
pub struct ParamSet {
    names: Vec<String>,
    values: Vec<f64>,
}

/// Unchecked wire form of `ParamSet`.
#[derive(Deserialize)]
struct ParamSetRecord {
    names: Vec<String>,
    values: Vec<f64>,
}

impl TryFrom<ParamSetRecord> for ParamSet {
    type Error = String;

    fn try_from(record: ParamSetRecord) -> Result<Self, Self::Error> {
        if record.names.len() != record.values.len() {
            return Err(format!(
                "parameter set has {} names but {} values",
                record.names.len(),
                record.values.len()
            ));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = record.names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(format!("parameter '{dup}' appears twice"));
        }
        Ok(Self {
            names: record.names,
            values: record.values,
        })
    }
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut out = Self::new();
        for (name, value) in pairs {
            out.insert(name, value);
        }
        out
    }

    /// Insert or overwrite a value; new names are appended.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.index_of(&name) {
            Some(i) => self.values[i] = value,
            None => {
                self.names.push(name);
                self.values.push(value);
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.values[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Same names, new values (positionally).
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.names.len());
        Self {
            names: self.names.clone(),
            values,
        }
    }
}

/// Which search drives the minimization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Iterated grid refinement over shrinking neighborhoods.
    #[default]
    Grid,
    /// Bounded quasi-Newton over the initial neighborhood box.
    Gradient,
}

impl Strategy {
    pub fn display_name(self) -> &'static str {
        match self {
            Strategy::Grid => "grid refinement",
            Strategy::Gradient => "bounded gradient",
        }
    }

    /// Precision iterations used when the config leaves them unset.
    pub fn default_prec_iters(self) -> usize {
        match self {
            Strategy::Grid => 10,
            Strategy::Gradient => 5,
        }
    }
}

/// Limits for the bounded gradient strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this.
    pub gtol: f64,
    /// L-BFGS history length.
    pub lbfgs_memory: usize,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            gtol: 1e-10,
            lbfgs_memory: 7,
        }
    }
}

/// Search options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Explicit neighborhood half-widths per parameter.
    pub deltas: BTreeMap<String, f64>,
    /// Missing deltas default to `|trial| * 10^ord_mag`.
    pub ord_mag: i32,
    /// Grid points on each side of the center; also the per-round shrink factor.
    pub delta_pieces: usize,
    /// Precision rounds; the strategy's default when unset.
    pub prec_iters: Option<usize>,
    pub strategy: Strategy,
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
    pub gradient: GradientConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            deltas: BTreeMap::new(),
            ord_mag: 1,
            delta_pieces: 10,
            prec_iters: None,
            strategy: Strategy::Grid,
            parallel: true,
            gradient: GradientConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_delta(mut self, name: impl Into<String>, delta: f64) -> Self {
        self.deltas.insert(name.into(), delta);
        self
    }

    pub fn with_ord_mag(mut self, ord_mag: i32) -> Self {
        self.ord_mag = ord_mag;
        self
    }

    pub fn with_delta_pieces(mut self, delta_pieces: usize) -> Self {
        self.delta_pieces = delta_pieces;
        self
    }

    pub fn with_prec_iters(mut self, prec_iters: usize) -> Self {
        self.prec_iters = Some(prec_iters);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn prec_iters(&self) -> usize {
        self.prec_iters
            .unwrap_or_else(|| self.strategy.default_prec_iters())
    }
}

/// Fitted curve of one dataset, in the dataset's own units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveOutput {
    pub ys: Vec<f64>,
    pub x_slope: f64,
    pub x_offset: f64,
    pub y_slope: f64,
    pub y_offset: f64,
}

/// One precision round of the grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: usize,
    pub centers: Vec<f64>,
    pub radii: Vec<f64>,
    pub best_dispersion: f64,
    pub evaluated: usize,
    pub failed: usize,
}

/// Outcome of the bounded gradient search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientReport {
    pub iterations: usize,
    pub fn_evals: usize,
    pub converged: bool,
    pub status: String,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchReport {
    Grid { rounds: Vec<RoundSummary> },
    Gradient(GradientReport),
}

/// Full result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutput {
    pub args: ParamSet,
    /// One entry per input dataset, in input order.
    pub curves: Vec<CurveOutput>,
    /// Positions (into the truncated domains) kept by the joint finite filter.
    pub finite_indices: Vec<usize>,
    pub dispersion: f64,
    pub strategy: Strategy,
    pub report: SearchReport,
}
