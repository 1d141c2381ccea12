//! Bounded gradient search.
//!
//! Minimizes the same dispersion objective as the grid search, but continuously,
//! inside the box `[lower, upper]` of every parameter. The solver is argmin's
//! L-BFGS with an Armijo backtracking line search, fed finite-difference
//! gradients from `finitediff`.
//!
//! L-BFGS is unconstrained, so the box is removed by a change of variables.
//! Free parameter `i` is
//!
//! `x_i = clamp(x0_i + r_i * sin(z_i), lower_i, upper_i)`
//!
//! with `r_i` the larger distance from `x0_i` to one of its bounds. The solver
//! starts at `z = 0`, which is exactly `x0`, and every `z` lands inside the box.
//! Pinned parameters (`lower == upper`) are left out of `z` entirely.
//!
//! Points the objective cannot evaluate cost `+inf`. The Armijo condition never
//! accepts them, so the iterate stays on viable ground.

use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{
    CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::linesearch::BacktrackingLineSearch;
use argmin::solver::linesearch::condition::ArmijoCondition;
use argmin::solver::quasinewton::LBFGS;
use finitediff::FiniteDiff;
use tracing::{debug, info};

use crate::domain::GradientConfig;
use crate::error::{CollapseError, ErrorKind};

/// Solver-side coordinates (one entry per free parameter).
type Point = Vec<f64>;
type Backtracking = BacktrackingLineSearch<Point, Point, ArmijoCondition<f64>, f64>;
type BoundedLbfgs = LBFGS<Backtracking, Point, Point, f64>;

/// Armijo sufficient-decrease constant.
const ARMIJO_C1: f64 = 1e-4;

/// Step shrink factor per backtrack.
const BACKTRACK_RHO: f64 = 0.5;

/// Outcome of the bounded minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedOutcome {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub fn_evals: usize,
    pub converged: bool,
    pub status: String,
}

/// Tolerances for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedOptions {
    pub limits: GradientConfig,
    /// Objective change between iterations that counts as converged.
    pub ftol: f64,
}

impl BoundedOptions {
    /// `ftol = 10^(-2 * prec_iters)`.
    pub fn from_prec_iters(limits: GradientConfig, prec_iters: usize) -> Self {
        let exp = i32::try_from(prec_iters.saturating_mul(2)).unwrap_or(i32::MAX);
        Self {
            limits,
            ftol: 10f64.powi(-exp),
        }
    }
}

/// Change of variables between solver coordinates and boxed parameters.
#[derive(Debug, Clone)]
struct BoxMap {
    origin: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// `(index, reach)` of every free parameter.
    free: Vec<(usize, f64)>,
}

impl BoxMap {
    fn new(x0: &[f64], lower: &[f64], upper: &[f64]) -> Self {
        let free = (0..x0.len())
            .filter(|&i| lower[i] < upper[i])
            .map(|i| (i, (upper[i] - x0[i]).max(x0[i] - lower[i])))
            .collect();
        Self {
            origin: x0.to_vec(),
            lower: lower.to_vec(),
            upper: upper.to_vec(),
            free,
        }
    }

    fn dim(&self) -> usize {
        self.free.len()
    }

    fn to_params(&self, z: &[f64]) -> Vec<f64> {
        let mut x = self.origin.clone();
        for (&(i, reach), &zi) in self.free.iter().zip(z) {
            x[i] = (self.origin[i] + reach * zi.sin()).clamp(self.lower[i], self.upper[i]);
        }
        x
    }
}

#[derive(Debug, Default)]
struct Counters {
    evals: AtomicUsize,
    failed: AtomicUsize,
}

/// The boxed objective as an argmin problem.
struct BoxedObjective<'a, F> {
    f: &'a F,
    map: &'a BoxMap,
    counters: &'a Counters,
}

impl<F> BoxedObjective<'_, F>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    fn value(&self, z: &[f64]) -> f64 {
        self.counters.evals.fetch_add(1, Ordering::Relaxed);
        match (self.f)(&self.map.to_params(z)).filter(|v| v.is_finite()) {
            Some(v) => v,
            None => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                f64::INFINITY
            }
        }
    }
}

impl<F> CostFunction for BoxedObjective<'_, F>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    type Param = Point;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.value(z))
    }
}

impl<F> Gradient for BoxedObjective<'_, F>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    type Param = Point;
    type Gradient = Point;

    /// Central differences. A component whose stencil leaves the viable region
    /// falls back to a forward difference, and to 0 if that fails as well.
    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, Error> {
        let cost = |p: &Point| self.value(p);
        let mut g = z.central_diff(&cost);
        if g.iter().any(|v| !v.is_finite()) {
            let forward = z.forward_diff(&cost);
            for (gi, fi) in g.iter_mut().zip(forward) {
                if !gi.is_finite() {
                    *gi = if fi.is_finite() { fi } else { 0.0 };
                }
            }
        }
        Ok(g)
    }
}

fn build_solver(opts: &BoundedOptions) -> Result<BoundedLbfgs, Error> {
    let linesearch = BacktrackingLineSearch::new(ArmijoCondition::new(ARMIJO_C1)?).rho(BACKTRACK_RHO)?;
    LBFGS::new(linesearch, opts.limits.lbfgs_memory.max(1))
        .with_tolerance_grad(opts.limits.gtol)?
        .with_tolerance_cost(opts.ftol)
}

/// Minimize `f` over the box `[lower, upper]` starting at `x0`.
///
/// `f` returns `None` for points it cannot evaluate.
pub fn minimize_bounded<F>(
    f: &F,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    opts: BoundedOptions,
) -> Result<BoundedOutcome, CollapseError>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let n = x0.len();
    if lower.len() != n || upper.len() != n {
        return Err(CollapseError::new(
            ErrorKind::InvalidConfig,
            format!(
                "Bounds have lengths {}/{} for {n} parameters.",
                lower.len(),
                upper.len()
            ),
        ));
    }
    if let Some(i) = (0..n).find(|&i| !(lower[i] <= x0[i] && x0[i] <= upper[i])) {
        return Err(CollapseError::new(
            ErrorKind::InvalidConfig,
            format!(
                "Start value {} of parameter {i} lies outside [{}, {}].",
                x0[i], lower[i], upper[i]
            ),
        ));
    }

    let counters = Counters::default();
    let map = BoxMap::new(x0, lower, upper);
    let problem = BoxedObjective {
        f,
        map: &map,
        counters: &counters,
    };

    let z0: Point = vec![0.0; map.dim()];
    let f0 = problem.value(&z0);
    if !f0.is_finite() {
        return Err(CollapseError::new(
            ErrorKind::EvaluationFailed,
            format!("Objective cannot be evaluated at the start point {x0:?}."),
        ));
    }

    if map.dim() == 0 {
        return Ok(BoundedOutcome {
            x: x0.to_vec(),
            value: f0,
            iterations: 0,
            fn_evals: counters.evals.load(Ordering::Relaxed),
            converged: true,
            status: String::from("no free parameters"),
        });
    }

    let solver = build_solver(&opts).map_err(|e| {
        CollapseError::new(
            ErrorKind::InvalidConfig,
            format!("Invalid gradient search settings: {e}"),
        )
    })?;
    debug!(free = map.dim(), start = f0, ftol = opts.ftol, "bounded gradient start");

    let max_iters = u64::try_from(opts.limits.max_iter).unwrap_or(u64::MAX);
    let result = Executor::new(problem, solver)
        .configure(|state| state.param(z0).max_iters(max_iters))
        .run()
        .map_err(|e| {
            CollapseError::new(
                ErrorKind::EvaluationFailed,
                format!("Bounded gradient search failed: {e}"),
            )
        })?;
    let state = result.state();

    // Never report anything worse than the start point.
    let (x, value) = match state.get_best_param() {
        Some(z) if state.get_best_cost() <= f0 => (map.to_params(z), state.get_best_cost()),
        _ => (x0.to_vec(), f0),
    };

    let failed = counters.failed.load(Ordering::Relaxed);
    let (converged, status) = if value >= f0 && failed > 0 {
        (false, String::from("no viable decrease from the start point"))
    } else {
        match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
                (true, String::from("solver converged"))
            }
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                (false, String::from("maximum iterations reached"))
            }
            other => (false, format!("{other:?}")),
        }
    };

    let iterations = usize::try_from(state.get_iter()).unwrap_or(usize::MAX);
    let fn_evals = counters.evals.load(Ordering::Relaxed);
    info!(iterations, fn_evals, failed, value, converged, "bounded gradient finished");

    Ok(BoundedOutcome {
        x,
        value,
        iterations,
        fn_evals,
        converged,
        status,
    })
}
