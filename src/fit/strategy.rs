//! The two search strategies behind one interface.
//!
//! Both take the same parameter plans and normalized datasets and return the
//! winning parameter vector with its curves, so the result assembly downstream
//! does not care which one ran.

use crate::data::NormalizedDataset;
use crate::domain::{GradientReport, SearchConfig, SearchReport, Strategy};
use crate::error::{CollapseError, ErrorKind};
use crate::fit::evaluator::{Evaluation, evaluate, objective};
use crate::fit::gradient::{BoundedOptions, minimize_bounded};
use crate::fit::grid::{GridOptions, grid_search};
use crate::fit::plan::ParamPlan;

/// Winner of a search, in `ParamSet` order.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub args: Vec<f64>,
    pub evaluation: Evaluation,
    pub report: SearchReport,
}

pub trait Searcher: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn search(
        &self,
        plans: &[ParamPlan],
        datasets: &[NormalizedDataset],
        config: &SearchConfig,
    ) -> Result<SearchOutcome, CollapseError>;
}

/// Iterated grid refinement.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridRefinement;

impl Searcher for GridRefinement {
    fn strategy(&self) -> Strategy {
        Strategy::Grid
    }

    fn search(
        &self,
        plans: &[ParamPlan],
        datasets: &[NormalizedDataset],
        config: &SearchConfig,
    ) -> Result<SearchOutcome, CollapseError> {
        let opts = GridOptions {
            pieces: config.delta_pieces,
            rounds: config.prec_iters(),
            parallel: config.parallel,
        };
        let out = grid_search(plans, datasets, opts)?;
        Ok(SearchOutcome {
            args: out.args,
            evaluation: out.evaluation,
            report: SearchReport::Grid { rounds: out.rounds },
        })
    }
}

/// Bounded quasi-Newton over the initial neighborhood box.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedGradient;

impl Searcher for BoundedGradient {
    fn strategy(&self) -> Strategy {
        Strategy::Gradient
    }

    fn search(
        &self,
        plans: &[ParamPlan],
        datasets: &[NormalizedDataset],
        config: &SearchConfig,
    ) -> Result<SearchOutcome, CollapseError> {
        let x0: Vec<f64> = plans.iter().map(|p| p.trial).collect();
        let lower: Vec<f64> = plans.iter().map(ParamPlan::lower).collect();
        let upper: Vec<f64> = plans.iter().map(ParamPlan::upper).collect();
        let opts = BoundedOptions::from_prec_iters(config.gradient, config.prec_iters());

        let f = |x: &[f64]| objective(x, datasets);
        let out = minimize_bounded(&f, &x0, &lower, &upper, opts)?;

        let evaluation = evaluate(&out.x, datasets).map_err(|e| {
            CollapseError::new(
                ErrorKind::EvaluationFailed,
                format!("Best parameters could not be re-evaluated: {e}"),
            )
        })?;

        Ok(SearchOutcome {
            args: out.x,
            evaluation,
            report: SearchReport::Gradient(GradientReport {
                iterations: out.iterations,
                fn_evals: out.fn_evals,
                converged: out.converged,
                status: out.status,
                lower,
                upper,
            }),
        })
    }
}

/// The searcher implementing `strategy`.
pub fn searcher(strategy: Strategy) -> &'static dyn Searcher {
    match strategy {
        Strategy::Grid => &GridRefinement,
        Strategy::Gradient => &BoundedGradient,
    }
}
