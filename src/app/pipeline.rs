//! The `optimize_arguments` entry point.

use tracing::info;

use crate::data::normalize;
use crate::domain::{Dataset, FitOutput, ParamSet, SearchConfig};
use crate::error::CollapseError;
use crate::fit::{build_plans, searcher};
use crate::report::assemble_curves;

/// Find parameter values that make the datasets' curves collapse onto each other.
///
/// `trial` fixes the set (and order) of parameters; datasets may reference any
/// subset of them by name. All configuration problems are reported before the
/// first evaluation.
pub fn optimize_arguments(
    datasets: &[Dataset],
    trial: &ParamSet,
    config: &SearchConfig,
) -> Result<FitOutput, CollapseError> {
    let plans = build_plans(trial, config)?;
    let normalized = normalize(datasets, trial)?;

    let engine = searcher(config.strategy);
    let outcome = engine.search(&plans, &normalized.datasets, config)?;

    let curves = assemble_curves(&normalized.datasets, outcome.evaluation.curves)?;
    let args = trial.with_values(outcome.args);

    info!(
        strategy = config.strategy.display_name(),
        dispersion = outcome.evaluation.dispersion,
        positions = normalized.len(),
        "optimize_arguments finished"
    );

    Ok(FitOutput {
        args,
        curves,
        finite_indices: normalized.finite_indices,
        dispersion: outcome.evaluation.dispersion,
        strategy: engine.strategy(),
        report: outcome.report,
    })
}
