//! Grid-refinement search.
//!
//! Each precision round:
//!
//! - builds the neighborhood around the current centers (`2P + 1` points per
//!   parameter, Cartesian product over parameters)
//! - evaluates every candidate (in parallel when enabled)
//! - moves the centers to the lowest-dispersion candidate
//! - divides every radius by `P`
//!
//! After `R` rounds the radii have shrunk by `P^R` and the last winner is the
//! result. Selection is deterministic: the minimum dispersion wins and ties go to
//! the lowest candidate index, so parallel and sequential runs agree bit for bit.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::data::NormalizedDataset;
use crate::domain::RoundSummary;
use crate::error::{CollapseError, ErrorKind};
use crate::fit::evaluator::{Evaluation, evaluate};
use crate::fit::neighborhood::Neighborhood;
use crate::fit::plan::ParamPlan;

/// Grid-search options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    /// Points per side of the center; also the shrink factor.
    pub pieces: usize,
    /// Number of precision rounds.
    pub rounds: usize,
    pub parallel: bool,
}

/// Centers and radii between rounds.
///
/// A state is never mutated: each round produces the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub centers: Vec<f64>,
    pub radii: Vec<f64>,
}

impl SearchState {
    pub fn initial(plans: &[ParamPlan]) -> Self {
        Self {
            centers: plans.iter().map(|p| p.trial).collect(),
            radii: plans.iter().map(|p| p.delta).collect(),
        }
    }

    /// Recenter on `winner` and divide every radius by `pieces`.
    pub fn refined(&self, winner: Vec<f64>, pieces: usize) -> Self {
        let factor = pieces as f64;
        Self {
            centers: winner,
            radii: self.radii.iter().map(|r| r / factor).collect(),
        }
    }
}

/// Result of a grid search.
#[derive(Debug, Clone)]
pub struct GridOutcome {
    pub args: Vec<f64>,
    pub evaluation: Evaluation,
    pub rounds: Vec<RoundSummary>,
    pub final_state: SearchState,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    args: Vec<f64>,
    evaluation: Evaluation,
}

/// Per-round bookkeeping, merged across workers.
#[derive(Debug, Clone, Default)]
struct Tally {
    best: Option<Candidate>,
    failed: usize,
    first_failure: Option<(usize, String)>,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        let best = match (self.best, other.best) {
            (Some(a), Some(b)) => Some(pick(a, b)),
            (a, b) => a.or(b),
        };
        let first_failure = match (self.first_failure, other.first_failure) {
            (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
            (a, b) => a.or(b),
        };
        Tally {
            best,
            failed: self.failed + other.failed,
            first_failure,
        }
    }
}

/// Lower dispersion wins; equal dispersion goes to the earlier candidate.
fn pick(a: Candidate, b: Candidate) -> Candidate {
    let (da, db) = (a.evaluation.dispersion, b.evaluation.dispersion);
    if db < da || (db == da && b.idx < a.idx) { b } else { a }
}

fn tally_one(nb: &Neighborhood, idx: usize, datasets: &[NormalizedDataset]) -> Tally {
    let args = nb.candidate(idx);
    match evaluate(&args, datasets) {
        Ok(evaluation) => Tally {
            best: Some(Candidate { idx, args, evaluation }),
            ..Tally::default()
        },
        Err(e) => Tally {
            best: None,
            failed: 1,
            first_failure: Some((idx, e.0)),
        },
    }
}

fn run_round(nb: &Neighborhood, datasets: &[NormalizedDataset], parallel: bool) -> Tally {
    if parallel {
        (0..nb.len())
            .into_par_iter()
            .map(|idx| tally_one(nb, idx, datasets))
            .reduce(Tally::default, Tally::merge)
    } else {
        (0..nb.len())
            .map(|idx| tally_one(nb, idx, datasets))
            .fold(Tally::default(), Tally::merge)
    }
}

/// Run the grid-refinement search from `plans`.
pub fn grid_search(
    plans: &[ParamPlan],
    datasets: &[NormalizedDataset],
    opts: GridOptions,
) -> Result<GridOutcome, CollapseError> {
    // The radius shrinks by `pieces` each round, so it must be at least 2.
    if opts.pieces < 2 {
        return Err(CollapseError::new(
            ErrorKind::InvalidConfig,
            format!("delta_pieces must be >= 2, got {}.", opts.pieces),
        ));
    }

    let mut state = SearchState::initial(plans);
    let mut rounds = Vec::with_capacity(opts.rounds);
    let mut best: Option<Candidate> = None;

    for round in 1..=opts.rounds {
        let nb = Neighborhood::new(&state.centers, &state.radii, opts.pieces)?;
        let tally = run_round(&nb, datasets, opts.parallel);

        let Some(winner) = tally.best else {
            let detail = tally
                .first_failure
                .map(|(idx, msg)| format!(" First failure (candidate {idx}): {msg}"))
                .unwrap_or_default();
            return Err(CollapseError::new(
                ErrorKind::AllCandidatesFailed,
                format!(
                    "Precision round {round}: all {} candidates failed to evaluate.{detail}",
                    nb.len()
                ),
            ));
        };
        if tally.failed > 0 {
            warn!(round, failed = tally.failed, evaluated = nb.len(), "some candidates failed");
        }
        debug!(
            round,
            candidates = nb.len(),
            dispersion = winner.evaluation.dispersion,
            args = ?winner.args,
            "precision round"
        );

        rounds.push(RoundSummary {
            round,
            centers: state.centers.clone(),
            radii: state.radii.clone(),
            best_dispersion: winner.evaluation.dispersion,
            evaluated: nb.len(),
            failed: tally.failed,
        });
        state = state.refined(winner.args.clone(), opts.pieces);
        best = Some(winner);
    }

    let (args, evaluation) = match best {
        Some(c) => (c.args, c.evaluation),
        // No rounds requested: report the trial point itself.
        None => {
            let evaluation = evaluate(&state.centers, datasets).map_err(|e| {
                CollapseError::new(
                    ErrorKind::EvaluationFailed,
                    format!("Trial parameters could not be evaluated: {e}"),
                )
            })?;
            (state.centers.clone(), evaluation)
        }
    };

    info!(
        rounds = rounds.len(),
        dispersion = evaluation.dispersion,
        "grid refinement finished"
    );

    Ok(GridOutcome {
        args,
        evaluation,
        rounds,
        final_state: state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize;
    use crate::domain::{Dataset, ParamSet};
    use crate::error::EvalError;
    use crate::models::infallible;
    use proptest::prelude::*;

    fn plan(name: &str, trial: f64, delta: f64) -> ParamPlan {
        ParamPlan {
            name: name.to_string(),
            trial,
            delta,
        }
    }

    fn opts(rounds: usize) -> GridOptions {
        GridOptions {
            pieces: 10,
            rounds,
            parallel: false,
        }
    }

    fn shifted(trial: ParamSet) -> Vec<NormalizedDataset> {
        let datasets = vec![
            Dataset::new(vec![1.0, 2.0, 3.0]),
            Dataset::new(vec![1.0, 2.0, 3.0]).with_fn(["shift"], infallible(|xs, a| xs.iter().map(|x| x + a[0]).collect())),
        ];
        normalize(&datasets, &trial).unwrap().datasets
    }

    #[test]
    fn stays_on_an_exact_collapse() {
        let ds = shifted(ParamSet::from_pairs([("shift", 0.0)]));
        let out = grid_search(&[plan("shift", 0.0, 5.0)], &ds, opts(10)).unwrap();
        assert_eq!(out.args, vec![0.0]);
        assert_eq!(out.evaluation.dispersion, 0.0);
        assert_eq!(out.evaluation.curves[0], out.evaluation.curves[1]);
    }

    #[test]
    fn finds_offset_between_curves() {
        // Dataset B = x + shift + 1.234, so shift = -1.234 collapses the curves.
        let trial = ParamSet::from_pairs([("shift", 0.0)]);
        let datasets = vec![
            Dataset::new(vec![1.0, 2.0, 3.0]),
            Dataset::new(vec![1.0, 2.0, 3.0]).with_fn(["shift"], infallible(|xs, a| xs.iter().map(|x| x + a[0] + 1.234).collect())),
        ];
        let ds = normalize(&datasets, &trial).unwrap().datasets;
        let out = grid_search(&[plan("shift", 0.0, 5.0)], &ds, opts(6)).unwrap();
        assert!((out.args[0] + 1.234).abs() < 1e-6, "shift = {}", out.args[0]);
    }

    #[test]
    fn radii_shrink_by_pieces_each_round() {
        let ds = shifted(ParamSet::from_pairs([("shift", 0.0)]));
        let out = grid_search(&[plan("shift", 0.0, 8.0)], &ds, opts(4)).unwrap();
        let radii: Vec<f64> = out.rounds.iter().map(|r| r.radii[0]).collect();
        assert_eq!(radii, vec![8.0, 8.0 / 10.0, 8.0 / 10.0 / 10.0, 8.0 / 10.0 / 10.0 / 10.0]);
        assert_eq!(out.final_state.radii[0], radii[3] / 10.0);
    }

    #[test]
    fn zero_delta_parameter_stays_pinned() {
        let trial = ParamSet::from_pairs([("shift", 0.0), ("pinned", 3.0)]);
        let datasets = vec![
            Dataset::new(vec![1.0, 2.0, 3.0]),
            Dataset::new(vec![1.0, 2.0, 3.0]).with_fn(
                ["shift", "pinned"],
                infallible(|xs, a| xs.iter().map(|x| x + a[0] + a[1]).collect()),
            ),
        ];
        let ds = normalize(&datasets, &trial).unwrap().datasets;
        let out = grid_search(&[plan("shift", 0.0, 5.0), plan("pinned", 3.0, 0.0)], &ds, opts(5)).unwrap();
        assert_eq!(out.args[1], 3.0);
        assert!((out.args[0] + 3.0).abs() < 1e-9);
        assert!(out.rounds.iter().all(|r| r.radii[1] == 0.0 && r.centers[1] == 3.0));
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        // Nothing depends on `free`, so every candidate ties; index 0 is `center - radius`.
        let trial = ParamSet::from_pairs([("free", 1.0)]);
        let ds = normalize(&[Dataset::new(vec![1.0, 2.0]), Dataset::new(vec![1.0, 2.0])], &trial)
            .unwrap()
            .datasets;
        let out = grid_search(&[plan("free", 1.0, 1.0)], &ds, opts(1)).unwrap();
        assert_eq!(out.args, vec![0.0]);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let trial = ParamSet::from_pairs([("a", 1.0), ("b", 1.0)]);
        let datasets = vec![
            Dataset::new(vec![1.0, 2.0, 3.0, 4.0]).with_fn(["a"], infallible(|xs, a| xs.iter().map(|x| a[0] * x * x).collect())),
            Dataset::new(vec![1.0, 2.0, 3.0, 4.0]).with_fn(["b"], infallible(|xs, b| xs.iter().map(|x| 2.0 * x * x + b[0]).collect())),
        ];
        let ds = normalize(&datasets, &trial).unwrap().datasets;
        let plans = [plan("a", 1.0, 3.0), plan("b", 1.0, 3.0)];
        let seq = grid_search(&plans, &ds, GridOptions { pieces: 5, rounds: 4, parallel: false }).unwrap();
        let par = grid_search(&plans, &ds, GridOptions { pieces: 5, rounds: 4, parallel: true }).unwrap();
        assert_eq!(seq.args, par.args);
        assert_eq!(seq.evaluation, par.evaluation);
        assert_eq!(seq.rounds, par.rounds);
    }

    #[test]
    fn failed_candidates_are_skipped() {
        let trial = ParamSet::from_pairs([("p", 0.0)]);
        let datasets = vec![
            Dataset::new(vec![1.0, 2.0]),
            Dataset::new(vec![1.0, 2.0]).with_fn(["p"], |xs: &[f64], a: &[f64]| -> Result<Vec<f64>, EvalError> {
                if a[0] < 0.0 {
                    Err(EvalError::new("p must be >= 0"))
                } else {
                    Ok(xs.iter().map(|x| x + a[0]).collect())
                }
            }),
        ];
        let ds = normalize(&datasets, &trial).unwrap().datasets;
        let out = grid_search(&[plan("p", 0.0, 1.0)], &ds, opts(2)).unwrap();
        assert_eq!(out.args, vec![0.0]);
        assert_eq!(out.rounds[0].failed, 10);
        assert_eq!(out.rounds[0].evaluated, 21);
    }

    #[test]
    fn all_failures_abort_the_search() {
        let trial = ParamSet::from_pairs([("p", 0.0)]);
        let datasets = vec![
            Dataset::new(vec![1.0]),
            Dataset::new(vec![1.0]).with_fn(["p"], |_: &[f64], _: &[f64]| -> Result<Vec<f64>, EvalError> {
                Err(EvalError::new("always"))
            }),
        ];
        let ds = normalize(&datasets, &trial).unwrap().datasets;
        let err = grid_search(&[plan("p", 0.0, 1.0)], &ds, opts(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AllCandidatesFailed);
        assert!(err.message().contains("round 1"));
        assert!(err.message().contains("always"));
    }

    #[test]
    fn single_piece_is_rejected_before_evaluating() {
        let ds = shifted(ParamSet::from_pairs([("shift", 0.0)]));
        for pieces in [0, 1] {
            let err = grid_search(
                &[plan("shift", 0.0, 1.0)],
                &ds,
                GridOptions { pieces, rounds: 4, parallel: false },
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        }
    }

    #[test]
    fn zero_rounds_reports_the_trial_point() {
        let ds = shifted(ParamSet::from_pairs([("shift", 2.0)]));
        let out = grid_search(&[plan("shift", 2.0, 5.0)], &ds, opts(0)).unwrap();
        assert_eq!(out.args, vec![2.0]);
        assert_eq!(out.evaluation.dispersion, 3.0);
        assert!(out.rounds.is_empty());
    }

    proptest! {
        #[test]
        fn refinement_divides_every_radius_exactly(
            radii in prop::collection::vec(0.0f64..1e6, 1..5),
            pieces in 2usize..50,
        ) {
            let state = SearchState { centers: vec![0.0; radii.len()], radii: radii.clone() };
            let next = state.refined(vec![1.0; radii.len()], pieces);
            for (r, n) in radii.iter().zip(&next.radii) {
                prop_assert_eq!(*n, r / pieces as f64);
                prop_assert!(*n < *r || *r == 0.0);
            }
            prop_assert_eq!(next.centers, vec![1.0; radii.len()]);
        }
    }
}
