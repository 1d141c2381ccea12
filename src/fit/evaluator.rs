//! Candidate evaluation.
//!
//! A candidate is a full vector of parameter values (ordered like the search's
//! `ParamSet`). Evaluating it calls every dataset's transform with the subset of
//! values that dataset asked for, checks the outputs line up, and reduces them to
//! one dispersion number.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::data::NormalizedDataset;
use crate::error::EvalError;
use crate::math::dispersion;

/// Outputs and objective value of one viable candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub curves: Vec<Vec<f64>>,
    pub dispersion: f64,
}

/// Evaluate every dataset's transform at `args`.
///
/// Fails if a transform fails or panics, returns the wrong number of values, or
/// returns a non-finite value.
pub fn evaluate_curves(args: &[f64], datasets: &[NormalizedDataset]) -> Result<Vec<Vec<f64>>, EvalError> {
    let mut call_args = Vec::new();
    datasets
        .iter()
        .enumerate()
        .map(|(k, ds)| {
            call_args.clear();
            call_args.extend(ds.arg_indices.iter().map(|&i| args[i]));
            let ys = catch_unwind(AssertUnwindSafe(|| ds.y_func.eval(&ds.xs, &call_args))).map_err(|payload| {
                EvalError::new(format!("dataset {k}: transform panicked: {}", panic_message(&*payload)))
            })??;
            if ys.len() != ds.xs.len() {
                return Err(EvalError::new(format!(
                    "dataset {k}: transform returned {} values for {} domain points",
                    ys.len(),
                    ds.xs.len()
                )));
            }
            if let Some(i) = ys.iter().position(|y| !y.is_finite()) {
                return Err(EvalError::new(format!(
                    "dataset {k}: non-finite output {} at position {i}",
                    ys[i]
                )));
            }
            Ok(ys)
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

/// Evaluate `args` and score the result.
pub fn evaluate(args: &[f64], datasets: &[NormalizedDataset]) -> Result<Evaluation, EvalError> {
    let curves = evaluate_curves(args, datasets)?;
    let d = dispersion(&curves).map_err(|e| EvalError::new(e.message()))?;
    if !d.is_finite() {
        return Err(EvalError::new(format!("non-finite dispersion {d}")));
    }
    Ok(Evaluation { curves, dispersion: d })
}

/// Objective-only view used by the gradient strategy (`None` = not viable).
pub fn objective(args: &[f64], datasets: &[NormalizedDataset]) -> Option<f64> {
    evaluate(args, datasets).ok().map(|e| e.dispersion)
}
