//! Evaluation functions attached to datasets.
//!
//! The search treats these as opaque callables: it hands over a domain slice and
//! the parameter values the dataset asked for (in the order it asked for them)
//! and gets back one dependent value per domain point.

use std::sync::Arc;

use crate::error::EvalError;

/// A curve transform `(xs, args) -> ys`.
///
/// Implementations must be `Send + Sync` because candidates of one precision
/// round may be evaluated on several threads at once.
///
/// Report a non-viable candidate with `Err`. A panic is caught by the evaluator
/// and counted the same way.
pub trait CurveFn: Send + Sync {
    fn eval(&self, xs: &[f64], args: &[f64]) -> Result<Vec<f64>, EvalError>;
}

/// Closures that can fail plug in directly.
impl<F> CurveFn for F
where
    F: Fn(&[f64], &[f64]) -> Result<Vec<f64>, EvalError> + Send + Sync,
{
    fn eval(&self, xs: &[f64], args: &[f64]) -> Result<Vec<f64>, EvalError> {
        self(xs, args)
    }
}

/// Adapter for closures that always succeed.
pub struct Infallible<F>(pub F);

/// Wrap a closure that cannot fail.
pub fn infallible<F>(f: F) -> Infallible<F>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync,
{
    Infallible(f)
}

impl<F> CurveFn for Infallible<F>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync,
{
    fn eval(&self, xs: &[f64], args: &[f64]) -> Result<Vec<f64>, EvalError> {
        Ok((self.0)(xs, args))
    }
}

/// Default transform for datasets without one: the output is the domain itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl CurveFn for Identity {
    fn eval(&self, xs: &[f64], _args: &[f64]) -> Result<Vec<f64>, EvalError> {
        Ok(xs.to_vec())
    }
}

/// Shared handle used by datasets.
pub type SharedCurveFn = Arc<dyn CurveFn>;

pub fn identity() -> SharedCurveFn {
    Arc::new(Identity)
}
