//! Per-parameter search setup.
//!
//! Every parameter gets one immutable record (trial value + half-width) before
//! any evaluation happens. Both strategies start from the same records.

use tracing::debug;

use crate::domain::{ParamSet, SearchConfig};
use crate::error::{CollapseError, ErrorKind};

/// Starting point and neighborhood of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamPlan {
    pub name: String,
    pub trial: f64,
    /// Initial half-width; `0` pins the parameter.
    pub delta: f64,
}

impl ParamPlan {
    pub fn lower(&self) -> f64 {
        self.trial - self.delta
    }

    pub fn upper(&self) -> f64 {
        self.trial + self.delta
    }
}

/// Build one plan per trial parameter, in trial order.
///
/// Missing deltas default to `|trial| * 10^ord_mag`.
pub fn build_plans(trial: &ParamSet, config: &SearchConfig) -> Result<Vec<ParamPlan>, CollapseError> {
    if let Some(name) = config.deltas.keys().find(|name| trial.index_of(name).is_none()) {
        return Err(CollapseError::new(
            ErrorKind::UnknownParameter,
            format!("Delta given for parameter '{name}', which has no trial value."),
        ));
    }

    let scale = 10f64.powi(config.ord_mag);
    trial
        .iter()
        .map(|(name, value)| {
            if !value.is_finite() {
                return Err(CollapseError::new(
                    ErrorKind::InvalidConfig,
                    format!("Trial value for '{name}' must be finite, got {value}."),
                ));
            }
            let delta = match config.deltas.get(name) {
                Some(&d) => d,
                None => value.abs() * scale,
            };
            if !(delta.is_finite() && delta >= 0.0) {
                return Err(CollapseError::new(
                    ErrorKind::InvalidConfig,
                    format!("Delta for '{name}' must be finite and >= 0, got {delta}."),
                ));
            }
            debug!(param = name, trial = value, delta, "parameter plan");
            Ok(ParamPlan {
                name: name.to_string(),
                trial: value,
                delta,
            })
        })
        .collect()
}
