//! Dispersion metric: how far apart a set of aligned curves are.
//!
//! For every domain position we take the population standard deviation of the
//! curves' values at that position, then sum over positions:
//!
//! ```text
//! D = Σ_i sqrt( (1/m) Σ_k (y_k[i] - ȳ[i])^2 )
//! ```
//!
//! Lower is better; `D = 0` means all curves coincide.

use crate::error::{CollapseError, ErrorKind};

/// Sum of per-position standard deviations across `curves`.
///
/// All curves must have the same, non-zero length.
pub fn dispersion(curves: &[Vec<f64>]) -> Result<f64, CollapseError> {
    let Some(first) = curves.first() else {
        return Err(CollapseError::new(ErrorKind::EmptyDomain, "No curves to compare."));
    };
    let n = first.len();
    if n == 0 {
        return Err(CollapseError::new(
            ErrorKind::EmptyDomain,
            "Curves have no domain positions to compare.",
        ));
    }
    if let Some((k, c)) = curves.iter().enumerate().find(|(_, c)| c.len() != n) {
        return Err(CollapseError::new(
            ErrorKind::InvalidConfig,
            format!("Curve {k} has length {} but curve 0 has length {n}.", c.len()),
        ));
    }

    let m = curves.len() as f64;
    let mut total = 0.0;
    for i in 0..n {
        let mean = curves.iter().map(|c| c[i]).sum::<f64>() / m;
        let var = curves
            .iter()
            .map(|c| {
                let d = c[i] - mean;
                d * d
            })
            .sum::<f64>()
            / m;
        total += var.sqrt();
    }
    Ok(total)
}
