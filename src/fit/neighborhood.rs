//! Neighborhood generation for the grid-refinement search.
//!
//! Each parameter contributes an axis of `2P + 1` evenly spaced values spanning
//! `[center - radius, center + radius]`. The neighborhood is the Cartesian product
//! of all axes, addressed by a single index so it can be walked lazily (or split
//! across threads) without materializing every candidate.

use crate::error::{CollapseError, ErrorKind};

/// `2 * pieces + 1` values from `center - radius` to `center + radius` inclusive.
///
/// The step is exactly `radius / pieces` and the middle value is exactly
/// `center`. A zero radius collapses the axis to `[center]`, since every point
/// would coincide anyway.
pub fn lin_space(center: f64, radius: f64, pieces: usize) -> Result<Vec<f64>, CollapseError> {
    if pieces == 0 {
        return Err(CollapseError::new(ErrorKind::InvalidConfig, "delta_pieces must be >= 1."));
    }
    if !(center.is_finite() && radius.is_finite() && radius >= 0.0) {
        return Err(CollapseError::new(
            ErrorKind::InvalidConfig,
            format!("Invalid neighborhood: center={center}, radius={radius}."),
        ));
    }
    if radius == 0.0 {
        return Ok(vec![center]);
    }

    let step = radius / pieces as f64;
    let p = pieces as i64;
    Ok((-p..=p).map(|k| center + k as f64 * step).collect())
}

/// Cartesian product of per-parameter axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    axes: Vec<Vec<f64>>,
    len: usize,
}

impl Neighborhood {
    pub fn new(centers: &[f64], radii: &[f64], pieces: usize) -> Result<Self, CollapseError> {
        debug_assert_eq!(centers.len(), radii.len());
        let axes: Vec<Vec<f64>> = centers
            .iter()
            .zip(radii)
            .map(|(&c, &r)| lin_space(c, r, pieces))
            .collect::<Result<_, _>>()?;
        Self::from_axes(axes)
    }

    pub fn from_axes(axes: Vec<Vec<f64>>) -> Result<Self, CollapseError> {
        let mut len: usize = 1;
        for axis in &axes {
            len = len.checked_mul(axis.len()).ok_or_else(|| {
                CollapseError::new(
                    ErrorKind::InvalidConfig,
                    "Neighborhood too large: candidate count overflows (reduce delta_pieces or parameters).",
                )
            })?;
        }
        Ok(Self { axes, len })
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn axes(&self) -> &[Vec<f64>] {
        &self.axes
    }

    /// Write candidate `idx` into `out`; the first axis varies fastest.
    pub fn fill_candidate(&self, mut idx: usize, out: &mut Vec<f64>) {
        debug_assert!(idx < self.len);
        out.clear();
        for axis in &self.axes {
            out.push(axis[idx % axis.len()]);
            idx /= axis.len();
        }
    }

    pub fn candidate(&self, idx: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.axes.len());
        self.fill_candidate(idx, &mut out);
        out
    }

    /// All candidates in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Vec<f64>> + '_ {
        (0..self.len).map(move |i| self.candidate(i))
    }
}
