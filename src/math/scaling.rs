//! Affine maps between two coordinate systems.
//!
//! A map is pinned by two reference coordinates on the "home" side and the two
//! coordinates they correspond to on the "away" side:
//!
//! ```text
//! slope  = (away.x1 - away.x2) / (home.x1 - home.x2)
//! offset = away.x1 - slope * home.x1
//! ```
//!
//! Swapping home and away yields the inverse map, which is how fitted outputs are
//! returned to physical units.

use serde::{Deserialize, Serialize};

use crate::error::{CollapseError, ErrorKind};

/// Two reference coordinates on one axis of one coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPair {
    pub x1: f64,
    pub x2: f64,
}

impl PointPair {
    pub fn new(x1: f64, x2: f64) -> Self {
        Self { x1, x2 }
    }
}

/// `v -> slope * v + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineMap {
    pub slope: f64,
    pub offset: f64,
}

impl Default for AffineMap {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineMap {
    pub const IDENTITY: AffineMap = AffineMap {
        slope: 1.0,
        offset: 0.0,
    };

    /// Build the map sending `home.x1 -> away.x1` and `home.x2 -> away.x2`.
    pub fn from_points(home: PointPair, away: PointPair) -> Result<Self, CollapseError> {
        let span = home.x1 - home.x2;
        if span == 0.0 || !span.is_finite() {
            return Err(CollapseError::new(
                ErrorKind::DegenerateScaling,
                format!(
                    "Degenerate scaling reference points: home x1={}, x2={} (must be finite and distinct).",
                    home.x1, home.x2
                ),
            ));
        }
        let slope = (away.x1 - away.x2) / span;
        let offset = away.x1 - slope * home.x1;
        if !(slope.is_finite() && offset.is_finite()) {
            return Err(CollapseError::new(
                ErrorKind::DegenerateScaling,
                format!(
                    "Scaling reference points give a non-finite map: slope={slope}, offset={offset}."
                ),
            ));
        }
        Ok(Self { slope, offset })
    }

    pub fn apply(&self, value: f64) -> f64 {
        self.slope * value + self.offset
    }

    pub fn apply_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.apply(v)).collect()
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Values mapped into the away system together with the map that did it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaled {
    pub values: Vec<f64>,
    pub map: AffineMap,
}

/// Map `values` from the home system into the away system.
pub fn scale(values: &[f64], home: PointPair, away: PointPair) -> Result<Scaled, CollapseError> {
    let map = AffineMap::from_points(home, away)?;
    Ok(Scaled {
        values: map.apply_all(values),
        map,
    })
}
