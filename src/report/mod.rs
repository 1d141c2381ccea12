//! Result assembly: fitted curves back in each dataset's own units.
//!
//! The search works on scaled domains. Each winning curve is packaged with the
//! domain map that was applied to its dataset and, when the dataset carries
//! scaling reference points, mapped back through the output transform (the y
//! reference points with home and away swapped).

use crate::data::NormalizedDataset;
use crate::domain::CurveOutput;
use crate::error::{CollapseError, ErrorKind};
use crate::math::{AffineMap, scale};

/// Package one curve per dataset, in dataset order.
pub fn assemble_curves(
    datasets: &[NormalizedDataset],
    curves: Vec<Vec<f64>>,
) -> Result<Vec<CurveOutput>, CollapseError> {
    if datasets.len() != curves.len() {
        return Err(CollapseError::new(
            ErrorKind::EvaluationFailed,
            format!("Got {} curves for {} datasets.", curves.len(), datasets.len()),
        ));
    }

    datasets
        .iter()
        .zip(curves)
        .map(|(ds, ys)| {
            let (ys, y_map) = match &ds.scaling {
                Some(points) => {
                    let (home, away) = points.range_pairs();
                    let out = scale(&ys, home, away)?;
                    (out.values, out.map)
                }
                None => (ys, AffineMap::IDENTITY),
            };
            Ok(CurveOutput {
                ys,
                x_slope: ds.x_map.slope,
                x_offset: ds.x_map.offset,
                y_slope: y_map.slope,
                y_offset: y_map.offset,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize;
    use crate::domain::{Dataset, ParamSet, RefPoints, ScalingPoints};

    #[test]
    fn unscaled_datasets_get_identity_maps() {
        let n = normalize(&[Dataset::new(vec![1.0, 2.0])], &ParamSet::new()).unwrap();
        let out = assemble_curves(&n.datasets, vec![vec![1.0, 2.0]]).unwrap();
        assert_eq!(
            out[0],
            CurveOutput {
                ys: vec![1.0, 2.0],
                x_slope: 1.0,
                x_offset: 0.0,
                y_slope: 1.0,
                y_offset: 0.0,
            }
        );
    }

    #[test]
    fn scaled_outputs_use_swapped_y_points() {
        // Domain: home x (0, 1) -> away x (0, 2), slope 2.
        // Output: away y (0, 10) -> home y (5, 6), slope 0.1, offset 5.
        let scaling = ScalingPoints::new(RefPoints::new(0.0, 5.0, 1.0, 6.0), RefPoints::new(0.0, 0.0, 2.0, 10.0));
        let n = normalize(&[Dataset::new(vec![0.5, 1.0]).with_scaling(scaling)], &ParamSet::new()).unwrap();
        assert_eq!(n.datasets[0].xs, vec![1.0, 2.0]);

        let out = assemble_curves(&n.datasets, vec![vec![0.0, 10.0]]).unwrap();
        let c = &out[0];
        assert_eq!((c.x_slope, c.x_offset), (2.0, 0.0));
        assert!((c.y_slope - 0.1).abs() < 1e-15);
        assert_eq!(c.y_offset, 5.0);
        assert_eq!(c.ys[0], 5.0);
        assert!((c.ys[1] - 6.0).abs() < 1e-12);
    }
}
