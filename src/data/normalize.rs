//! Dataset normalization.
//!
//! Before any candidate is evaluated, datasets are brought onto a common footing:
//!
//! 1. missing transforms become the identity, missing parameter lists become empty
//! 2. parameter names are resolved to positions in the trial parameter set
//! 3. every domain is truncated to the shortest one (keeping the leading values)
//! 4. domains with scaling reference points are mapped into the search domain
//! 5. positions that are non-finite in *any* dataset are dropped from *all* of them
//!
//! The finite filter is joint so that every dataset keeps exactly the same
//! positions and the dispersion metric compares like with like.

use tracing::debug;

use crate::domain::{Dataset, ParamSet, ScalingPoints};
use crate::error::{CollapseError, ErrorKind};
use crate::math::{AffineMap, scale};
use crate::models::{SharedCurveFn, identity};

/// A dataset ready for repeated evaluation.
#[derive(Clone)]
pub struct NormalizedDataset {
    /// Scaled, truncated and filtered domain.
    pub xs: Vec<f64>,
    pub y_func: SharedCurveFn,
    /// Positions of the consumed parameters inside the search's `ParamSet`.
    pub arg_indices: Vec<usize>,
    /// Map applied to the domain (identity when no scaling was requested).
    pub x_map: AffineMap,
    pub scaling: Option<ScalingPoints>,
}

impl std::fmt::Debug for NormalizedDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedDataset")
            .field("xs", &self.xs)
            .field("arg_indices", &self.arg_indices)
            .field("x_map", &self.x_map)
            .field("scaling", &self.scaling)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub datasets: Vec<NormalizedDataset>,
    /// Positions into the truncated domains that survived the finite filter.
    pub finite_indices: Vec<usize>,
    pub truncated_len: usize,
}

impl Normalized {
    /// Number of domain positions shared by all datasets.
    pub fn len(&self) -> usize {
        self.finite_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finite_indices.is_empty()
    }
}

/// Normalize `datasets` against the parameter names in `params`.
pub fn normalize(datasets: &[Dataset], params: &ParamSet) -> Result<Normalized, CollapseError> {
    if datasets.is_empty() {
        return Err(CollapseError::new(ErrorKind::InvalidConfig, "No datasets to collapse."));
    }

    // Resolve parameter references up front so a typo fails before any evaluation.
    let arg_indices: Vec<Vec<usize>> = datasets
        .iter()
        .enumerate()
        .map(|(k, ds)| resolve_arg_indices(k, ds, params))
        .collect::<Result<_, _>>()?;

    let truncated_len = datasets.iter().map(|ds| ds.xs.len()).min().unwrap_or(0);

    let mut scaled: Vec<(Vec<f64>, AffineMap)> = Vec::with_capacity(datasets.len());
    for ds in datasets {
        let xs = &ds.xs[..truncated_len];
        match &ds.scaling {
            Some(points) => {
                let (home, away) = points.domain_pairs();
                let out = scale(xs, home, away)?;
                // The output map is only applied after the search; reject it now.
                let (home, away) = points.range_pairs();
                AffineMap::from_points(home, away)?;
                scaled.push((out.values, out.map));
            }
            None => scaled.push((xs.to_vec(), AffineMap::IDENTITY)),
        }
    }

    let finite_indices = joint_finite_indices(scaled.iter().map(|(xs, _)| xs.as_slice()), truncated_len);
    if finite_indices.is_empty() {
        return Err(CollapseError::new(
            ErrorKind::EmptyDomain,
            format!(
                "No domain positions left to compare (truncated length {truncated_len}, none finite across all {} datasets).",
                datasets.len()
            ),
        ));
    }

    let normalized: Vec<NormalizedDataset> = datasets
        .iter()
        .zip(scaled)
        .zip(arg_indices)
        .map(|((ds, (xs, x_map)), arg_indices)| NormalizedDataset {
            xs: finite_indices.iter().map(|&i| xs[i]).collect(),
            y_func: ds.y_func.clone().unwrap_or_else(identity),
            arg_indices,
            x_map,
            scaling: ds.scaling,
        })
        .collect();

    debug!(
        datasets = normalized.len(),
        truncated_len,
        kept = finite_indices.len(),
        "normalized datasets"
    );

    Ok(Normalized {
        datasets: normalized,
        finite_indices,
        truncated_len,
    })
}

fn resolve_arg_indices(k: usize, ds: &Dataset, params: &ParamSet) -> Result<Vec<usize>, CollapseError> {
    let Some(names) = &ds.arg_names else {
        return Ok(Vec::new());
    };
    names
        .iter()
        .map(|name| {
            params.index_of(name).ok_or_else(|| {
                CollapseError::new(
                    ErrorKind::UnknownParameter,
                    format!("Dataset {k} uses parameter '{name}', which has no trial value."),
                )
            })
        })
        .collect()
}

/// Indices `i < len` where every domain is finite.
fn joint_finite_indices<'a>(domains: impl Iterator<Item = &'a [f64]>, len: usize) -> Vec<usize> {
    let mut keep = vec![true; len];
    for xs in domains {
        for (flag, x) in keep.iter_mut().zip(xs) {
            *flag &= x.is_finite();
        }
    }
    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| if k { Some(i) } else { None })
        .collect()
}
