use super::{all_finite, ProjectionFailure, ProjectionStrategy, ProjectionTier};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use proteus_core::RunRng;

/// Principal component projection
pub struct LinearProjection {
    components: usize,
}

impl LinearProjection {
    pub fn new(components: usize) -> Self {
        Self { components }
    }
}

impl ProjectionStrategy for LinearProjection {
    fn tier(&self) -> ProjectionTier {
        ProjectionTier::Linear
    }

    fn attempt(&self, data: &DMatrix<f64>, _rng: &mut RunRng) -> Result<DMatrix<f64>, ProjectionFailure> {
        let fit = PrincipalComponents::fit(data, self.components.min(data.ncols()))?;
        let projected = fit.transform(data);
        if !all_finite(&projected) {
            return Err(ProjectionFailure::new("projection contains non-finite values"));
        }
        Ok(projected)
    }
}

/// Fitted principal axes of a data matrix
pub struct PrincipalComponents {
    mean: DVector<f64>,
    /// One component per column, strongest first
    axes: DMatrix<f64>,
    explained_ratio: Vec<f64>,
}

impl PrincipalComponents {
    /// Fit the first `k` axes via the eigendecomposition of the sample covariance.
    ///
    /// Fails when the explained-variance ratio is undefined, i.e. the data has
    /// no variance at all.
    pub fn fit(data: &DMatrix<f64>, k: usize) -> Result<Self, ProjectionFailure> {
        let (n, d) = data.shape();
        if n == 0 || d == 0 || k == 0 {
            return Err(ProjectionFailure::new("empty input"));
        }
        if !all_finite(data) {
            return Err(ProjectionFailure::new("input contains non-finite values"));
        }

        let mean = data.row_mean().transpose();
        let centered = center(data, &mean);
        let covariance = centered.transpose() * &centered / ((n.max(2) - 1) as f64);

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let total: f64 = eigen.eigenvalues.iter().sum();
        let explained_ratio: Vec<f64> = order.iter().take(k).map(|&i| eigen.eigenvalues[i] / total).collect();
        if explained_ratio.iter().any(|r| r.is_nan()) {
            return Err(ProjectionFailure::new(
                "explained variance ratio is undefined (input has zero variance)",
            ));
        }

        let mut axes = DMatrix::zeros(d, k);
        for (c, &i) in order.iter().take(k).enumerate() {
            let mut axis = eigen.eigenvectors.column(i).into_owned();
            // Deterministic sign: largest-magnitude loading is positive
            let pivot = axis.iter().copied().fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                axis.neg_mut();
            }
            axes.set_column(c, &axis);
        }

        Ok(Self {
            mean,
            axes,
            explained_ratio,
        })
    }

    pub fn transform(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        center(data, &self.mean) * &self.axes
    }

    pub fn explained_ratio(&self) -> &[f64] {
        &self.explained_ratio
    }
}

fn center(data: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let mut centered = data.clone();
    for (j, m) in mean.iter().enumerate() {
        centered.column_mut(j).add_scalar_mut(-m);
    }
    centered
}
