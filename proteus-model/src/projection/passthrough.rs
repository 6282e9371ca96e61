use super::{ProjectionFailure, ProjectionStrategy, ProjectionTier};
use nalgebra::DMatrix;
use proteus_core::RunRng;

/// Last resort: cluster on the standardized latent matrix as-is
pub struct Passthrough;

impl ProjectionStrategy for Passthrough {
    fn tier(&self) -> ProjectionTier {
        ProjectionTier::Passthrough
    }

    fn attempt(&self, data: &DMatrix<f64>, _rng: &mut RunRng) -> Result<DMatrix<f64>, ProjectionFailure> {
        Ok(data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_input_unchanged() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 0.0, -3.0]);
        let out = Passthrough.attempt(&data, &mut RunRng::seeded(0)).unwrap();
        assert_eq!(out.shape(), (2, 2));
        assert_eq!(out[(1, 1)], -3.0);
        assert!(out[(0, 1)].is_nan());
    }
}
