//! Synthetic embedding fixtures
//!
//! Every generator is seeded, so the same arguments always produce the same
//! matrix.

use proteus_core::{EmbeddingMatrix, ReadId, RunRng};

/// Shape of a Gaussian-blob fixture
#[derive(Debug, Clone, Copy)]
pub struct BlobSpec {
    pub blobs: usize,
    pub per_blob: usize,
    pub dim: usize,
    /// Distance between neighboring blob centers along each axis
    pub separation: f32,
    pub noise_std: f32,
    pub seed: u64,
}

impl Default for BlobSpec {
    fn default() -> Self {
        Self {
            blobs: 2,
            per_blob: 250,
            dim: 128,
            separation: 4.0,
            noise_std: 0.5,
            seed: 42,
        }
    }
}

impl BlobSpec {
    pub fn rows(&self) -> usize {
        self.blobs * self.per_blob
    }
}

/// Rows grouped by blob: blob `b` is centered on `b * separation` in every
/// coordinate, with isotropic Gaussian noise
pub fn gaussian_blobs(spec: &BlobSpec) -> EmbeddingMatrix {
    let mut rng = RunRng::seeded(spec.seed);
    let mut data = rng.normal(spec.rows() * spec.dim, spec.noise_std);
    for (i, value) in data.iter_mut().enumerate() {
        let blob = i / spec.dim / spec.per_blob;
        *value += blob as f32 * spec.separation;
    }
    EmbeddingMatrix::new(spec.rows(), spec.dim, data).expect("blob fixture has a consistent shape")
}

/// `rows` copies of the same vector
pub fn identical_rows(rows: usize, dim: usize, value: f32) -> EmbeddingMatrix {
    EmbeddingMatrix::new(rows, dim, vec![value; rows * dim]).expect("fixture has a consistent shape")
}

/// `read_0 .. read_{n-1}`
pub fn read_ids(n: usize) -> Vec<ReadId> {
    (0..n).map(|i| ReadId::new(format!("read_{}", i))).collect()
}
