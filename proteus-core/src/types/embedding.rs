//! Dense embedding matrix types

use crate::{ProteusError, ProteusResult};
use serde::{Deserialize, Serialize};

/// Row-major matrix of read embeddings, one row per read
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Wrap row-major data; `data.len()` must equal `rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> ProteusResult<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ProteusError::InvalidInput(format!(
                "embedding buffer holds {} values, expected {} x {}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from row vectors, which must all share one width
    pub fn from_rows(rows: &[Vec<f32>]) -> ProteusResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ProteusError::InvalidInput(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Keep only the first `rows` rows; a no-op when the matrix is already shorter
    pub fn truncate(&mut self, rows: usize) {
        if rows < self.rows {
            self.rows = rows;
            self.data.truncate(rows * self.cols);
        }
    }

    /// Copy the given rows, in order, into a contiguous buffer
    pub fn gather_rows(&self, indices: &[usize]) -> Vec<f32> {
        let mut out = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            out.extend_from_slice(self.row(i));
        }
        out
    }

    /// Summary statistics over every value in the matrix
    pub fn stats(&self) -> MatrixStats {
        MatrixStats::from_values(self.data.iter().map(|&v| v as f64))
    }
}

/// Global min/max/mean/std of a set of values (population std)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl MatrixStats {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for v in values {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_sq += v * v;
        }
        if count == 0 {
            return Self { min: 0.0, max: 0.0, mean: 0.0, std: 0.0 };
        }
        let mean = sum / count as f64;
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        Self {
            min,
            max,
            mean,
            std: variance.sqrt(),
        }
    }
}
