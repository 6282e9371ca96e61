//! Cluster assignment and novelty types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cluster label assigned to one read
pub type ClusterLabel = i32;

/// Reserved label for reads no dense region reaches; never a real cluster
pub const NOISE_LABEL: ClusterLabel = -1;

/// Two independent novelty signals for one read
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoveltyScore {
    /// MSE between the clean input and the decoding of a sampled latent point
    pub recon_error: f64,
    /// Euclidean distance to the nearest centroid; infinite when no cluster exists
    pub cluster_distance: f64,
}

impl NoveltyScore {
    pub fn has_structural_reference(&self) -> bool {
        self.cluster_distance.is_finite()
    }
}

/// Member counts per label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Members per non-noise label, in ascending label order
    pub sizes: BTreeMap<ClusterLabel, usize>,
    pub noise: usize,
}

impl ClusterSummary {
    pub fn from_labels(labels: &[ClusterLabel]) -> Self {
        let mut summary = Self::default();
        for &label in labels {
            if label == NOISE_LABEL {
                summary.noise += 1;
            } else {
                *summary.sizes.entry(label).or_insert(0) += 1;
            }
        }
        summary
    }

    pub fn cluster_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn total(&self) -> usize {
        self.noise + self.sizes.values().sum::<usize>()
    }
}
