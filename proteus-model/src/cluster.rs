//! Density-based clustering of projected latents

use hdbscan::{Hdbscan, HdbscanHyperParams};
use nalgebra::DMatrix;
use proteus_core::{
    ClusterLabel, ClusterSummary, ClusteringConfig, ProteusError, ProteusResult, NOISE_LABEL,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// One label per row; `NOISE_LABEL` for unassigned points
    pub labels: Vec<ClusterLabel>,
    pub summary: ClusterSummary,
}

pub struct DensityClusterer {
    min_cluster_size: usize,
    min_samples: usize,
}

impl DensityClusterer {
    pub fn new(min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            min_cluster_size,
            min_samples,
        }
    }

    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::new(config.min_cluster_size, config.min_samples)
    }

    pub fn cluster(&self, points: &DMatrix<f64>) -> ProteusResult<ClusterOutcome> {
        let n = points.nrows();
        if n == 0 || points.ncols() == 0 {
            return Err(ProteusError::Clustering("no points to cluster".into()));
        }
        if points.iter().any(|v| !v.is_finite()) {
            return Err(ProteusError::Clustering(
                "projected coordinates contain non-finite values".into(),
            ));
        }

        let labels = if n < self.min_cluster_size {
            warn!(
                "{} points is fewer than min_cluster_size ({}); every point is noise",
                n, self.min_cluster_size
            );
            vec![NOISE_LABEL; n]
        } else if n <= self.min_samples {
            return Err(ProteusError::Clustering(format!(
                "{} points is not more than min_samples ({}); core distances are undefined",
                n, self.min_samples
            )));
        } else if all_coincide(points) {
            warn!("All {} projected points coincide; no density structure, every point is noise", n);
            vec![NOISE_LABEL; n]
        } else {
            let rows: Vec<Vec<f64>> = points.row_iter().map(|r| r.iter().copied().collect()).collect();
            let params = HdbscanHyperParams::builder()
                .min_cluster_size(self.min_cluster_size)
                .min_samples(self.min_samples)
                .build();
            let raw = Hdbscan::new(&rows, params)
                .cluster()
                .map_err(|e| ProteusError::Clustering(format!("HDBSCAN failed: {:?}", e)))?;
            enforce_min_size(&raw, self.min_cluster_size)
        };

        let summary = ClusterSummary::from_labels(&labels);
        info!(
            "Found {} clusters ({} noise points of {})",
            summary.cluster_count(),
            summary.noise,
            n
        );
        Ok(ClusterOutcome { labels, summary })
    }
}

fn all_coincide(points: &DMatrix<f64>) -> bool {
    let first = points.row(0);
    points.row_iter().all(|row| row == first)
}

/// Demote clusters smaller than `min_size` to noise and renumber the
/// survivors `0..k` in ascending order of their original label
pub fn enforce_min_size(labels: &[ClusterLabel], min_size: usize) -> Vec<ClusterLabel> {
    let mut counts: BTreeMap<ClusterLabel, usize> = BTreeMap::new();
    for &label in labels.iter().filter(|&&l| l != NOISE_LABEL) {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut renumber = BTreeMap::new();
    for (&label, &count) in &counts {
        if count >= min_size {
            let next = renumber.len() as ClusterLabel;
            renumber.insert(label, next);
        } else {
            warn!("Cluster {} has {} members (< {}); demoted to noise", label, count, min_size);
        }
    }

    labels
        .iter()
        .map(|l| renumber.get(l).copied().unwrap_or(NOISE_LABEL))
        .collect()
}
