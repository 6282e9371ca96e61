//! Reconstruction error plus distance to the nearest cluster centroid

use nalgebra::DMatrix;
use proteus_core::{ClusterLabel, NoveltyScore, ProteusError, ProteusResult, NOISE_LABEL};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

pub struct NoveltyScorer;

impl NoveltyScorer {
    /// Mean projected position of each non-noise label, in ascending label order
    pub fn centroids(points: &DMatrix<f64>, labels: &[ClusterLabel]) -> Vec<(ClusterLabel, Vec<f64>)> {
        let dim = points.ncols();
        let mut sums: BTreeMap<ClusterLabel, (Vec<f64>, usize)> = BTreeMap::new();
        for (row, &label) in points.row_iter().zip(labels) {
            if label == NOISE_LABEL {
                continue;
            }
            let entry = sums.entry(label).or_insert_with(|| (vec![0.0; dim], 0));
            for (acc, v) in entry.0.iter_mut().zip(row.iter()) {
                *acc += v;
            }
            entry.1 += 1;
        }

        sums.into_iter()
            .map(|(label, (sum, count))| {
                let count = count as f64;
                (label, sum.into_iter().map(|s| s / count).collect())
            })
            .collect()
    }

    /// Euclidean distance from every point (noise included) to its nearest
    /// centroid; infinite for all points when there are no clusters
    pub fn nearest_centroid_distances(points: &DMatrix<f64>, labels: &[ClusterLabel]) -> Vec<f64> {
        let centroids = Self::centroids(points, labels);
        if centroids.is_empty() {
            return vec![f64::INFINITY; points.nrows()];
        }

        let rows: Vec<Vec<f64>> = points.row_iter().map(|r| r.iter().copied().collect()).collect();
        rows.par_iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|(_, c)| {
                        row.iter()
                            .zip(c)
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum::<f64>()
                            .sqrt()
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    pub fn score(
        points: &DMatrix<f64>,
        labels: &[ClusterLabel],
        recon_errors: &[f64],
    ) -> ProteusResult<Vec<NoveltyScore>> {
        let n = points.nrows();
        if labels.len() != n || recon_errors.len() != n {
            return Err(ProteusError::InvalidInput(format!(
                "novelty inputs disagree: {} points, {} labels, {} reconstruction errors",
                n,
                labels.len(),
                recon_errors.len()
            )));
        }

        let distances = Self::nearest_centroid_distances(points, labels);
        if distances.first().is_some_and(|d| d.is_infinite()) {
            info!("No clusters found; cluster distance is infinite for every read");
        }

        Ok(recon_errors
            .iter()
            .zip(distances)
            .map(|(&recon_error, cluster_distance)| NoveltyScore {
                recon_error,
                cluster_distance,
            })
            .collect())
    }
}
