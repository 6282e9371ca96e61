//! Nonlinear neighbor-graph projection
//!
//! Builds a fuzzy k-nearest-neighbor graph over the input points and lays it
//! out in a low-dimensional space by stochastic gradient descent on attractive
//! (graph edges) and repulsive (random pairs) forces, as UMAP does. The
//! nearest-neighbor search is brute force and parallel over points; the layout
//! is sequential so it is fully determined by the run generator.

use super::pca::PrincipalComponents;
use super::{all_finite, ProjectionFailure, ProjectionStrategy, ProjectionTier};
use nalgebra::DMatrix;
use proteus_core::{ReductionConfig, RunRng};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

const SPREAD: f64 = 1.0;
const NEGATIVE_SAMPLES: usize = 5;
const GRADIENT_CLIP: f64 = 4.0;
/// Half-width of the box the initial layout is scaled into
const INIT_EXTENT: f64 = 10.0;
const SIGMA_ITERATIONS: usize = 64;
const SIGMA_TOLERANCE: f64 = 1e-5;
const MIN_SIGMA_SCALE: f64 = 1e-3;

pub struct ManifoldProjection {
    components: usize,
    neighbors: usize,
    min_dist: f64,
    epochs: usize,
}

impl ManifoldProjection {
    pub fn new(components: usize, neighbors: usize, min_dist: f64, epochs: usize) -> Self {
        Self {
            components,
            neighbors,
            min_dist,
            epochs,
        }
    }

    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(
            config.manifold_components,
            config.manifold_neighbors,
            config.manifold_min_dist,
            config.manifold_epochs,
        )
    }
}

impl ProjectionStrategy for ManifoldProjection {
    fn tier(&self) -> ProjectionTier {
        ProjectionTier::Manifold
    }

    fn attempt(&self, data: &DMatrix<f64>, rng: &mut RunRng) -> Result<DMatrix<f64>, ProjectionFailure> {
        let (n, d) = data.shape();
        if n < 3 || d == 0 {
            return Err(ProjectionFailure::new(format!("too few points ({}) for a neighbor graph", n)));
        }
        if !all_finite(data) {
            return Err(ProjectionFailure::new("input contains non-finite values"));
        }

        let k = self.neighbors.min(n - 1);
        let knn = nearest_neighbors(data, k);
        if knn.iter().all(|nb| nb.distances.iter().all(|&dist| dist == 0.0)) {
            return Err(ProjectionFailure::new("input points coincide; no neighbor structure"));
        }

        let edges = fuzzy_graph(&knn, k, self.epochs);
        let (a, b) = fit_curve(self.min_dist);
        debug!("Manifold graph: {} points, {} edges, curve a={:.4} b={:.4}", n, edges.len(), a, b);

        let dim = self.components.min(d);
        let mut layout = initial_layout(data, dim, rng);
        optimize_layout(&mut layout, n, dim, &edges, a, b, self.epochs, rng);

        let projected = DMatrix::from_row_slice(n, dim, &layout);
        if !all_finite(&projected) {
            return Err(ProjectionFailure::new("layout diverged to non-finite values"));
        }
        Ok(projected)
    }
}

struct Neighborhood {
    indices: Vec<usize>,
    /// Ascending
    distances: Vec<f64>,
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

fn nearest_neighbors(data: &DMatrix<f64>, k: usize) -> Vec<Neighborhood> {
    let rows: Vec<Vec<f64>> = data.row_iter().map(|r| r.iter().copied().collect()).collect();

    (0..rows.len())
        .into_par_iter()
        .map(|i| {
            let mut candidates: Vec<(f64, usize)> = (0..rows.len())
                .filter(|&j| j != i)
                .map(|j| (euclidean(&rows[i], &rows[j]), j))
                .collect();
            candidates.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
            candidates.truncate(k);
            Neighborhood {
                indices: candidates.iter().map(|c| c.1).collect(),
                distances: candidates.iter().map(|c| c.0).collect(),
            }
        })
        .collect()
}

/// Per-point `(rho, sigma)`: distance to the nearest distinct neighbor, and the
/// bandwidth that makes the point's membership strengths sum to `log2(k)`
fn smooth_distances(nb: &Neighborhood, k: usize, global_mean: f64) -> (f64, f64) {
    let rho = nb.distances.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);
    let target = (k as f64).log2();

    let (mut lo, mut hi, mut mid) = (0.0f64, f64::INFINITY, 1.0f64);
    for _ in 0..SIGMA_ITERATIONS {
        let psum: f64 = nb
            .distances
            .iter()
            .map(|&d| {
                let gap = d - rho;
                if gap > 0.0 {
                    (-gap / mid).exp()
                } else {
                    1.0
                }
            })
            .sum();

        if (psum - target).abs() < SIGMA_TOLERANCE {
            break;
        }
        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }

    let local_mean = nb.distances.iter().sum::<f64>() / nb.distances.len().max(1) as f64;
    let floor = MIN_SIGMA_SCALE * if rho > 0.0 { local_mean } else { global_mean };
    (rho, mid.max(floor))
}

/// Symmetrized membership strengths `w_ij + w_ji - w_ij * w_ji`, as `(i, j, w)` with `i < j`
fn fuzzy_graph(knn: &[Neighborhood], k: usize, epochs: usize) -> Vec<(usize, usize, f64)> {
    let total: f64 = knn.iter().flat_map(|nb| nb.distances.iter()).sum();
    let global_mean = total / (knn.len() * k).max(1) as f64;

    let mut directed: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (i, nb) in knn.iter().enumerate() {
        let (rho, sigma) = smooth_distances(nb, k, global_mean);
        for (&j, &d) in nb.indices.iter().zip(&nb.distances) {
            let w = (-(d - rho).max(0.0) / sigma).exp();
            directed.insert((i, j), w);
        }
    }

    let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (&(i, j), &w) in &directed {
        let key = (i.min(j), i.max(j));
        if merged.contains_key(&key) {
            continue;
        }
        let other = directed.get(&(j, i)).copied().unwrap_or(0.0);
        merged.insert(key, w + other - w * other);
    }

    let max_w = merged.values().copied().fold(0.0f64, f64::max);
    let cutoff = max_w / epochs.max(1) as f64;
    merged
        .into_iter()
        .filter(|&(_, w)| w > 0.0 && w >= cutoff)
        .map(|((i, j), w)| (i, j, w))
        .collect()
}

/// Fit `1 / (1 + a * x^(2b))` to the offset-exponential membership curve
pub fn fit_curve(min_dist: f64) -> (f64, f64) {
    let xs: Vec<f64> = (0..300).map(|i| i as f64 * 3.0 * SPREAD / 299.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| if x < min_dist { 1.0 } else { (-(x - min_dist) / SPREAD).exp() })
        .collect();
    let error = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let f = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (f - y) * (f - y)
            })
            .sum()
    };

    // Coarse grid over log(a) and b, then repeated zoom around the best cell
    let (mut log_a_lo, mut log_a_hi) = (-4.6f64, 4.6f64);
    let (mut b_lo, mut b_hi) = (0.1f64, 3.0f64);
    let mut best = (1.0f64, 1.0f64, f64::INFINITY);
    for steps in [120usize, 40, 40, 40, 40] {
        for ia in 0..=steps {
            let a = (log_a_lo + (log_a_hi - log_a_lo) * ia as f64 / steps as f64).exp();
            for ib in 0..=steps {
                let b = b_lo + (b_hi - b_lo) * ib as f64 / steps as f64;
                let e = error(a, b);
                if e < best.2 {
                    best = (a, b, e);
                }
            }
        }
        let a_span = (log_a_hi - log_a_lo) / steps as f64 * 2.0;
        let b_span = (b_hi - b_lo) / steps as f64 * 2.0;
        let log_a = best.0.ln();
        log_a_lo = log_a - a_span;
        log_a_hi = log_a + a_span;
        b_lo = (best.1 - b_span).max(1e-3);
        b_hi = best.1 + b_span;
    }
    (best.0, best.1)
}

/// Row-major `n x dim` starting layout: principal axes scaled into the
/// initial box, or uniform noise when the axes are undefined
fn initial_layout(data: &DMatrix<f64>, dim: usize, rng: &mut RunRng) -> Vec<f64> {
    let n = data.nrows();
    if let Ok(pca) = PrincipalComponents::fit(data, dim) {
        let coords = pca.transform(data);
        let extent = coords.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if extent > 0.0 && extent.is_finite() {
            let scale = INIT_EXTENT / extent;
            let mut layout = Vec::with_capacity(n * dim);
            for row in coords.row_iter() {
                layout.extend(row.iter().map(|v| v * scale));
            }
            return layout;
        }
    }
    rng.symmetric_uniform(n * dim, INIT_EXTENT as f32)
        .into_iter()
        .map(f64::from)
        .collect()
}

fn clip(v: f64) -> f64 {
    v.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

#[allow(clippy::too_many_arguments)]
fn optimize_layout(
    layout: &mut [f64],
    n: usize,
    dim: usize,
    edges: &[(usize, usize, f64)],
    a: f64,
    b: f64,
    epochs: usize,
    rng: &mut RunRng,
) {
    let max_w = edges.iter().map(|e| e.2).fold(0.0f64, f64::max);
    if max_w <= 0.0 {
        return;
    }
    let mut diff = vec![0.0f64; dim];

    for epoch in 0..epochs {
        let alpha = 1.0 - epoch as f64 / epochs as f64;

        for &(i, j, w) in edges {
            if rng.uniform() > w / max_w {
                continue;
            }

            // Attraction along the edge, applied to both endpoints
            let dist_sq = squared_gap(layout, i, j, dim, &mut diff);
            let coeff = if dist_sq > 0.0 {
                -2.0 * a * b * dist_sq.powf(b - 1.0) / (a * dist_sq.powf(b) + 1.0)
            } else {
                0.0
            };
            for (c, &g) in diff.iter().enumerate() {
                let grad = clip(coeff * g) * alpha;
                layout[i * dim + c] += grad;
                layout[j * dim + c] -= grad;
            }

            // Repulsion from random points, applied to `i` only
            for _ in 0..NEGATIVE_SAMPLES {
                let k = rng.index(n);
                if k == i {
                    continue;
                }
                let dist_sq = squared_gap(layout, i, k, dim, &mut diff);
                if dist_sq <= 0.0 {
                    continue;
                }
                let coeff = 2.0 * b / ((0.001 + dist_sq) * (a * dist_sq.powf(b) + 1.0));
                for (c, &g) in diff.iter().enumerate() {
                    layout[i * dim + c] += clip(coeff * g) * alpha;
                }
            }
        }
    }
}

/// Fill `diff` with `y_i - y_j` and return its squared length
fn squared_gap(layout: &[f64], i: usize, j: usize, dim: usize, diff: &mut [f64]) -> f64 {
    let mut sq = 0.0;
    for c in 0..dim {
        let g = layout[i * dim + c] - layout[j * dim + c];
        diff[c] = g;
        sq += g * g;
    }
    sq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs(per_blob: usize, dim: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = RunRng::seeded(seed);
        let noise = rng.normal(2 * per_blob * dim, 0.3);
        let values: Vec<f64> = noise
            .iter()
            .enumerate()
            .map(|(idx, &v)| {
                let offset = if idx / dim < per_blob { -4.0 } else { 4.0 };
                offset + v as f64
            })
            .collect();
        DMatrix::from_row_slice(2 * per_blob, dim, &values)
    }

    fn quick() -> ManifoldProjection {
        ManifoldProjection::new(2, 10, 0.1, 40)
    }

    #[test]
    fn test_curve_fit_matches_reference_values() {
        let (a, b) = fit_curve(0.1);
        assert!((a - 1.577).abs() < 0.05, "a = {}", a);
        assert!((b - 0.895).abs() < 0.05, "b = {}", b);
    }

    #[test]
    fn test_blobs_stay_separated() {
        let data = two_blobs(25, 6, 8);
        let out = quick().attempt(&data, &mut RunRng::seeded(1)).unwrap();
        assert_eq!(out.shape(), (50, 2));

        let centroid = |range: std::ops::Range<usize>| {
            let len = range.len() as f64;
            let mut c = [0.0f64; 2];
            for r in range {
                c[0] += out[(r, 0)] / len;
                c[1] += out[(r, 1)] / len;
            }
            c
        };
        let (c0, c1) = (centroid(0..25), centroid(25..50));
        let between = euclidean(&c0, &c1);
        let spread = (0..25)
            .map(|r| euclidean(&[out[(r, 0)], out[(r, 1)]], &c0))
            .fold(0.0f64, f64::max);
        assert!(between > spread, "between {} vs spread {}", between, spread);
    }

    #[test]
    fn test_coincident_points_fail() {
        let data = DMatrix::from_element(20, 3, 0.5);
        let err = quick().attempt(&data, &mut RunRng::seeded(1)).unwrap_err();
        assert!(err.0.contains("coincide"));
    }

    #[test]
    fn test_too_few_points_fail() {
        let data = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        assert!(quick().attempt(&data, &mut RunRng::seeded(1)).is_err());
    }

    #[test]
    fn test_same_seed_same_layout() {
        let data = two_blobs(15, 4, 2);
        let a = quick().attempt(&data, &mut RunRng::seeded(5)).unwrap();
        let b = quick().attempt(&data, &mut RunRng::seeded(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_neighbors_are_sorted_and_exclude_self() {
        let data = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 3.0, 7.0]);
        let knn = nearest_neighbors(&data, 2);
        assert_eq!(knn[0].indices, vec![1, 2]);
        assert_eq!(knn[3].indices, vec![2, 1]);
        assert_eq!(knn[3].distances, vec![4.0, 6.0]);
    }

    #[test]
    fn test_graph_weights_are_symmetric_probabilities() {
        let data = two_blobs(10, 3, 4);
        let knn = nearest_neighbors(&data, 5);
        let edges = fuzzy_graph(&knn, 5, 200);
        assert!(!edges.is_empty());
        for &(i, j, w) in &edges {
            assert!(i < j);
            assert!(w > 0.0 && w <= 1.0 + 1e-12);
        }
    }
}
