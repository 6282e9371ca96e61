use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::DMatrix;
use proteus::Pipeline;
use proteus_core::{DeviceChoice, PipelineConfig, ReductionConfig, RunRng};
use proteus_model::{DensityClusterer, NoveltyScorer, ProjectionChain};
use proteus_test::{gaussian_blobs, read_ids, BlobSpec};
use std::hint::black_box;

/// Standardized-latent stand-in: three well separated blobs in `dim` columns
fn latent_blobs(rows: usize, dim: usize) -> DMatrix<f64> {
    let spec = BlobSpec {
        blobs: 3,
        per_blob: rows / 3,
        dim,
        ..BlobSpec::default()
    };
    let matrix = gaussian_blobs(&spec);
    DMatrix::from_row_slice(
        matrix.rows(),
        matrix.cols(),
        &matrix.as_slice().iter().map(|&v| f64::from(v)).collect::<Vec<_>>(),
    )
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/projection");
    group.sample_size(10);

    for rows in [300, 900, 1500].iter() {
        let data = latent_blobs(*rows, 16);

        let manifold = ProjectionChain::detect(&ReductionConfig::default());
        group.bench_with_input(BenchmarkId::new("manifold", rows), rows, |b, _| {
            b.iter(|| {
                let outcome = manifold.project(black_box(&data), &mut RunRng::seeded(42)).unwrap();
                black_box(outcome);
            });
        });

        let linear = ProjectionChain::detect(&ReductionConfig {
            manifold_enabled: false,
            ..ReductionConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("linear", rows), rows, |b, _| {
            b.iter(|| {
                let outcome = linear.project(black_box(&data), &mut RunRng::seeded(42)).unwrap();
                black_box(outcome);
            });
        });
    }

    group.finish();
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/clustering");
    group.sample_size(10);

    for rows in [300, 900, 3000].iter() {
        let data = latent_blobs(*rows, 10);
        let clusterer = DensityClusterer::new(30, 10);

        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                let outcome = clusterer.cluster(black_box(&data)).unwrap();
                black_box(outcome);
            });
        });
    }

    group.finish();
}

fn bench_novelty(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/novelty");

    for rows in [900, 9000].iter() {
        let data = latent_blobs(*rows, 10);
        let labels = DensityClusterer::new(30, 10).cluster(&data).unwrap().labels;
        let errors = vec![0.5; data.nrows()];

        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                let scores = NoveltyScorer::score(black_box(&data), &labels, &errors).unwrap();
                black_box(scores);
            });
        });
    }

    group.finish();
}

fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/full_analysis");
    group.sample_size(10);

    let mut config = PipelineConfig::default();
    config.training.epochs = 5;
    config.runtime.device = DeviceChoice::Cpu;
    let pipeline = Pipeline::new(config).unwrap();

    for per_blob in [100, 250].iter() {
        let spec = BlobSpec {
            per_blob: *per_blob,
            ..BlobSpec::default()
        };
        let matrix = gaussian_blobs(&spec);

        group.bench_with_input(BenchmarkId::from_parameter(spec.rows()), per_blob, |b, _| {
            b.iter(|| {
                let analysis = pipeline
                    .analyze(black_box(&matrix), read_ids(spec.rows()))
                    .unwrap();
                black_box(analysis.scores);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_projection,
    bench_clustering,
    bench_novelty,
    bench_full_analysis
);
criterion_main!(benches);
