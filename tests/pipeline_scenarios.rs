//! End-to-end runs of the clustering pipeline over synthetic embeddings

mod common;

use common::{fast_config, run, stage_inputs};
use pretty_assertions::assert_eq;
use proteus::{Pipeline, RunSummary};
use proteus_core::{ProteusError, NOISE_LABEL};
use proteus_model::ProjectionTier;
use proteus_test::{
    assert_tables_aligned, capture_warnings, gaussian_blobs, identical_rows, init_test_logging,
    read_cluster_table, read_ids, read_novelty_table, BlobSpec, Result, TestEnvironment,
};
use std::collections::BTreeMap;

#[test]
fn test_two_blobs_produce_aligned_tables() -> Result<()> {
    init_test_logging();
    let env = TestEnvironment::new()?;
    let spec = BlobSpec::default();
    let ids = read_ids(spec.rows());
    let inputs = stage_inputs(&env, "blobs", &gaussian_blobs(&spec), Some(&ids))?;

    let result = run(fast_config(), &inputs)?;
    assert!(result.truncation.is_none());
    assert_eq!(result.analysis.rows(), 500);

    let clusters = read_cluster_table(&inputs.outputs.clusters)?;
    let novelty = read_novelty_table(&inputs.outputs.novelty)?;
    assert_eq!(clusters.len(), 500);
    assert_tables_aligned(&clusters, &novelty);
    for (row, id) in clusters.iter().zip(&ids) {
        assert_eq!(row.read_id, id.as_str());
    }

    for row in &novelty {
        assert!(row.recon_error.is_finite() && row.recon_error >= 0.0);
        assert!(row.cluster_distance >= 0.0);
    }
    Ok(())
}

#[test]
fn test_output_names_follow_inputs() -> Result<()> {
    let env = TestEnvironment::new()?;
    let spec = BlobSpec { per_blob: 40, dim: 16, ..BlobSpec::default() };
    let inputs = stage_inputs(&env, "sample7", &gaussian_blobs(&spec), Some(&read_ids(80)))?;

    run(fast_config(), &inputs)?;

    assert!(env.outputs_dir().join("sample7_clusters.csv").exists());
    assert!(env.outputs_dir().join("sample7_novelty_scores.csv").exists());
    Ok(())
}

#[test]
fn test_short_identifier_list_truncates_rows() -> Result<()> {
    let env = TestEnvironment::new()?;
    let spec = BlobSpec::default();
    let ids = read_ids(480);
    let inputs = stage_inputs(&env, "short", &gaussian_blobs(&spec), Some(&ids))?;

    let (result, logs) = capture_warnings(|| run(fast_config(), &inputs));
    let result = result?;
    assert!(
        logs.contains("len(read_ids) (480) != len(embeddings) (500); truncating both to 480"),
        "truncation warning missing from logs:\n{}",
        logs
    );

    let truncation = result.truncation.expect("length mismatch is recorded");
    assert_eq!((truncation.embeddings, truncation.identifiers, truncation.kept), (500, 480, 480));

    let clusters = read_cluster_table(&inputs.outputs.clusters)?;
    let novelty = read_novelty_table(&inputs.outputs.novelty)?;
    assert_eq!(clusters.len(), 480);
    assert_tables_aligned(&clusters, &novelty);
    assert_eq!(clusters.last().map(|r| r.read_id.as_str()), Some("read_479"));
    Ok(())
}

#[test]
fn test_missing_identifier_file_uses_positions() -> Result<()> {
    let env = TestEnvironment::new()?;
    let spec = BlobSpec { per_blob: 40, dim: 16, ..BlobSpec::default() };
    let mut inputs = stage_inputs(&env, "noids", &gaussian_blobs(&spec), None)?;
    inputs.ids = Some(env.inputs_dir().join("noids_dedup_counts.csv"));

    run(fast_config(), &inputs)?;

    let clusters = read_cluster_table(&inputs.outputs.clusters)?;
    assert_eq!(clusters.len(), 80);
    assert_eq!(clusters[0].read_id, "0");
    assert_eq!(clusters[79].read_id, "79");
    Ok(())
}

#[test]
fn test_identical_rows_give_uniform_results() -> Result<()> {
    init_test_logging();
    let env = TestEnvironment::new()?;
    let ids = read_ids(500);
    let inputs = stage_inputs(&env, "flat", &identical_rows(500, 128, 0.25), Some(&ids))?;

    let result = run(fast_config(), &inputs)?;
    assert_eq!(result.analysis.projection.tier, ProjectionTier::Passthrough);

    let clusters = read_cluster_table(&inputs.outputs.clusters)?;
    let novelty = read_novelty_table(&inputs.outputs.novelty)?;
    assert_eq!(clusters.len(), 500);

    let first = clusters[0].cluster_id;
    assert!(clusters.iter().all(|r| r.cluster_id == first));
    let distance = novelty[0].cluster_distance;
    assert!(distance == 0.0 || distance.is_infinite());
    assert!(novelty.iter().all(|r| r.cluster_distance == distance));
    Ok(())
}

#[test]
fn test_disabled_manifold_falls_back_to_linear() -> Result<()> {
    init_test_logging();
    let spec = BlobSpec { per_blob: 60, dim: 32, ..BlobSpec::default() };
    let mut config = fast_config();
    config.reduction.manifold_enabled = false;

    let analysis = Pipeline::new(config)?.analyze(&gaussian_blobs(&spec), read_ids(spec.rows()))?;

    let projection = &analysis.projection;
    assert_eq!(projection.tier, ProjectionTier::Linear);
    assert_eq!(projection.matrix.shape(), (120, 5));
    assert!(projection.fell_back());
    assert_eq!(projection.failures[0].tier, ProjectionTier::Manifold);
    assert_eq!(analysis.labels().len(), 120);
    assert_eq!(analysis.scores.len(), 120);
    Ok(())
}

#[test]
fn test_same_seed_same_tables() -> Result<()> {
    let spec = BlobSpec { per_blob: 80, dim: 24, ..BlobSpec::default() };
    let matrix = gaussian_blobs(&spec);
    let ids = read_ids(spec.rows());

    let first = TestEnvironment::new()?;
    let second = TestEnvironment::new()?;
    let a = stage_inputs(&first, "repro", &matrix, Some(&ids))?;
    let b = stage_inputs(&second, "repro", &matrix, Some(&ids))?;
    run(fast_config(), &a)?;
    run(fast_config(), &b)?;

    assert_eq!(std::fs::read(&a.outputs.clusters)?, std::fs::read(&b.outputs.clusters)?);
    assert_eq!(std::fs::read(&a.outputs.novelty)?, std::fs::read(&b.outputs.novelty)?);
    Ok(())
}

#[test]
fn test_cluster_and_distance_properties() -> Result<()> {
    let spec = BlobSpec { per_blob: 100, dim: 32, ..BlobSpec::default() };
    let config = fast_config();
    let min_size = config.clustering.min_cluster_size;
    let analysis = Pipeline::new(config)?.analyze(&gaussian_blobs(&spec), read_ids(spec.rows()))?;

    let mut sizes: BTreeMap<i32, usize> = BTreeMap::new();
    for &label in analysis.labels() {
        assert!(label >= NOISE_LABEL);
        *sizes.entry(label).or_default() += 1;
    }
    sizes.remove(&NOISE_LABEL);
    assert!(sizes.values().all(|&n| n >= min_size));

    // Labels are contiguous from zero
    let labels: Vec<i32> = sizes.keys().copied().collect();
    assert_eq!(labels, (0..labels.len() as i32).collect::<Vec<_>>());

    for score in &analysis.scores {
        assert_eq!(score.cluster_distance.is_infinite(), sizes.is_empty());
    }
    Ok(())
}

#[test]
fn test_summary_round_trip() -> Result<()> {
    let env = TestEnvironment::new()?;
    let spec = BlobSpec { per_blob: 40, dim: 16, ..BlobSpec::default() };
    let inputs = stage_inputs(&env, "summary", &gaussian_blobs(&spec), Some(&read_ids(70)))?;
    let config = fast_config();

    let result = run(config.clone(), &inputs)?;
    let summary = RunSummary::from_run(&result, &inputs, &config);
    let path = env.outputs_dir().join("nested").join("summary.json");
    summary.write(&path)?;

    let loaded = RunSummary::load(&path)?;
    assert_eq!(loaded.inputs.rows, 70);
    assert_eq!(loaded.inputs.dims, 16);
    assert_eq!(loaded.truncation.map(|t| t.kept), Some(70));
    assert_eq!(loaded.training.map(|e| e.epoch), Some(3));
    assert_eq!(loaded.projection.tier, result.analysis.projection.tier.to_string());
    assert_eq!(
        loaded.clustering.sizes.values().sum::<usize>() + loaded.clustering.noise,
        70
    );
    assert_eq!(loaded.config, config);
    Ok(())
}

#[test]
fn test_invalid_config_fails_before_work() {
    let mut config = fast_config();
    config.training.batch_size = 0;
    assert!(matches!(Pipeline::new(config), Err(ProteusError::Configuration(_))));
}

#[test]
fn test_missing_embeddings_is_an_io_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let inputs = proteus::PipelineInputs {
        embeddings: env.inputs_dir().join("absent_embeddings.npy"),
        ids: None,
        outputs: proteus_io::derive_output_paths(None, None, Some(&env.outputs_dir())),
    };
    let err = Pipeline::new(fast_config())?.run(&inputs).err().expect("run must fail");
    assert!(matches!(err, ProteusError::Io(_) | ProteusError::NotFound(_)));
    Ok(())
}
