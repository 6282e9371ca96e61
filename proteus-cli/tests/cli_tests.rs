mod common;

use anyhow::Result;
use predicates::prelude::*;
use proteus_test::{read_cluster_table, read_novelty_table, TestEnvironment};

use common::*;

#[test]
fn test_cli_help_command() {
    proteus_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("variational auto-encoder"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_command() {
    proteus_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("proteus"));
}

#[test]
fn test_run_writes_tables_next_to_output_dir() -> Result<()> {
    let env = TestEnvironment::new()?;
    let staged = stage_blobs(&env, "sample", 40)?;
    let out = env.outputs_dir();

    proteus_cmd()
        .arg("run")
        .arg("--embeddings").arg(&staged.embeddings)
        .arg("--ids").arg(&staged.ids)
        .arg("--output-dir").arg(&out)
        .arg("--config").arg(&staged.config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Clusters"))
        .stdout(predicate::str::contains("noise"));

    let clusters = read_cluster_table(out.join("sample_clusters.csv"))?;
    let novelty = read_novelty_table(out.join("sample_novelty_scores.csv"))?;
    assert_eq!(clusters.len(), 80);
    assert_eq!(novelty.len(), 80);
    assert_eq!(clusters[0].read_id, "read_0");
    Ok(())
}

#[test]
fn test_run_quiet_with_explicit_paths_and_summary() -> Result<()> {
    let env = TestEnvironment::new()?;
    let staged = stage_blobs(&env, "quiet", 40)?;
    let clusters = env.outputs_dir().join("c.csv");
    let novelty = env.outputs_dir().join("n.csv");
    let summary = env.outputs_dir().join("run.json");

    proteus_cmd()
        .arg("run")
        .arg("-e").arg(&staged.embeddings)
        .arg("-i").arg(&staged.ids)
        .arg("-c").arg(&staged.config)
        .arg("--clusters").arg(&clusters)
        .arg("--novelty").arg(&novelty)
        .arg("--summary").arg(&summary)
        .arg("--no-manifold")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(count_rows(&clusters)?, 80);
    assert_eq!(count_rows(&novelty)?, 80);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary)?)?;
    assert_eq!(json["inputs"]["rows"], 80);
    assert_eq!(json["projection"]["tier"], "linear");
    assert_eq!(json["config"]["reduction"]["manifold_enabled"], false);
    assert_eq!(json["config"]["training"]["epochs"], 3);
    Ok(())
}

#[test]
fn test_run_with_mismatched_ids_truncates() -> Result<()> {
    let env = TestEnvironment::new()?;
    let staged = stage_blobs(&env, "mismatch", 40)?;
    let ids = env.write_ids("short", &proteus_test::read_ids(70))?;

    proteus_cmd()
        .arg("run")
        .arg("-e").arg(&staged.embeddings)
        .arg("-i").arg(&ids)
        .arg("-o").arg(env.outputs_dir())
        .arg("-c").arg(&staged.config)
        .assert()
        .success()
        .stdout(predicate::str::contains("kept the first 70"));

    assert_eq!(count_rows(&env.outputs_dir().join("mismatch_clusters.csv"))?, 70);
    Ok(())
}

#[test]
fn test_seed_override_is_reproducible() -> Result<()> {
    let env = TestEnvironment::new()?;
    let staged = stage_blobs(&env, "seeded", 40)?;

    let mut tables = Vec::new();
    for run in ["a", "b"] {
        let path = env.outputs_dir().join(format!("{}_novelty.csv", run));
        proteus_cmd()
            .arg("run")
            .arg("-e").arg(&staged.embeddings)
            .arg("-i").arg(&staged.ids)
            .arg("-c").arg(&staged.config)
            .arg("-o").arg(env.outputs_dir())
            .arg("--novelty").arg(&path)
            .args(["--seed", "7", "--quiet"])
            .assert()
            .success();
        tables.push(std::fs::read_to_string(&path)?);
    }
    assert_eq!(tables[0], tables[1]);
    Ok(())
}

#[test]
fn test_missing_embeddings_exit_code() -> Result<()> {
    let env = TestEnvironment::new()?;

    proteus_cmd()
        .arg("run")
        .arg("--embeddings").arg(env.inputs_dir().join("absent_embeddings.npy"))
        .arg("--quiet")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn test_invalid_config_exit_code() -> Result<()> {
    let env = TestEnvironment::new()?;
    let staged = stage_blobs(&env, "badcfg", 40)?;
    let config = env.write_file("bad.toml", b"[training]\nepochs = 0\n")?;

    proteus_cmd()
        .arg("run")
        .arg("-e").arg(&staged.embeddings)
        .arg("-c").arg(&config)
        .arg("--quiet")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("training.epochs"));
    Ok(())
}

#[test]
fn test_config_init_and_show() -> Result<()> {
    let env = TestEnvironment::new()?;
    let path = env.root().join("proteus.toml");

    proteus_cmd()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    // A second init refuses to overwrite
    proteus_cmd()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .code(2);

    proteus_cmd()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("latent_dim = 16"))
        .stdout(predicate::str::contains("min_cluster_size = 30"));
    Ok(())
}

#[test]
fn test_config_show_defaults() {
    proteus_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[training]"))
        .stdout(predicate::str::contains("beta_final = 10.0"));
}
