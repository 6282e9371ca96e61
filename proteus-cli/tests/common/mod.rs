#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use proteus_test::{gaussian_blobs, read_ids, BlobSpec, TestEnvironment};
use std::path::PathBuf;

/// Get the proteus binary under test
pub fn proteus_cmd() -> Command {
    let mut cmd = Command::cargo_bin("proteus").expect("Failed to find proteus binary");
    cmd.env_remove("PROTEUS_LOG");
    cmd
}

/// Shrunken model and optimization loops; clustering keeps its defaults
pub const FAST_CONFIG: &str = r#"
[model]
latent_dim = 8
hidden_dim = 32

[training]
epochs = 3
beta_warmup_epochs = 2

[reduction]
manifold_epochs = 30

[runtime]
device = "cpu"
"#;

/// Paths of a staged two-blob dataset
pub struct Staged {
    pub embeddings: PathBuf,
    pub ids: PathBuf,
    pub config: PathBuf,
}

/// Two blobs of `per_blob` reads in 16 dimensions, with matching identifiers
pub fn stage_blobs(env: &TestEnvironment, name: &str, per_blob: usize) -> Result<Staged> {
    let spec = BlobSpec {
        per_blob,
        dim: 16,
        ..BlobSpec::default()
    };
    Ok(Staged {
        embeddings: env.write_embeddings(name, &gaussian_blobs(&spec))?,
        ids: env.write_ids(name, &read_ids(spec.rows()))?,
        config: env.write_file("fast.toml", FAST_CONFIG.as_bytes())?,
    })
}

/// Number of data rows (header excluded) in a CSV file
pub fn count_rows(path: &std::path::Path) -> Result<usize> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().count().saturating_sub(1))
}
