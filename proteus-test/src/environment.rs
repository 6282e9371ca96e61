//! Test environment management
//!
//! Provides isolated run directories with automatic cleanup using RAII.

use anyhow::{Context, Result};
use proteus_core::{EmbeddingMatrix, ReadId};
use proteus_io::{write_npy, NpyDtype};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Configuration for test environment
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Keep the directory after the environment is dropped (for debugging)
    pub preserve: bool,
    /// Custom prefix for test directories
    pub prefix: Option<String>,
}

/// Isolated directory tree holding one test's inputs and outputs
pub struct TestEnvironment {
    temp_dir: Option<TempDir>,
    root_path: PathBuf,
    config: TestConfig,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(config: TestConfig) -> Result<Self> {
        let prefix = config.prefix.as_deref().unwrap_or("proteus-test");
        let temp_dir = TempDir::with_prefix(prefix).context("Failed to create temporary directory")?;
        let root_path = temp_dir.path().to_path_buf();

        std::fs::create_dir_all(root_path.join("inputs"))?;
        std::fs::create_dir_all(root_path.join("outputs"))?;

        Ok(Self {
            temp_dir: Some(temp_dir),
            root_path,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.root_path.join("inputs")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root_path.join("outputs")
    }

    /// Write `<inputs>/<name>_embeddings.npy` and return its path
    pub fn write_embeddings(&self, name: &str, matrix: &EmbeddingMatrix) -> Result<PathBuf> {
        let path = self.inputs_dir().join(format!("{}_embeddings.npy", name));
        write_npy(&path, matrix, NpyDtype::F4).context("Failed to write embeddings")?;
        Ok(path)
    }

    /// Write `<inputs>/<name>_dedup_counts.csv` with one identifier per row
    pub fn write_ids(&self, name: &str, ids: &[ReadId]) -> Result<PathBuf> {
        let path = self.inputs_dir().join(format!("{}_dedup_counts.csv", name));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["sequence", "count"])?;
        for id in ids {
            writer.write_record([id.as_str(), "1"])?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_file(&self, path: impl AsRef<Path>, content: &[u8]) -> Result<PathBuf> {
        let full_path = self.root_path.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full_path, content)?;
        Ok(full_path)
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String> {
        let full_path = self.root_path.join(path);
        std::fs::read_to_string(&full_path).with_context(|| format!("Failed to read {}", full_path.display()))
    }

    /// Manually preserve the environment (for debugging)
    pub fn preserve(&mut self) {
        if let Some(temp_dir) = self.temp_dir.take() {
            let path = temp_dir.keep();
            println!("Test environment preserved at: {}", path.display());
        }
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if self.config.preserve {
            self.preserve();
        }
        // Otherwise, temp_dir is automatically cleaned up when dropped
    }
}
