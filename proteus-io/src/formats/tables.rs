//! Cluster and novelty result tables
//!
//! Both tables are keyed by read identifier and keep the input order, so row
//! `i` of either file always refers to the same read.

use crate::formats::identifiers::map_csv;
use proteus_core::{ClusterLabel, NoveltyScore, ProteusError, ProteusResult, ReadId};
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination files of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub clusters: PathBuf,
    pub novelty: PathBuf,
}

pub struct ResultWriter {
    paths: OutputPaths,
}

impl ResultWriter {
    pub fn new(paths: OutputPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Write both tables, overwriting previous results
    pub fn write(
        &self,
        ids: &[ReadId],
        labels: &[ClusterLabel],
        scores: &[NoveltyScore],
    ) -> ProteusResult<()> {
        if ids.len() != labels.len() || ids.len() != scores.len() {
            return Err(ProteusError::InvalidInput(format!(
                "result columns disagree: {} ids, {} labels, {} scores",
                ids.len(),
                labels.len(),
                scores.len()
            )));
        }

        write_cluster_table(&self.paths.clusters, ids, labels)?;
        write_novelty_table(&self.paths.novelty, ids, scores)?;

        info!(
            "Wrote {} rows to {} and {}",
            ids.len(),
            self.paths.clusters.display(),
            self.paths.novelty.display()
        );
        Ok(())
    }
}

fn create_writer(path: &Path) -> ProteusResult<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    csv::Writer::from_path(path).map_err(map_csv)
}

/// `read_id,cluster_id` table
pub fn write_cluster_table(
    path: &Path,
    ids: &[ReadId],
    labels: &[ClusterLabel],
) -> ProteusResult<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["read_id", "cluster_id"]).map_err(map_csv)?;
    for (id, label) in ids.iter().zip(labels) {
        let label = label.to_string();
        writer
            .write_record([id.as_str(), label.as_str()])
            .map_err(map_csv)?;
    }
    writer.flush()?;
    Ok(())
}

/// `read_id,recon_error,cluster_distance` table; a missing structural reference is written as `inf`
pub fn write_novelty_table(
    path: &Path,
    ids: &[ReadId],
    scores: &[NoveltyScore],
) -> ProteusResult<()> {
    let mut writer = create_writer(path)?;
    writer
        .write_record(["read_id", "recon_error", "cluster_distance"])
        .map_err(map_csv)?;
    for (id, score) in ids.iter().zip(scores) {
        let recon = score.recon_error.to_string();
        let distance = score.cluster_distance.to_string();
        writer
            .write_record([id.as_str(), recon.as_str(), distance.as_str()])
            .map_err(map_csv)?;
    }
    writer.flush()?;
    Ok(())
}
