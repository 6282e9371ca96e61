//! Readers and assertions for the result tables

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    pub read_id: String,
    pub cluster_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoveltyRow {
    pub read_id: String,
    pub recon_error: f64,
    pub cluster_distance: f64,
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::Reader::from_path(path).with_context(|| format!("Failed to open {}", path.display()))
}

pub fn read_cluster_table(path: impl AsRef<Path>) -> Result<Vec<ClusterRow>> {
    let path = path.as_ref();
    let mut reader = reader(path)?;
    let headers = reader.headers()?.clone();
    anyhow::ensure!(
        headers.iter().collect::<Vec<_>>() == ["read_id", "cluster_id"],
        "unexpected cluster table header: {:?}",
        headers
    );

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(ClusterRow {
            read_id: record[0].to_string(),
            cluster_id: record[1].parse().context("cluster_id is not an integer")?,
        });
    }
    Ok(rows)
}

pub fn read_novelty_table(path: impl AsRef<Path>) -> Result<Vec<NoveltyRow>> {
    let path = path.as_ref();
    let mut reader = reader(path)?;
    let headers = reader.headers()?.clone();
    anyhow::ensure!(
        headers.iter().collect::<Vec<_>>() == ["read_id", "recon_error", "cluster_distance"],
        "unexpected novelty table header: {:?}",
        headers
    );

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(NoveltyRow {
            read_id: record[0].to_string(),
            recon_error: record[1].parse().context("recon_error is not a number")?,
            cluster_distance: record[2].parse().context("cluster_distance is not a number")?,
        });
    }
    Ok(rows)
}

/// Assert both tables list the same reads in the same order
pub fn assert_tables_aligned(clusters: &[ClusterRow], novelty: &[NoveltyRow]) {
    assert_eq!(
        clusters.len(),
        novelty.len(),
        "cluster table has {} rows, novelty table has {}",
        clusters.len(),
        novelty.len()
    );
    for (i, (c, n)) in clusters.iter().zip(novelty).enumerate() {
        assert_eq!(c.read_id, n.read_id, "tables disagree on read order at row {}", i);
    }
}
