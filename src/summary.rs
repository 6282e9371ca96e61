//! JSON record of one pipeline run

use crate::pipeline::{PipelineInputs, PipelineRun};
use chrono::{DateTime, Utc};
use proteus_core::{MatrixStats, PipelineConfig, ProteusResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub inputs: InputSummary,
    pub outputs: OutputSummary,
    pub truncation: Option<TruncationSummary>,
    pub training: Option<EpochSummary>,
    pub latent: LatentSummary,
    pub projection: ProjectionSummary,
    pub clustering: ClusteringSummary,
    pub config: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSummary {
    pub embeddings: PathBuf,
    pub ids: Option<PathBuf>,
    pub rows: usize,
    pub dims: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSummary {
    pub clusters: PathBuf,
    pub novelty: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncationSummary {
    pub embeddings: usize,
    pub identifiers: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub beta: f64,
    pub recon: f64,
    pub kl: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentSummary {
    pub stats: MatrixStats,
    pub collapsed: bool,
    pub recon_error: MatrixStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub tier: String,
    pub width: usize,
    pub failed_attempts: Vec<FailedAttemptSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttemptSummary {
    pub tier: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringSummary {
    pub clusters: usize,
    /// Members per label
    pub sizes: BTreeMap<i32, usize>,
    pub noise: usize,
}

impl RunSummary {
    pub fn from_run(run: &PipelineRun, inputs: &PipelineInputs, config: &PipelineConfig) -> Self {
        let analysis = &run.analysis;
        let projection = &analysis.projection;

        Self {
            generated_at: Utc::now(),
            version: proteus_core::VERSION.to_string(),
            inputs: InputSummary {
                embeddings: inputs.embeddings.clone(),
                ids: inputs.ids.clone(),
                rows: analysis.rows(),
                dims: analysis.dims,
            },
            outputs: OutputSummary {
                clusters: run.outputs.clusters.clone(),
                novelty: run.outputs.novelty.clone(),
            },
            truncation: run.truncation.map(|t| TruncationSummary {
                embeddings: t.embeddings,
                identifiers: t.identifiers,
                kept: t.kept,
            }),
            training: analysis.training.final_epoch().map(|e| EpochSummary {
                epoch: e.epoch,
                beta: e.beta,
                recon: e.recon,
                kl: e.kl,
                total: e.total,
            }),
            latent: LatentSummary {
                stats: analysis.latent_stats,
                collapsed: analysis.collapsed,
                recon_error: MatrixStats::from_values(analysis.recon_errors.iter().copied()),
            },
            projection: ProjectionSummary {
                tier: projection.tier.to_string(),
                width: projection.matrix.ncols(),
                failed_attempts: projection
                    .failures
                    .iter()
                    .map(|f| FailedAttemptSummary {
                        tier: f.tier.to_string(),
                        reason: f.reason.clone(),
                    })
                    .collect(),
            },
            clustering: ClusteringSummary {
                clusters: analysis.clusters.summary.cluster_count(),
                sizes: analysis.clusters.summary.sizes.clone(),
                noise: analysis.clusters.summary.noise,
            },
            config: config.clone(),
        }
    }

    pub fn write(&self, path: &Path) -> ProteusResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> ProteusResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
