//! End-to-end run: load, train, extract, project, cluster, score, write.
//!
//! Stages run strictly in sequence. A single [`RunRng`] seeded from
//! `runtime.seed` is created per run and handed to every stage that draws
//! random numbers, so identical inputs and configuration give identical tables.

use proteus_core::{
    ClusterLabel, EmbeddingMatrix, MatrixStats, NoveltyScore, PipelineConfig, ProteusResult,
    ReadId, RunRng,
};
use proteus_io::{EmbeddingStore, OutputPaths, ResultWriter, Truncation};
use proteus_model::{
    select_device, ClusterOutcome, DensityClusterer, LatentPostprocessor, NoveltyScorer,
    ProjectionChain, ProjectionOutcome, Trainer, TrainingReport, VariationalAutoencoder,
};
use std::path::PathBuf;
use tracing::info;

/// Files a run reads and writes
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub embeddings: PathBuf,
    pub ids: Option<PathBuf>,
    pub outputs: OutputPaths,
}

/// Everything a run computed, in input order
pub struct Analysis {
    pub ids: Vec<ReadId>,
    pub dims: usize,
    pub training: TrainingReport,
    pub recon_errors: Vec<f64>,
    pub latent_stats: MatrixStats,
    pub collapsed: bool,
    pub projection: ProjectionOutcome,
    pub clusters: ClusterOutcome,
    pub scores: Vec<NoveltyScore>,
}

impl Analysis {
    pub fn labels(&self) -> &[ClusterLabel] {
        &self.clusters.labels
    }

    pub fn rows(&self) -> usize {
        self.ids.len()
    }
}

/// Result of [`Pipeline::run`]: the analysis plus what happened on disk
pub struct PipelineRun {
    pub analysis: Analysis,
    pub truncation: Option<Truncation>,
    pub outputs: OutputPaths,
}

pub struct Pipeline {
    config: PipelineConfig,
    show_progress: bool,
}

impl Pipeline {
    /// Validates `config` up front so a bad value fails before any work
    pub fn new(config: PipelineConfig) -> ProteusResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            show_progress: false,
        })
    }

    /// Show the training progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, inputs: &PipelineInputs) -> ProteusResult<PipelineRun> {
        let store = EmbeddingStore::load(&inputs.embeddings, inputs.ids.as_deref())?;
        let truncation = store.truncation();
        let (embeddings, ids) = store.into_parts();

        let analysis = self.analyze(&embeddings, ids)?;

        ResultWriter::new(inputs.outputs.clone()).write(&analysis.ids, analysis.labels(), &analysis.scores)?;

        Ok(PipelineRun {
            analysis,
            truncation,
            outputs: inputs.outputs.clone(),
        })
    }

    /// Run every in-memory stage over aligned embeddings and identifiers
    pub fn analyze(&self, embeddings: &EmbeddingMatrix, ids: Vec<ReadId>) -> ProteusResult<Analysis> {
        let config = &self.config;
        let mut rng = RunRng::seeded(config.runtime.seed);
        let device = select_device(config.runtime.device)?;

        let model = VariationalAutoencoder::new(embeddings.cols(), &config.model, &device, &mut rng)?;
        let training = Trainer::new(config.training.clone())
            .with_progress(self.show_progress)
            .train(&model, embeddings, &mut rng)?;

        info!("Generating latent representations");
        let postprocessor = LatentPostprocessor::new(
            config.training.batch_size,
            config.training.collapse_std_threshold,
            ProjectionChain::detect(&config.reduction),
        );
        let latent = postprocessor.process(&model.inference(), embeddings, &mut rng)?;

        info!("Clustering with HDBSCAN");
        let clusters = DensityClusterer::from_config(&config.clustering).cluster(&latent.projection.matrix)?;

        info!("Computing novelty scores");
        let scores = NoveltyScorer::score(&latent.projection.matrix, &clusters.labels, &latent.recon_errors)?;

        Ok(Analysis {
            ids,
            dims: embeddings.cols(),
            training,
            recon_errors: latent.recon_errors,
            latent_stats: latent.latent_stats,
            collapsed: latent.collapsed,
            projection: latent.projection,
            clusters,
            scores,
        })
    }
}
