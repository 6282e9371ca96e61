use crate::cli::commands::effective_config;
use crate::cli::output::{cluster_table, format_number, info, section_header, success, tree_item, warning};
use anyhow::{Context, Result};
use clap::Args;
use proteus::{Pipeline, PipelineInputs, PipelineRun, RunSummary};
use proteus_core::{DeviceChoice, PipelineConfig};
use proteus_io::derive_output_paths;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Embedding matrix (.npy, one row per read)
    #[arg(short = 'e', long, value_name = "NPY")]
    pub embeddings: PathBuf,

    /// Read identifier table (CSV, identifiers in the first column)
    #[arg(short = 'i', long, value_name = "CSV")]
    pub ids: Option<PathBuf>,

    /// Directory for both result tables (defaults to the embedding file's directory)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Explicit path of the cluster table
    #[arg(long, value_name = "CSV")]
    pub clusters: Option<PathBuf>,

    /// Explicit path of the novelty table
    #[arg(long, value_name = "CSV")]
    pub novelty: Option<PathBuf>,

    /// Configuration file
    #[arg(short = 'c', long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Write a JSON run summary
    #[arg(long, value_name = "JSON")]
    pub summary: Option<PathBuf>,

    /// Override runtime.seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override training.epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Skip the manifold projection tier
    #[arg(long)]
    pub no_manifold: bool,

    /// Override runtime.device
    #[arg(long, value_enum)]
    pub device: Option<DeviceChoice>,

    /// Print nothing but errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl RunArgs {
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(seed) = self.seed {
            config.runtime.seed = seed;
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if self.no_manifold {
            config.reduction.manifold_enabled = false;
        }
        if let Some(device) = self.device {
            config.runtime.device = device;
        }
    }

    fn inputs(&self) -> PipelineInputs {
        let mut outputs = derive_output_paths(
            Some(&self.embeddings),
            self.ids.as_deref(),
            self.output_dir.as_deref(),
        );
        if let Some(path) = &self.clusters {
            outputs.clusters = path.clone();
        }
        if let Some(path) = &self.novelty {
            outputs.novelty = path.clone();
        }

        PipelineInputs {
            embeddings: self.embeddings.clone(),
            ids: self.ids.clone(),
            outputs,
        }
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut config = effective_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    let inputs = args.inputs();

    if !args.quiet {
        section_header("Proteus latent clustering");
        tree_item(false, "Embeddings", &inputs.embeddings.display().to_string());
        tree_item(
            false,
            "Identifiers",
            &inputs
                .ids
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "row indices".to_string()),
        );
        tree_item(false, "Epochs", &config.training.epochs.to_string());
        tree_item(true, "Seed", &config.runtime.seed.to_string());
    }

    let pipeline = Pipeline::new(config.clone())?.with_progress(!args.quiet);
    let result = pipeline.run(&inputs)?;

    if let Some(path) = &args.summary {
        RunSummary::from_run(&result, &inputs, &config)
            .write(path)
            .with_context(|| format!("Failed to write run summary {}", path.display()))?;
    }

    if !args.quiet {
        report(&result, args.summary.as_ref());
    }
    Ok(())
}

fn report(result: &PipelineRun, summary: Option<&PathBuf>) {
    let analysis = &result.analysis;

    if let Some(t) = result.truncation {
        warning(&format!(
            "{} embeddings and {} identifiers; kept the first {}",
            format_number(t.embeddings),
            format_number(t.identifiers),
            format_number(t.kept)
        ));
    }
    if analysis.collapsed {
        warning("Latent space collapsed; clusters are unlikely to be meaningful");
    }

    let projection = &analysis.projection;
    if projection.fell_back() {
        for failure in &projection.failures {
            warning(&format!("{} projection skipped: {}", failure.tier, failure.reason));
        }
    }
    info(&format!(
        "Clustered {} reads in a {}-dimensional {} projection",
        format_number(analysis.rows()),
        projection.matrix.ncols(),
        projection.tier
    ));

    section_header("Clusters");
    println!("{}", cluster_table(&analysis.clusters.summary));

    success(&format!("Cluster table: {}", result.outputs.clusters.display()));
    success(&format!("Novelty table: {}", result.outputs.novelty.display()));
    if let Some(path) = summary {
        success(&format!("Run summary: {}", path.display()));
    }
}
