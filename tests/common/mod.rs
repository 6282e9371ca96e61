//! Common setup for the Proteus integration tests
//!
//! Configurations here keep the real pipeline shape but shrink the model and
//! the optimization loops.
#![allow(dead_code)]

use proteus::{Pipeline, PipelineInputs, PipelineRun};
use proteus_core::{DeviceChoice, EmbeddingMatrix, PipelineConfig, ReadId};
use proteus_io::derive_output_paths;
use proteus_test::{Result, TestEnvironment};

/// Small, CPU-only configuration with default clustering parameters
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.model.latent_dim = 8;
    config.model.hidden_dim = 32;
    config.training.epochs = 3;
    config.training.beta_warmup_epochs = 2;
    config.reduction.manifold_epochs = 30;
    config.runtime.device = DeviceChoice::Cpu;
    config
}

/// Write `matrix` (and `ids`, when given) into the environment under `name`
pub fn stage_inputs(
    env: &TestEnvironment,
    name: &str,
    matrix: &EmbeddingMatrix,
    ids: Option<&[ReadId]>,
) -> Result<PipelineInputs> {
    let embeddings = env.write_embeddings(name, matrix)?;
    let ids = ids.map(|ids| env.write_ids(name, ids)).transpose()?;
    let outputs_dir = env.outputs_dir();
    let outputs = derive_output_paths(Some(&embeddings), ids.as_deref(), Some(&outputs_dir));

    Ok(PipelineInputs {
        embeddings,
        ids,
        outputs,
    })
}

pub fn run(config: PipelineConfig, inputs: &PipelineInputs) -> Result<PipelineRun> {
    Ok(Pipeline::new(config)?.run(inputs)?)
}
