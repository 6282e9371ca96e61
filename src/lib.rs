//! Latent clustering and novelty scoring for sequence-read embeddings
//!
//! A variational auto-encoder learns a compact latent space for the reads'
//! embeddings; the standardized latent means are projected, clustered by
//! density, and every read receives a cluster label and a two-part novelty
//! score (reconstruction error, distance to the nearest cluster centroid).

pub mod pipeline;
pub mod summary;

pub use pipeline::{Analysis, Pipeline, PipelineInputs, PipelineRun};
pub use summary::RunSummary;

pub use proteus_core as core;
pub use proteus_io as io;
pub use proteus_model as model;
