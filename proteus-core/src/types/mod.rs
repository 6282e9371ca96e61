//! Core types shared across all Proteus crates
pub mod cluster;
pub mod embedding;
pub mod read;

// Re-export commonly used types at module level
pub use cluster::{ClusterLabel, ClusterSummary, NoveltyScore, NOISE_LABEL};
pub use embedding::{EmbeddingMatrix, MatrixStats};
pub use read::ReadId;
