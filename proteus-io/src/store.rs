//! Embedding matrix loading and identifier alignment

use crate::formats::{read_identifiers, read_npy};
use proteus_core::{EmbeddingMatrix, ProteusError, ProteusResult, ReadId};
use std::path::Path;
use tracing::{info, warn};

/// Row counts involved when identifiers and embeddings disagreed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    pub embeddings: usize,
    pub identifiers: usize,
    pub kept: usize,
}

/// Embeddings and identifiers, aligned 1:1 by position
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    embeddings: EmbeddingMatrix,
    ids: Vec<ReadId>,
    truncation: Option<Truncation>,
}

impl EmbeddingStore {
    /// Load the embedding matrix and, when available, the identifier table.
    ///
    /// A missing or unreadable embedding file is an error. When `ids` is `None`
    /// or names a file that does not exist, identifiers default to `"0".."N-1"`.
    pub fn load(embeddings: &Path, ids: Option<&Path>) -> ProteusResult<Self> {
        info!("Loading embeddings from {}", embeddings.display());
        let matrix = read_npy(embeddings)?;

        let identifiers = match ids {
            Some(path) if path.exists() => {
                info!("Loading read identifiers from {}", path.display());
                read_identifiers(path)?
            }
            Some(path) => {
                warn!(
                    "Identifier table {} not found; using row indices as read ids",
                    path.display()
                );
                ReadId::positional(matrix.rows())
            }
            None => {
                warn!("No identifier table given; using row indices as read ids");
                ReadId::positional(matrix.rows())
            }
        };

        Self::from_parts(matrix, identifiers)
    }

    /// Align already-loaded parts, truncating both to the shorter length
    pub fn from_parts(mut embeddings: EmbeddingMatrix, mut ids: Vec<ReadId>) -> ProteusResult<Self> {
        let mut truncation = None;
        if ids.len() != embeddings.rows() {
            let kept = ids.len().min(embeddings.rows());
            warn!(
                "len(read_ids) ({}) != len(embeddings) ({}); truncating both to {}",
                ids.len(),
                embeddings.rows(),
                kept
            );
            truncation = Some(Truncation {
                embeddings: embeddings.rows(),
                identifiers: ids.len(),
                kept,
            });
            ids.truncate(kept);
            embeddings.truncate(kept);
        }

        if embeddings.is_empty() {
            return Err(ProteusError::InvalidInput(
                "no embeddings left to process after alignment".into(),
            ));
        }
        if embeddings.cols() == 0 {
            return Err(ProteusError::InvalidInput("embeddings have zero columns".into()));
        }

        let stats = embeddings.stats();
        info!(
            "Loaded {} embeddings with {} dimensions (min={:.3}, max={:.3}, mean={:.3}, std={:.3})",
            embeddings.rows(),
            embeddings.cols(),
            stats.min,
            stats.max,
            stats.mean,
            stats.std
        );

        Ok(Self {
            embeddings,
            ids,
            truncation,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.embeddings.cols()
    }

    pub fn embeddings(&self) -> &EmbeddingMatrix {
        &self.embeddings
    }

    pub fn ids(&self) -> &[ReadId] {
        &self.ids
    }

    pub fn truncation(&self) -> Option<Truncation> {
        self.truncation
    }

    pub fn into_parts(self) -> (EmbeddingMatrix, Vec<ReadId>) {
        (self.embeddings, self.ids)
    }
}
