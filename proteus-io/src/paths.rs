//! Output file naming derived from the input files of a run
use crate::formats::OutputPaths;
use std::path::{Path, PathBuf};

const EMBEDDINGS_SUFFIX: &str = "_embeddings";
const IDS_SUFFIX: &str = "_dedup_counts";

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Dataset name shared by a run's inputs: the embedding file stem without
/// `_embeddings`, else the identifier file stem without `_dedup_counts`
pub fn base_name(embeddings: Option<&Path>, ids: Option<&Path>) -> String {
    if let Some(path) = embeddings {
        let name = stem(path);
        return name
            .strip_suffix(EMBEDDINGS_SUFFIX)
            .map(str::to_string)
            .unwrap_or(name);
    }
    if let Some(path) = ids {
        let name = stem(path);
        return name.strip_suffix(IDS_SUFFIX).map(str::to_string).unwrap_or(name);
    }
    "default".to_string()
}

/// `<dir>/<base>_clusters.csv` and `<dir>/<base>_novelty_scores.csv`
///
/// `dir` is `output_dir` when given, otherwise the directory of the embedding
/// (or identifier) file.
pub fn derive_output_paths(
    embeddings: Option<&Path>,
    ids: Option<&Path>,
    output_dir: Option<&Path>,
) -> OutputPaths {
    let base = base_name(embeddings, ids);
    let dir: PathBuf = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => embeddings
            .or(ids)
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("data/processed")),
    };

    OutputPaths {
        clusters: dir.join(format!("{}_clusters.csv", base)),
        novelty: dir.join(format!("{}_novelty_scores.csv", base)),
    }
}
