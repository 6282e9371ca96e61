//! Input loading and result writing for Proteus

pub mod formats;
pub mod paths;
pub mod store;

// Re-export commonly used types
pub use formats::{read_identifiers, read_npy, write_npy, NpyDtype, OutputPaths, ResultWriter};
pub use paths::derive_output_paths;
pub use store::{EmbeddingStore, Truncation};
