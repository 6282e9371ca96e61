//! On-disk formats exchanged with the neighbouring pipeline stages

pub mod identifiers;
pub mod npy;
pub mod tables;

pub use identifiers::read_identifiers;
pub use npy::{decode_npy, read_npy, write_npy, NpyDtype, NpyHeader};
pub use tables::{write_cluster_table, write_novelty_table, OutputPaths, ResultWriter};
