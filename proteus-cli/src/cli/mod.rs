pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "proteus",
    version,
    about = "Latent clustering and novelty scoring for read embeddings",
    long_about = "Proteus trains a variational auto-encoder on per-read embedding vectors, \
                  clusters the learned latent space with HDBSCAN and scores every read by \
                  reconstruction error and distance to the nearest cluster centroid."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster an embedding matrix and score every read
    Run(commands::run::RunArgs),

    /// Create or inspect configuration files
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommand,
    },
}
