use crate::cli::commands::effective_config;
use crate::cli::output::success;
use anyhow::{Context, Result};
use clap::Subcommand;
use proteus_core::{save_config, PipelineConfig, ProteusError};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the default configuration to a file
    Init {
        #[arg(short, long, default_value = "proteus.toml", value_name = "TOML")]
        output: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        #[arg(short, long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init { output, force } => {
            if output.exists() && !force {
                return Err(ProteusError::Configuration(format!(
                    "{} already exists (use --force to replace it)",
                    output.display()
                ))
                .into());
            }
            save_config(&output, &PipelineConfig::default())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            success(&format!("Wrote default configuration to {}", output.display()));
        }
        ConfigCommand::Show { config } => {
            let config = effective_config(config.as_deref())?;
            config.validate()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
