//! Configuration management commands.

use clap::{Args, Subcommand};

use frameclass_pipeline::PipelineConfig;

use super::{config_path, output_result, pipeline_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Configuration is stored in ~/.frameclass/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Show the effective configuration, overrides applied
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = pipeline_config(cli)?;
                output_result(&cfg, cli.output.as_deref(), cli.json)
            }

            ConfigSubcommand::Init { force } => {
                let path = config_path(cli)?;
                if path.exists() && !force {
                    anyhow::bail!("{} already exists, use --force to overwrite", path.display());
                }
                PipelineConfig::default().save(&path)?;
                print_success(&format!("Wrote {}", path.display()));
                Ok(())
            }

            ConfigSubcommand::Path => {
                println!("{}", config_path(cli)?.display());
                Ok(())
            }
        }
    }
}
