//! frameclass - classify images with the frame pipeline from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ClassifyCommand, ConfigCommand, InspectCommand, ModelsCommand};

/// frameclass - run the frame classification pipeline outside a host.
///
/// Each image is handed to the pipeline exactly as a compositing host would
/// hand over a frame: BGRA, rows bottom-up, one compute request per frame.
///
/// Configuration is stored in ~/.frameclass/config.yaml.
#[derive(Parser)]
#[command(name = "frameclass")]
#[command(about = "Frame classification pipeline CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.frameclass/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Model path or builtin://<id>, overrides the config file
    #[arg(short = 'm', long, global = true)]
    pub model: Option<String>,

    /// Label file, overrides the config file
    #[arg(long, global = true)]
    pub labels: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify image files
    Classify(ClassifyCommand),
    /// Load the configured model and show its graph
    Inspect(InspectCommand),
    /// List built-in models and model formats
    Models(ModelsCommand),
    /// Manage CLI configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Classify(cmd) => cmd.run(&cli),
        Commands::Inspect(cmd) => cmd.run(&cli),
        Commands::Models(cmd) => cmd.run(&cli),
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
