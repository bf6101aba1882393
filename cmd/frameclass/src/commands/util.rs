//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};

use frameclass_pipeline::PipelineConfig;

use crate::Cli;

const APP_DIR: &str = ".frameclass";
const CONFIG_FILE: &str = "config.yaml";

/// Returns ~/.frameclass/config.yaml.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR).join(CONFIG_FILE))
}

/// The config file in effect: `--config`, else the default location.
pub fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(PathBuf::from(path)),
        None => default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine home directory, use --config")),
    }
}

/// Reads the config file. A missing default file yields the defaults; a
/// missing `--config` file is an error.
pub fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let path = config_path(cli)?;
    if !path.exists() {
        if cli.config.is_some() {
            anyhow::bail!("config file {} not found", path.display());
        }
        return Ok(PipelineConfig::default());
    }
    Ok(PipelineConfig::load(&path)?)
}

/// The config file with command-line overrides applied.
pub fn pipeline_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut cfg = load_config(cli)?;
    apply_overrides(&mut cfg, cli.model.as_deref(), cli.labels.as_deref());
    Ok(cfg)
}

fn apply_overrides(cfg: &mut PipelineConfig, model: Option<&str>, labels: Option<&str>) {
    if let Some(model) = model {
        cfg.model.path = model.to_string();
    }
    if let Some(labels) = labels {
        cfg.model.labels = Some(PathBuf::from(labels));
    }
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => std::fs::write(path, output)?,
        None => print!("{}", output),
    }

    Ok(())
}

/// Display form of a path for output rows.
pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}
