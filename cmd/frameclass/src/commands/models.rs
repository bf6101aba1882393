//! Built-in model listing.

use clap::Args;
use serde::Serialize;

use frameclass_engine::{list_models, BackendRegistry, BUILTIN_SCHEME};

use super::output_result;
use crate::Cli;

/// List built-in models and the model formats this build can load.
#[derive(Args)]
pub struct ModelsCommand {}

#[derive(Serialize)]
struct ModelsOutput {
    builtin: Vec<String>,
    formats: Vec<String>,
}

impl ModelsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let out = ModelsOutput {
            builtin: list_models()
                .into_iter()
                .map(|id| format!("{BUILTIN_SCHEME}{id}"))
                .collect(),
            formats: BackendRegistry::default().formats(),
        };
        output_result(&out, cli.output.as_deref(), cli.json)
    }
}
