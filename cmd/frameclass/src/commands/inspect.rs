//! Model inspection command.

use clap::Args;
use serde::Serialize;

use frameclass_engine::{Engine, GraphInfo};
use frameclass_tensor::TargetShape;

use super::{output_result, pipeline_config};
use crate::Cli;

/// Load the configured model and show what it declares.
#[derive(Args)]
pub struct InspectCommand {
    /// Print every label instead of the first few
    #[arg(long)]
    all_labels: bool,
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    path: &'a str,
    backend: &'a str,
    input_node: &'a str,
    output_node: &'a str,
    input_shape: TargetShape,
    mean: f32,
    stddev: f32,
    classes: usize,
    labels: Vec<&'a str>,
    graph: &'a GraphInfo,
}

const LABEL_PREVIEW: usize = 10;

impl InspectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = pipeline_config(cli)?;
        let engine = Engine::new();
        let model = engine.load(&cfg.model)?;

        let take = if self.all_labels {
            usize::MAX
        } else {
            LABEL_PREVIEW
        };
        let out = InspectOutput {
            path: model.path(),
            backend: model.backend(),
            input_node: model.input_node(),
            output_node: model.output_node(),
            input_shape: model.input_shape(),
            mean: model.mean(),
            stddev: model.stddev(),
            classes: model.labels().len(),
            labels: model.labels().iter().take(take).collect(),
            graph: model.graph_info(),
        };
        output_result(&out, cli.output.as_deref(), cli.json)
    }
}
