//! Image classification command.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use frameclass_pipeline::{FrameOutcome, FramePipeline, MemoryFrameSource};
use frameclass_tensor::ByteOrder;

use super::{display_path, output_result, pipeline_config, print_error, print_verbose};
use crate::Cli;

/// Classify image files.
///
/// Supports PNG, JPEG and BMP. Every image goes through the same pipeline
/// instance, so a change of size between images exercises the readback
/// reallocation a host would see.
#[derive(Args)]
pub struct ClassifyCommand {
    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ClassifyRow {
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ClassifyRow {
    fn failed(image: &Path, error: impl ToString) -> Self {
        Self {
            image: display_path(image),
            class: None,
            index: None,
            confidence: None,
            error: Some(error.to_string()),
        }
    }
}

impl ClassifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = pipeline_config(cli)?;
        print_verbose(cli, &format!("Model: {}", cfg.model.path));

        let pipeline = FramePipeline::new(cfg);
        if let Some(err) = pipeline.last_error() {
            anyhow::bail!("{err}");
        }

        let mut rows = Vec::with_capacity(self.images.len());
        let mut failures = 0;
        for path in &self.images {
            let row = match classify_one(&pipeline, path) {
                Ok(row) => row,
                Err(e) => ClassifyRow::failed(path, e),
            };
            if let Some(err) = &row.error {
                print_error(&format!("{}: {}", path.display(), err));
                failures += 1;
            }
            rows.push(row);
        }

        output_result(&rows, cli.output.as_deref(), cli.json)?;
        if failures > 0 {
            anyhow::bail!("{failures} of {} images failed", self.images.len());
        }
        Ok(())
    }
}

fn classify_one(pipeline: &FramePipeline, path: &Path) -> anyhow::Result<ClassifyRow> {
    let img = image::open(path)?.to_rgba8();
    let (width, height) = (img.width() as usize, img.height() as usize);
    let mut frame = MemoryFrameSource::from_top_down(width, height, ByteOrder::Rgba, img.as_raw())?;

    pipeline.request_compute();
    let row = match pipeline.cook(&mut frame) {
        FrameOutcome::Classified(r) => ClassifyRow {
            image: display_path(path),
            class: Some(r.class_name.clone()),
            index: Some(r.class_index),
            confidence: Some(r.confidence),
            error: None,
        },
        FrameOutcome::Skipped(reason) => ClassifyRow::failed(path, format!("skipped: {reason}")),
        FrameOutcome::Failed(e) => ClassifyRow::failed(path, e),
    };
    Ok(row)
}
