//! Frame-to-classification pipeline for a host compositing application.
//!
//! The host owns the clock: it calls [`FramePipeline::cook`] from its render
//! thread with a [`FrameSource`], and reads the last published result
//! whenever it likes. Each frame goes through
//!
//! 1. capture: GPU readback into resolution-sized staging memory
//!    ([`ReadbackStaging`]), flipped from bottom-up rows to top-down
//! 2. normalize: resize, channel remap, mean/stddev
//! 3. infer: one exclusive pass on the loaded model
//! 4. interpret: arg-max against the label table
//! 5. publish: atomic replace of the latest [`ClassificationResult`]
//!
//! A failing stage aborts only its frame; the previous result stays
//! published and the message is available through
//! [`HostSurface::error_string`].
//!
//! # Usage
//!
//! ```
//! use frameclass_pipeline::{FramePipeline, MemoryFrameSource, PipelineConfig, Resolution};
//!
//! let pipeline = FramePipeline::new(PipelineConfig::default());
//! let mut frame = MemoryFrameSource::solid(Resolution::new(64, 48), [0, 200, 0, 255]);
//!
//! pipeline.request_compute();
//! pipeline.cook(&mut frame);
//! assert_eq!(pipeline.latest().unwrap().class_name, "green");
//! ```
//!
//! [`ClassificationResult`]: frameclass_engine::ClassificationResult

mod config;
mod error;
mod frame;
mod host;
mod orchestrator;
mod readback;
mod state;

pub use config::{ComputePolicy, OverlapPolicy, PipelineConfig};
pub use error::{CaptureError, ConfigError, PipelineError};
pub use frame::{FrameSource, MemoryFrameSource, Resolution, FRAME_CHANNELS};
pub use host::{HostSurface, InfoRow};
pub use orchestrator::{FrameOutcome, FramePipeline, SkipReason};
pub use readback::ReadbackStaging;
pub use state::PipelineState;
