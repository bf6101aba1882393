//! Per-frame sequencing: capture, normalize, infer, interpret, publish.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use frameclass_engine::{interpret, ClassificationResult, Engine, LoadError, Model, ModelConfig};
use frameclass_tensor::{normalize, PixelBuffer};
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, trace, warn};

use crate::config::{ComputePolicy, OverlapPolicy, PipelineConfig};
use crate::error::PipelineError;
use crate::frame::FrameSource;
use crate::readback::ReadbackStaging;
use crate::state::{AtomicState, PipelineState};

/// Why a frame did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// On-demand policy and no compute request pending.
    NotRequested,
    /// Another frame was in flight and the overlap policy is `skip`.
    Busy,
    /// Nothing connected to the input.
    NoInput,
    /// The host produced no pixels this frame.
    NoPixels,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NotRequested => "not requested",
            SkipReason::Busy => "busy",
            SkipReason::NoInput => "no input",
            SkipReason::NoPixels => "no pixels",
        })
    }
}

/// What one call to [`FramePipeline::cook`] did.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// A new result was published.
    Classified(Arc<ClassificationResult>),
    Skipped(SkipReason),
    /// A stage failed. The previously published result is unchanged.
    Failed(PipelineError),
}

impl FrameOutcome {
    pub fn result(&self) -> Option<&Arc<ClassificationResult>> {
        match self {
            FrameOutcome::Classified(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            FrameOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

enum Capture {
    Frame(PixelBuffer),
    Skip(SkipReason),
}

/// Turns host frames into published classification results.
///
/// The host calls [`cook`](Self::cook) from its render thread. At most one
/// frame runs at a time; overlapping calls queue or skip per
/// [`OverlapPolicy`]. A frame runs normalize, infer and interpret inside a
/// single exclusive engine pass, so a concurrent model reload is seen
/// either not at all or in full.
///
/// A pipeline whose model failed to load is still usable: every frame fails
/// with `SessionNotReady` until a reload succeeds.
pub struct FramePipeline {
    config: RwLock<PipelineConfig>,
    engine: Engine,
    // Held for the whole frame; doubles as the frame lock.
    staging: Mutex<ReadbackStaging>,
    state: AtomicState,
    demand: AtomicBool,
    published: RwLock<Option<Arc<ClassificationResult>>>,
    last_error: RwLock<Option<String>>,
    // Serializes model config changes with the loads they trigger.
    reloading: Mutex<()>,
    classified: AtomicU64,
    failed: AtomicU64,
}

impl FramePipeline {
    /// Creates a pipeline and loads the configured model.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_engine(config, Engine::new())
    }

    /// Like [`new`](Self::new) with a caller-supplied engine, e.g. one with
    /// extra backends registered.
    pub fn with_engine(config: PipelineConfig, engine: Engine) -> Self {
        let pipeline = Self {
            config: RwLock::new(config),
            engine,
            staging: Mutex::new(ReadbackStaging::new()),
            state: AtomicState::default(),
            demand: AtomicBool::new(false),
            published: RwLock::new(None),
            last_error: RwLock::new(None),
            reloading: Mutex::new(()),
            classified: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        };
        // A load failure is recorded in last_error; the pipeline stays inert.
        let _ = pipeline.reload();
        pipeline
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> PipelineConfig {
        self.config.read().clone()
    }

    /// Marks the next frame as requested under the on-demand policy.
    pub fn request_compute(&self) {
        self.demand.store(true, Ordering::Release);
    }

    pub fn set_compute_policy(&self, policy: ComputePolicy) {
        self.config.write().compute = policy;
    }

    pub fn set_overlap_policy(&self, policy: OverlapPolicy) {
        self.config.write().overlap = policy;
    }

    /// Replaces the model configuration and reloads.
    pub fn set_model_config(&self, model: ModelConfig) -> Result<Arc<Model>, LoadError> {
        let _reload = self.reloading.lock();
        self.config.write().model = model;
        self.load_configured()
    }

    /// Passes the current model configuration to `update`; if it returns a
    /// new one, installs it and reloads. Returns the loaded model, or `None`
    /// when nothing changed.
    ///
    /// Config changes and reloads apply one at a time in call order, so the
    /// installed session always belongs to the configured model.
    pub fn update_model_config(
        &self,
        update: impl FnOnce(&ModelConfig) -> Option<ModelConfig>,
    ) -> Result<Option<Arc<Model>>, LoadError> {
        let _reload = self.reloading.lock();
        let Some(model) = update(&self.config.read().model) else {
            return Ok(None);
        };
        self.config.write().model = model;
        self.load_configured().map(Some)
    }

    /// Loads the configured model and swaps it in, waiting for any frame in
    /// flight. On failure the engine is left without a session and the error
    /// is kept for [`last_error`](Self::last_error); the published result is
    /// kept either way.
    pub fn reload(&self) -> Result<Arc<Model>, LoadError> {
        let _reload = self.reloading.lock();
        self.load_configured()
    }

    // Caller holds `reloading`.
    fn load_configured(&self) -> Result<Arc<Model>, LoadError> {
        let cfg = self.config.read().model.clone();
        match self.engine.load(&cfg) {
            Ok(model) => {
                *self.last_error.write() = None;
                info!(path = model.path(), "pipeline model ready");
                Ok(model)
            }
            Err(e) => {
                warn!(error = %e, "pipeline model unavailable");
                *self.last_error.write() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Runs one frame if the compute policy allows it.
    pub fn cook(&self, source: &mut dyn FrameSource) -> FrameOutcome {
        let (compute, overlap) = {
            let cfg = self.config.read();
            (cfg.compute, cfg.overlap)
        };
        let on_demand = compute == ComputePolicy::OnDemand;
        if on_demand && !self.demand.load(Ordering::Acquire) {
            return FrameOutcome::Skipped(SkipReason::NotRequested);
        }

        let Some(mut staging) = self.lock_frame(overlap) else {
            debug!("frame in flight, request skipped");
            return FrameOutcome::Skipped(SkipReason::Busy);
        };
        // Another caller may have taken the request while we waited.
        if on_demand && !self.demand.swap(false, Ordering::AcqRel) {
            return FrameOutcome::Skipped(SkipReason::NotRequested);
        }

        let outcome = match self.capture(&mut staging, source) {
            Ok(Capture::Skip(reason)) => FrameOutcome::Skipped(reason),
            Ok(Capture::Frame(pixels)) => match self.classify(pixels) {
                Ok(result) => self.publish(result),
                Err(e) => self.fail(e),
            },
            Err(e) => self.fail(e),
        };
        self.transition(PipelineState::Idle);
        outcome
    }

    fn lock_frame(&self, overlap: OverlapPolicy) -> Option<MutexGuard<'_, ReadbackStaging>> {
        match overlap {
            OverlapPolicy::Queue => Some(self.staging.lock()),
            OverlapPolicy::Skip => self.staging.try_lock(),
        }
    }

    fn capture(
        &self,
        staging: &mut ReadbackStaging,
        source: &mut dyn FrameSource,
    ) -> Result<Capture, PipelineError> {
        self.transition(PipelineState::CapturingFrame);
        let Some(resolution) = source.resolution() else {
            return Ok(Capture::Skip(SkipReason::NoInput));
        };
        staging.ensure(resolution)?;
        if !source.download(staging.buffer_mut())? {
            return Ok(Capture::Skip(SkipReason::NoPixels));
        }
        Ok(Capture::Frame(staging.to_pixel_buffer()?))
    }

    fn classify(&self, pixels: PixelBuffer) -> Result<ClassificationResult, PipelineError> {
        self.engine.run(|session| -> Result<ClassificationResult, PipelineError> {
            let model = Arc::clone(session.model());

            self.transition(PipelineState::Normalizing);
            let tensor = normalize(&pixels, model.input_shape(), model.mean(), model.stddev())?;
            drop(pixels);

            self.transition(PipelineState::Inferring);
            let output = session.infer(tensor)?;

            self.transition(PipelineState::Interpreting);
            Ok(interpret(&output, model.labels())?)
        })?
    }

    fn publish(&self, result: ClassificationResult) -> FrameOutcome {
        let result = Arc::new(result);
        debug!(
            class = %result.class_name,
            index = result.class_index,
            confidence = result.confidence,
            "frame classified"
        );
        *self.published.write() = Some(Arc::clone(&result));
        *self.last_error.write() = None;
        self.classified.fetch_add(1, Ordering::Relaxed);
        FrameOutcome::Classified(result)
    }

    fn fail(&self, err: PipelineError) -> FrameOutcome {
        warn!(state = %self.state.load(), error = %err, "frame aborted");
        *self.last_error.write() = Some(err.to_string());
        self.failed.fetch_add(1, Ordering::Relaxed);
        FrameOutcome::Failed(err)
    }

    fn transition(&self, next: PipelineState) {
        let prev = self.state.swap(next);
        trace!(from = %prev, to = %next, "pipeline state");
    }

    /// The last published result. Never torn: readers get a whole result or
    /// none.
    pub fn latest(&self) -> Option<Arc<ClassificationResult>> {
        self.published.read().clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state.load()
    }

    /// Message of the most recent load or frame failure, cleared by the next
    /// success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn frames_classified(&self) -> u64 {
        self.classified.load(Ordering::Relaxed)
    }

    pub fn frames_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// How many times the readback staging was sized for a new resolution.
    pub fn readback_reallocations(&self) -> u64 {
        self.staging.lock().reallocations()
    }
}
