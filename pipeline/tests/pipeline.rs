use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use frameclass_engine::backend::LinearBackend;
use frameclass_engine::{
    register_model, Backend, BackendRegistry, Engine, GpuOptions, Graph, GraphInfo,
    InferenceError, InferenceReason, LoadError, ModelConfig, NodeInfo, OutputTensor,
};
use frameclass_pipeline::{
    CaptureError, ComputePolicy, FrameOutcome, FramePipeline, FrameSource, HostSurface,
    MemoryFrameSource, OverlapPolicy, PipelineConfig, PipelineError, Resolution, SkipReason,
};
use frameclass_tensor::{normalize, ByteOrder, NormalizedTensor, PixelBuffer};
use parking_lot::Mutex;

const RED: [u8; 4] = [0, 0, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [255, 0, 0, 255];

fn always() -> PipelineConfig {
    PipelineConfig {
        compute: ComputePolicy::Always,
        ..PipelineConfig::default()
    }
}

fn class_of(outcome: &FrameOutcome) -> &str {
    match outcome {
        FrameOutcome::Classified(r) => &r.class_name,
        other => panic!("expected a classification, got {other:?}"),
    }
}

#[test]
fn classifies_solid_frames() {
    let p = FramePipeline::new(always());
    for (colour, name) in [(RED, "red"), (GREEN, "green"), (BLUE, "blue")] {
        let mut src = MemoryFrameSource::solid(Resolution::new(64, 36), colour);
        assert_eq!(class_of(&p.cook(&mut src)), name);
        assert_eq!(p.latest().unwrap().class_name, name);
    }
    assert_eq!(p.frames_classified(), 3);
}

#[test]
fn classifies_decoded_rgba_image() {
    // Top-down RGBA as an image decoder would hand it over.
    let rgba: Vec<u8> = [200, 10, 10, 255].repeat(20 * 10);
    let mut src = MemoryFrameSource::from_top_down(20, 10, ByteOrder::Rgba, &rgba).unwrap();
    let p = FramePipeline::new(always());
    assert_eq!(class_of(&p.cook(&mut src)), "red");
}

#[test]
fn on_demand_runs_once_per_request() {
    let p = FramePipeline::new(PipelineConfig::default());
    let mut src = MemoryFrameSource::solid(Resolution::new(8, 8), GREEN);

    assert!(matches!(
        p.cook(&mut src),
        FrameOutcome::Skipped(SkipReason::NotRequested)
    ));
    assert!(p.latest().is_none());

    p.request_compute();
    assert_eq!(class_of(&p.cook(&mut src)), "green");
    assert!(matches!(
        p.cook(&mut src),
        FrameOutcome::Skipped(SkipReason::NotRequested)
    ));

    p.set_compute_policy(ComputePolicy::Always);
    assert_eq!(class_of(&p.cook(&mut src)), "green");
    assert_eq!(class_of(&p.cook(&mut src)), "green");
    assert_eq!(p.frames_classified(), 3);
}

#[test]
fn resize_reallocates_and_never_mixes_frames() {
    let p = FramePipeline::new(always());

    let mut big = MemoryFrameSource::solid(Resolution::new(16, 16), RED);
    assert_eq!(class_of(&p.cook(&mut big)), "red");
    assert_eq!(p.readback_reallocations(), 1);

    let mut small = MemoryFrameSource::solid(Resolution::new(8, 4), BLUE);
    let outcome = p.cook(&mut small);
    assert_eq!(class_of(&outcome), "blue");
    assert!(outcome.result().unwrap().confidence > 0.99);
    assert_eq!(p.readback_reallocations(), 2);

    assert_eq!(class_of(&p.cook(&mut small)), "blue");
    assert_eq!(p.readback_reallocations(), 2);

    let mut wide = MemoryFrameSource::solid(Resolution::new(32, 8), GREEN);
    assert_eq!(class_of(&p.cook(&mut wide)), "green");
    assert_eq!(p.readback_reallocations(), 3);
}

// Records every input tensor; always answers "b".
struct RecordingBackend {
    seen: Arc<Mutex<Vec<NormalizedTensor>>>,
}

struct RecordingGraph {
    info: GraphInfo,
    seen: Arc<Mutex<Vec<NormalizedTensor>>>,
}

impl Backend for RecordingBackend {
    fn name(&self) -> &'static str {
        "rec"
    }

    fn load(
        &self,
        _origin: &str,
        _data: &[u8],
        _gpu: &GpuOptions,
    ) -> Result<Box<dyn Graph>, LoadError> {
        Ok(Box::new(RecordingGraph {
            info: GraphInfo {
                inputs: vec![NodeInfo::new("in", vec![1, 5, 7, 3])],
                outputs: vec![NodeInfo::new("out", vec![1, 2])],
                labels: Some(vec!["a".into(), "b".into()]),
            },
            seen: Arc::clone(&self.seen),
        }))
    }
}

impl Graph for RecordingGraph {
    fn info(&self) -> &GraphInfo {
        &self.info
    }

    fn run(
        &mut self,
        _input_node: &str,
        input: &NormalizedTensor,
        _output_node: &str,
    ) -> Result<OutputTensor, InferenceError> {
        self.seen.lock().push(input.clone());
        OutputTensor::new(vec![1, 2], vec![0.25, 0.75])
    }
}

// Top-down BGRA where every pixel differs from its neighbours.
fn pattern(width: usize, height: usize, seed: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let v = ((x * 31 + y * 17) % 256) as u8 ^ seed;
            data.extend_from_slice(&[v, v.wrapping_mul(3), seed.wrapping_add((y * 40) as u8), 255]);
        }
    }
    data
}

#[test]
fn resized_frames_match_a_fresh_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.rec");
    std::fs::write(&path, b"rec").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = BackendRegistry::default();
    registry.register(
        "rec",
        Arc::new(RecordingBackend {
            seen: Arc::clone(&seen),
        }),
    );
    let p = FramePipeline::with_engine(
        PipelineConfig {
            model: ModelConfig::with_path(path.to_str().unwrap()),
            ..always()
        },
        Engine::with_registry(registry),
    );
    let model = p.engine().model().unwrap();

    // Small to big, big to small, and back.
    let sizes = [(6, 5), (13, 9), (3, 7), (13, 9), (2, 2)];
    for (i, (w, h)) in sizes.into_iter().enumerate() {
        let top_down = pattern(w, h, i as u8 * 50);
        let mut src = MemoryFrameSource::from_top_down(w, h, ByteOrder::Bgra, &top_down).unwrap();
        assert_eq!(class_of(&p.cook(&mut src)), "b");

        let fresh = PixelBuffer::new(w, h, ByteOrder::Bgra, top_down).unwrap();
        let want = normalize(&fresh, model.input_shape(), model.mean(), model.stddev()).unwrap();
        let got = seen.lock().last().cloned().unwrap();
        assert_eq!(got, want, "frame {i} ({w}x{h})");
    }
    assert_eq!(seen.lock().len(), sizes.len());
    assert_eq!(p.readback_reallocations(), sizes.len() as u64);
}

#[test]
fn not_ready_keeps_published_result() {
    let p = FramePipeline::new(always());
    let mut src = MemoryFrameSource::solid(Resolution::new(8, 8), RED);
    let before = p.cook(&mut src).result().cloned().unwrap();

    p.engine().unload();
    let mut blue = MemoryFrameSource::solid(Resolution::new(8, 8), BLUE);
    let outcome = p.cook(&mut blue);
    match outcome.error() {
        Some(PipelineError::Inference(e)) => {
            assert_eq!(e.reason, InferenceReason::SessionNotReady)
        }
        other => panic!("expected SessionNotReady, got {other:?}"),
    }
    assert_eq!(p.latest().unwrap(), before);
    assert!(p.error_string().is_some());
    assert_eq!(p.frames_failed(), 1);
}

#[test]
fn failed_reload_keeps_published_result_until_fixed() {
    let p = FramePipeline::new(always());
    let mut src = MemoryFrameSource::solid(Resolution::new(8, 8), GREEN);
    p.cook(&mut src);

    assert!(p.set_model_path("/no/such/model.json").is_err());
    assert!(p.cook(&mut src).error().unwrap().is_not_ready());
    assert_eq!(p.latest().unwrap().class_name, "green");

    p.set_model_path("builtin://dominant-color").unwrap();
    assert_eq!(class_of(&p.cook(&mut src)), "green");
    assert!(p.error_string().is_none());
}

#[test]
fn capture_failure_aborts_frame_only() {
    struct Broken;
    impl FrameSource for Broken {
        fn resolution(&self) -> Option<Resolution> {
            Some(Resolution::new(4, 4))
        }
        fn download(&mut self, _dst: &mut [u8]) -> Result<bool, CaptureError> {
            Err(CaptureError::Source("device lost".into()))
        }
    }

    let p = FramePipeline::new(always());
    let mut good = MemoryFrameSource::solid(Resolution::new(4, 4), BLUE);
    p.cook(&mut good);

    let outcome = p.cook(&mut Broken);
    assert!(matches!(
        outcome.error(),
        Some(PipelineError::Capture(CaptureError::Source(_)))
    ));
    assert_eq!(p.latest().unwrap().class_name, "blue");
    assert_eq!(p.error_string().unwrap(), "capture: device lost");
}

// 2x2 input, identity weights, labels x/y/z. Loaded alternately with the
// 8x8 dominant-color model while frames are running.
static TINY_MODEL: &[u8] = br#"{
    "input": { "name": "pixels", "shape": [1, 2, 2, 3] },
    "output": { "name": "scores" },
    "weights": [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
    "labels": ["x", "y", "z"]
}"#;

#[test]
fn reload_mid_stream_uses_one_model_per_frame() {
    register_model("test-tiny", "json", TINY_MODEL);

    let p = Arc::new(FramePipeline::new(always()));
    let worker = {
        let p = Arc::clone(&p);
        thread::spawn(move || {
            let mut src = MemoryFrameSource::solid(Resolution::new(24, 24), RED);
            let mut names = Vec::new();
            for _ in 0..200 {
                let outcome = p.cook(&mut src);
                names.push(class_of(&outcome).to_string());
            }
            names
        })
    };

    for i in 0..20 {
        let path = if i % 2 == 0 {
            "builtin://test-tiny"
        } else {
            "builtin://dominant-color"
        };
        p.set_model_path(path).unwrap();
        thread::sleep(Duration::from_millis(1));
    }

    let names = worker.join().unwrap();
    assert!(names.iter().all(|n| n == "red" || n == "x"), "{names:?}");
    assert_eq!(p.frames_failed(), 0);
}

// Announces each load, stalls, then loads the graph as json.
struct SlowBackend {
    entered: Mutex<mpsc::Sender<()>>,
}

impl Backend for SlowBackend {
    fn name(&self) -> &'static str {
        "slowload"
    }

    fn load(
        &self,
        origin: &str,
        data: &[u8],
        gpu: &GpuOptions,
    ) -> Result<Box<dyn Graph>, LoadError> {
        let _ = self.entered.lock().send(());
        thread::sleep(Duration::from_millis(300));
        LinearBackend.load(origin, data, gpu)
    }
}

#[test]
fn overlapping_model_changes_install_the_last_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.slowload");
    std::fs::write(&path, TINY_MODEL).unwrap();

    let (entered_tx, entered_rx) = mpsc::channel();
    let mut registry = BackendRegistry::default();
    registry.register(
        "slowload",
        Arc::new(SlowBackend {
            entered: Mutex::new(entered_tx),
        }),
    );
    let p = Arc::new(FramePipeline::with_engine(
        always(),
        Engine::with_registry(registry),
    ));

    let slow = {
        let p = Arc::clone(&p);
        let path = path.to_str().unwrap().to_string();
        thread::spawn(move || p.set_model_path(&path))
    };
    entered_rx.recv().unwrap();
    assert!(p.set_model_path("builtin://dominant-color").unwrap());
    assert!(slow.join().unwrap().unwrap());

    assert_eq!(p.config().model.path, "builtin://dominant-color");
    assert_eq!(
        p.engine().model().unwrap().path(),
        "builtin://dominant-color"
    );
    let mut src = MemoryFrameSource::solid(Resolution::new(8, 8), RED);
    assert_eq!(class_of(&p.cook(&mut src)), "red");
}

// Blocks inside the readback until released.
struct GatedSource {
    frame: MemoryFrameSource,
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl FrameSource for GatedSource {
    fn resolution(&self) -> Option<Resolution> {
        self.frame.resolution()
    }

    fn download(&mut self, dst: &mut [u8]) -> Result<bool, CaptureError> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        self.frame.download(dst)
    }
}

fn gated(colour: [u8; 4]) -> (GatedSource, mpsc::Receiver<()>, mpsc::Sender<()>) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let src = GatedSource {
        frame: MemoryFrameSource::solid(Resolution::new(8, 8), colour),
        entered: entered_tx,
        release: release_rx,
    };
    (src, entered_rx, release_tx)
}

#[test]
fn skip_policy_drops_overlapping_request() {
    let p = Arc::new(FramePipeline::new(always()));
    p.set_overlap_policy(OverlapPolicy::Skip);
    assert_eq!(p.config().overlap, OverlapPolicy::Skip);
    let (mut src, entered, release) = gated(RED);

    let in_flight = {
        let p = Arc::clone(&p);
        thread::spawn(move || p.cook(&mut src))
    };
    entered.recv().unwrap();

    let mut other = MemoryFrameSource::solid(Resolution::new(8, 8), BLUE);
    assert!(matches!(
        p.cook(&mut other),
        FrameOutcome::Skipped(SkipReason::Busy)
    ));

    release.send(()).unwrap();
    assert_eq!(class_of(&in_flight.join().unwrap()), "red");
    assert_eq!(p.latest().unwrap().class_name, "red");
}

#[test]
fn queue_policy_serializes_overlapping_requests() {
    let p = Arc::new(FramePipeline::new(always()));
    let (mut src, entered, release) = gated(RED);

    let first = {
        let p = Arc::clone(&p);
        thread::spawn(move || p.cook(&mut src))
    };
    entered.recv().unwrap();

    let second = {
        let p = Arc::clone(&p);
        thread::spawn(move || {
            let mut other = MemoryFrameSource::solid(Resolution::new(8, 8), BLUE);
            p.cook(&mut other)
        })
    };
    thread::sleep(Duration::from_millis(20));
    assert!(!second.is_finished());
    assert_eq!(p.frames_classified(), 0);

    release.send(()).unwrap();
    assert_eq!(class_of(&first.join().unwrap()), "red");
    assert_eq!(class_of(&second.join().unwrap()), "blue");
    assert_eq!(p.latest().unwrap().class_name, "blue");
}

// A position-sensitive model: scores are the summed top and bottom rows of
// a 2x1 input.
struct RowsBackend;

struct RowsGraph {
    info: GraphInfo,
}

impl Backend for RowsBackend {
    fn name(&self) -> &'static str {
        "rows"
    }

    fn load(
        &self,
        _origin: &str,
        _data: &[u8],
        _gpu: &GpuOptions,
    ) -> Result<Box<dyn Graph>, LoadError> {
        Ok(Box::new(RowsGraph {
            info: GraphInfo {
                inputs: vec![NodeInfo::new("in", vec![1, 2, 1, 3])],
                outputs: vec![NodeInfo::new("out", vec![1, 2])],
                labels: Some(vec!["top".into(), "bottom".into()]),
            },
        }))
    }
}

impl Graph for RowsGraph {
    fn info(&self) -> &GraphInfo {
        &self.info
    }

    fn run(
        &mut self,
        _input_node: &str,
        input: &NormalizedTensor,
        _output_node: &str,
    ) -> Result<OutputTensor, InferenceError> {
        let v = input.values();
        let top: f32 = v[..3].iter().sum();
        let bottom: f32 = v[3..].iter().sum();
        OutputTensor::new(vec![1, 2], vec![top, bottom])
    }
}

#[test]
fn host_rows_are_flipped_to_top_down() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.rows");
    std::fs::write(&path, b"rows").unwrap();

    let mut registry = BackendRegistry::default();
    registry.register("rows", Arc::new(RowsBackend));
    let p = FramePipeline::with_engine(
        PipelineConfig {
            model: ModelConfig::with_path(path.to_str().unwrap()),
            ..always()
        },
        Engine::with_registry(registry),
    );
    assert!(p.error_string().is_none(), "{:?}", p.error_string());

    // Bottom-up host rows: first row delivered is the bottom of the image.
    let rows = [0, 0, 0, 255, 255, 255, 255, 255].to_vec();
    let mut src = MemoryFrameSource::from_bottom_up_bgra(Resolution::new(1, 2), rows).unwrap();
    assert_eq!(class_of(&p.cook(&mut src)), "top");

    let rows = [255, 255, 255, 255, 0, 0, 0, 255].to_vec();
    let mut src = MemoryFrameSource::from_bottom_up_bgra(Resolution::new(1, 2), rows).unwrap();
    assert_eq!(class_of(&p.cook(&mut src)), "bottom");
}
