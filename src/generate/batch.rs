use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};

use crate::draw::tool::{Tool, ToolConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Canvas, Point, Rect};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::frame::frame::Frame;
use crate::frame::store::{FrameStore, build_thread_pool};
use crate::generate::rng::Rng64;
use crate::geometry::shape::GeometryShape;
use crate::raster::bitmap::Bitmap;
use crate::raster::cpu::{StrokeOp, StrokeShape, rasterize_onto};

/// Shapes a generated animation may use; one is picked per run.
pub const GENERATED_SHAPES: [GeometryShape; 3] = [
    GeometryShape::Circle,
    GeometryShape::Square,
    GeometryShape::Triangle,
];

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GeneratorOpts {
    /// Frames per chunk; each chunk moves the shape towards one new random target.
    pub chunk_size: usize,
    pub min_size: f64,
    pub max_size: f64,
    pub max_count: usize,
    pub threads: Option<usize>,
    /// Fixed seed for reproducible output.
    pub seed: Option<u64>,
}

impl Default for GeneratorOpts {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            min_size: 10.0,
            max_size: 250.0,
            max_count: 100_000,
            threads: None,
            seed: None,
        }
    }
}

/// How a generation run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed { frames: usize },
    Cancelled,
}

/// Position and edge length of the generated shape at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub origin: Point,
    pub size: f64,
}

impl Keyframe {
    pub fn rect(self) -> Rect {
        Rect::from_origin_size(self.origin, (self.size, self.size))
    }

    fn lerp(self, to: Keyframe, t: f64) -> Keyframe {
        Keyframe {
            origin: self.origin.lerp(to.origin, t),
            size: self.size + (to.size - self.size) * t,
        }
    }
}

/// Random walk of keyframes, one segment per chunk.
///
/// Every segment starts where the previous one was heading.
#[derive(Clone, Debug)]
pub struct MotionPlan {
    rng: Rng64,
    bounds: Rect,
    min_size: f64,
    max_size: f64,
    steps: usize,
    target: Keyframe,
    shape: GeometryShape,
}

impl MotionPlan {
    pub fn new(mut rng: Rng64, bounds: Rect, opts: &GeneratorOpts) -> Self {
        let shape = rng
            .pick(&GENERATED_SHAPES)
            .copied()
            .unwrap_or(GeometryShape::Circle);
        let mut plan = Self {
            rng,
            bounds,
            min_size: opts.min_size,
            max_size: opts.max_size,
            steps: opts.chunk_size.max(1),
            target: Keyframe {
                origin: bounds.origin(),
                size: opts.min_size,
            },
            shape,
        };
        plan.target = plan.sample();
        plan
    }

    pub fn shape(&self) -> GeometryShape {
        self.shape
    }

    /// Next `(from, to)` pair. Frame `i` of the chunk sits at `i / chunk_size` along it.
    pub fn next_segment(&mut self) -> Segment {
        let from = self.target;
        let to = self.sample();
        self.target = to;
        Segment {
            from,
            to,
            steps: self.steps,
        }
    }

    fn sample(&mut self) -> Keyframe {
        let limit = self.bounds.width().min(self.bounds.height()).max(0.0);
        let size = self.rng.range_f64(self.min_size, self.max_size).min(limit);
        let x = self.rng.range_f64(self.bounds.x0, self.bounds.x1 - size);
        let y = self.rng.range_f64(self.bounds.y0, self.bounds.y1 - size);
        Keyframe {
            origin: Point::new(x, y),
            size,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: Keyframe,
    pub to: Keyframe,
    steps: usize,
}

impl Segment {
    pub fn at(&self, i: usize) -> Keyframe {
        self.from.lerp(self.to, i as f64 / self.steps as f64)
    }
}

type CompletionFn = Box<dyn FnOnce(Vec<Frame>) + Send + 'static>;
/// Called with the chunk index after each chunk has rendered.
type ChunkHook = Arc<dyn Fn(usize) + Send + Sync>;

struct Run {
    store: FrameStore,
    slots: Box<[OnceLock<Frame>]>,
    remaining: AtomicUsize,
    cancel: CancelToken,
    on_complete: Mutex<Option<CompletionFn>>,
    after_chunk: Option<ChunkHook>,
    outcome: Mutex<Option<GenerationOutcome>>,
    finished: Condvar,
}

impl Run {
    fn chunks_done(&self, n: usize) {
        if n == 0 {
            return;
        }
        if self.remaining.fetch_sub(n, Ordering::AcqRel) == n {
            self.finish();
        }
    }

    fn finish(&self) {
        let callback = lock(&self.on_complete).take();
        let outcome = if self.cancel.is_cancelled() {
            drop(callback);
            GenerationOutcome::Cancelled
        } else {
            let frames: Vec<Frame> = self
                .slots
                .iter()
                .map(|slot| {
                    slot.get()
                        .cloned()
                        .unwrap_or_else(|| Frame::empty(&self.store))
                })
                .collect();
            let n = frames.len();
            if let Some(callback) = callback {
                callback(frames);
            }
            GenerationOutcome::Completed { frames: n }
        };
        tracing::debug!(?outcome, "generation finished");
        *lock(&self.outcome) = Some(outcome);
        self.finished.notify_all();
    }
}

/// Handle to a running generation.
#[derive(Clone)]
pub struct GenerationHandle {
    run: Arc<Run>,
}

impl std::fmt::Debug for GenerationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationHandle")
            .field("frames", &self.run.slots.len())
            .field("cancelled", &self.run.cancel.is_cancelled())
            .field("outcome", &*lock(&self.run.outcome))
            .finish()
    }
}

impl GenerationHandle {
    /// Stop dispatching chunks. The completion callback will not fire. Idempotent.
    pub fn cancel(&self) {
        self.run.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.cancel.is_cancelled()
    }

    pub fn outcome(&self) -> Option<GenerationOutcome> {
        *lock(&self.run.outcome)
    }

    /// Block until every dispatched chunk has finished.
    pub fn wait(&self) -> GenerationOutcome {
        let mut outcome = lock(&self.run.outcome);
        loop {
            if let Some(done) = *outcome {
                return done;
            }
            outcome = self
                .run
                .finished
                .wait(outcome)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// Renders procedurally animated frames in parallel chunks.
pub struct BatchGenerator {
    store: FrameStore,
    canvas: Canvas,
    drawing_rect: Rect,
    style: ToolConfig,
    opts: GeneratorOpts,
    pool: Arc<rayon::ThreadPool>,
}

impl std::fmt::Debug for BatchGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchGenerator")
            .field("canvas", &self.canvas)
            .field("drawing_rect", &self.drawing_rect)
            .field("opts", &self.opts)
            .finish()
    }
}

impl BatchGenerator {
    pub fn new(store: FrameStore, canvas: Canvas, opts: GeneratorOpts) -> FlipbookResult<Self> {
        canvas.validate()?;
        if !(opts.min_size > 0.0 && opts.min_size <= opts.max_size) {
            return Err(FlipbookError::validation(format!(
                "generator size range [{}, {}] is invalid",
                opts.min_size, opts.max_size
            )));
        }
        let pool = Arc::new(build_thread_pool(opts.threads)?);
        Ok(Self {
            store,
            canvas,
            drawing_rect: canvas.rect(),
            style: ToolConfig::default(),
            opts,
            pool,
        })
    }

    /// Restrict shapes to `rect`, intersected with the canvas.
    pub fn with_drawing_rect(mut self, rect: Rect) -> Self {
        self.drawing_rect = rect.intersect(self.canvas.rect());
        self
    }

    /// Line width and color of the generated outlines.
    pub fn with_style(mut self, style: ToolConfig) -> Self {
        self.style = style;
        self
    }

    pub fn opts(&self) -> &GeneratorOpts {
        &self.opts
    }

    pub fn generate(
        &self,
        count: usize,
        on_complete: impl FnOnce(Vec<Frame>) + Send + 'static,
    ) -> FlipbookResult<GenerationHandle> {
        self.generate_with_cancel(count, CancelToken::new(), on_complete)
    }

    /// Start a run of `count` frames. `on_complete` receives them in order, on a worker thread.
    #[tracing::instrument(level = "debug", skip(self, cancel, on_complete))]
    pub fn generate_with_cancel(
        &self,
        count: usize,
        cancel: CancelToken,
        on_complete: impl FnOnce(Vec<Frame>) + Send + 'static,
    ) -> FlipbookResult<GenerationHandle> {
        self.start(count, cancel, Box::new(on_complete), None)
    }

    fn start(
        &self,
        count: usize,
        cancel: CancelToken,
        on_complete: CompletionFn,
        after_chunk: Option<ChunkHook>,
    ) -> FlipbookResult<GenerationHandle> {
        if count == 0 || count > self.opts.max_count {
            return Err(FlipbookError::validation(format!(
                "frame count must be in 1..={}, got {count}",
                self.opts.max_count
            )));
        }

        let chunk_size = self.opts.chunk_size.max(1);
        let total_chunks = count.div_ceil(chunk_size);
        let run = Arc::new(Run {
            store: self.store.clone(),
            slots: (0..count).map(|_| OnceLock::new()).collect(),
            remaining: AtomicUsize::new(total_chunks),
            cancel,
            on_complete: Mutex::new(Some(on_complete)),
            after_chunk,
            outcome: Mutex::new(None),
            finished: Condvar::new(),
        });

        let rng = match self.opts.seed {
            Some(seed) => Rng64::new(seed),
            None => Rng64::from_entropy(),
        };
        let mut plan = MotionPlan::new(rng, self.drawing_rect, &self.opts);
        let shape = plan.shape();
        let painter = ShapePainter {
            canvas: self.canvas,
            shape,
            style: self.style,
        };
        tracing::debug!(shape = shape.id(), total_chunks, "generation started");

        let pool = self.pool.clone();
        let dispatcher = run.clone();
        self.pool.spawn(move || {
            for chunk in 0..total_chunks {
                if dispatcher.cancel.is_cancelled() {
                    dispatcher.chunks_done(total_chunks - chunk);
                    return;
                }
                let segment = plan.next_segment();
                let start = chunk * chunk_size;
                let steps = chunk_size.min(count - start);
                let run = dispatcher.clone();
                let painter = painter.clone();
                pool.spawn(move || {
                    render_chunk(&run, &painter, segment, start, steps);
                    if let Some(hook) = &run.after_chunk {
                        hook(chunk);
                    }
                    run.chunks_done(1);
                });
            }
        });

        Ok(GenerationHandle { run })
    }
}

#[derive(Clone, Debug)]
struct ShapePainter {
    canvas: Canvas,
    shape: GeometryShape,
    style: ToolConfig,
}

impl ShapePainter {
    fn paint(&self, key: Keyframe) -> FlipbookResult<Bitmap> {
        let rect = key.rect();
        let width = self.style.line_width();
        let op = StrokeOp {
            shape: StrokeShape::Path(self.shape.path(
                rect.origin(),
                Point::new(rect.x1, rect.y1),
                width,
            )),
            tool: Tool::Geometry(self.shape),
            width,
            color: self.style.color,
        };
        rasterize_onto(self.canvas, None, &op)
    }
}

fn render_chunk(run: &Run, painter: &ShapePainter, segment: Segment, start: usize, steps: usize) {
    for i in 0..steps {
        if run.cancel.is_cancelled() {
            return;
        }
        let image = match painter.paint(segment.at(i)) {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                tracing::warn!(frame = start + i, error = %err, "generated frame render failed");
                None
            }
        };
        let _ = run.slots[start + i].set(Frame::new(&run.store, image));
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/generate/batch.rs"]
mod tests;
