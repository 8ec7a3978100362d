use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::FlipbookResult;
use crate::raster::bitmap::Bitmap;

/// How often a viewer should replay the animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopPolicy {
    #[default]
    Forever,
    /// Extra plays after the first one, as stored in the container's loop count.
    Finite(u16),
}

/// Configuration provided to an [`AnimatedImageSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub frame_count: usize,
    pub loop_policy: LoopPolicy,
}

/// Destination for an ordered stream of frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices starting at 0.
/// Either `finish` or `abort` ends the stream; only `finish` may leave a visible artifact.
pub trait AnimatedImageSink {
    fn begin(&mut self, cfg: SinkConfig) -> FlipbookResult<()>;
    fn push_frame(&mut self, idx: usize, frame: &Bitmap) -> FlipbookResult<()>;
    fn finish(&mut self) -> FlipbookResult<()>;
    fn abort(&mut self);
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    /// Frames in push order.
    pub frames: Vec<(usize, Bitmap)>,
    pub finished: bool,
    pub aborted: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }
}

impl AnimatedImageSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> FlipbookResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: usize, frame: &Bitmap) -> FlipbookResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn finish(&mut self) -> FlipbookResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.frames.clear();
    }
}
