use std::sync::Weak;

use crate::draw::history::{DEFAULT_HISTORY_CAPACITY, HistoryEntry, UndoLog};
use crate::draw::tool::{Tool, ToolConfig};
use crate::foundation::core::{Canvas, Point};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::geometry::buffer::PathBuffer;
use crate::geometry::smooth::{DEFAULT_GRANULARITY, smooth_path};
use crate::raster::bitmap::{Bitmap, PixelRect};
use crate::raster::cpu::{StrokeOp, StrokeShape, rasterize_onto};

/// One input sample, already transformed into canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokePoint {
    pub location: Point,
    /// Reported radius of the touch contact, 0 when the input device has none.
    pub contact_radius: f64,
}

impl StrokePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            location: Point::new(x, y),
            contact_radius: 0.0,
        }
    }

    pub fn with_contact_radius(mut self, radius: f64) -> Self {
        self.contact_radius = radius.max(0.0);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Began,
    Changed,
    Ended,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    StrokeBegan,
    StrokeEnded,
    HistoryChanged { can_undo: bool, can_redo: bool },
    BitmapReplaced,
}

/// Receives surface notifications. The surface only keeps weak references to observers.
pub trait SurfaceObserver: Send + Sync {
    fn on_surface_event(&self, event: SurfaceEvent);
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SurfaceOpts {
    pub history_capacity: usize,
    /// Freehand strokes are flushed into the bitmap once this many points are buffered.
    pub auto_commit_points: usize,
    pub smoothing_granularity: usize,
}

impl Default for SurfaceOpts {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            auto_commit_points: 256,
            smoothing_granularity: DEFAULT_GRANULARITY,
        }
    }
}

/// Transient preview of the stroke in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub op: StrokeOp,
}

impl Overlay {
    /// Render the preview over `base`. Pass the committed bitmap to preview an eraser.
    pub fn rasterize(&self, canvas: Canvas, base: Option<&Bitmap>) -> FlipbookResult<Bitmap> {
        rasterize_onto(canvas, base, &self.op)
    }
}

#[derive(Debug)]
struct ActiveStroke {
    buffer: PathBuffer,
    before: HistoryEntry,
    config: ToolConfig,
    tool: Tool,
    /// Set by the first `extend_stroke`; a gesture without one is a tap.
    dragged: bool,
    segments_committed: usize,
}

impl ActiveStroke {
    fn op(&self, shape: StrokeShape) -> StrokeOp {
        StrokeOp {
            shape,
            tool: self.tool,
            width: self.config.line_width(),
            color: self.config.color,
        }
    }

    fn path_shape(&self, granularity: usize) -> Option<StrokeShape> {
        match self.tool {
            Tool::Geometry(shape) => {
                let (first, last) = (self.buffer.first()?, self.buffer.last()?);
                Some(StrokeShape::Path(shape.path(
                    first,
                    last,
                    self.config.line_width(),
                )))
            }
            Tool::Pen | Tool::Brush | Tool::Eraser => Some(StrokeShape::Path(smooth_path(
                self.buffer.points(),
                granularity,
            ))),
        }
    }

    /// The op committed when the gesture ends, `None` if auto-commit already drew everything.
    fn final_op(&self, end: StrokePoint, granularity: usize) -> Option<StrokeOp> {
        if !self.dragged || self.buffer.len() <= 1 {
            if self.segments_committed > 0 {
                return None;
            }
            let radius = (end.contact_radius * 2.0).max(self.config.line_width()) / 2.0;
            return Some(self.op(StrokeShape::Dot {
                center: end.location,
                radius,
            }));
        }
        self.path_shape(granularity).map(|shape| self.op(shape))
    }
}

/// Interactive raster canvas: strokes in, committed bitmap plus undo history out.
pub struct DrawingSurface {
    canvas: Canvas,
    opts: SurfaceOpts,
    config: ToolConfig,
    bitmap: Option<Bitmap>,
    overlay: Option<Overlay>,
    stroke: Option<ActiveStroke>,
    history: UndoLog,
    observers: Vec<Weak<dyn SurfaceObserver>>,
}

impl std::fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("canvas", &self.canvas)
            .field("config", &self.config)
            .field("has_bitmap", &self.bitmap.is_some())
            .field("stroking", &self.stroke.is_some())
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .finish()
    }
}

impl DrawingSurface {
    pub fn new(canvas: Canvas, opts: SurfaceOpts) -> FlipbookResult<Self> {
        canvas.validate()?;
        let history = UndoLog::with_capacity(opts.history_capacity);
        Ok(Self {
            canvas,
            opts,
            config: ToolConfig::default(),
            bitmap: None,
            overlay: None,
            stroke: None,
            history,
            observers: Vec::new(),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn config(&self) -> ToolConfig {
        self.config
    }

    /// Takes effect from the next stroke; a stroke in progress keeps its snapshot.
    pub fn set_config(&mut self, config: ToolConfig) {
        self.config = config;
    }

    pub fn subscribe(&mut self, observer: Weak<dyn SurfaceObserver>) {
        self.observers.push(observer);
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn handle_gesture(
        &mut self,
        state: GestureState,
        point: StrokePoint,
    ) -> FlipbookResult<()> {
        match state {
            GestureState::Began => {
                self.begin_stroke(point);
                Ok(())
            }
            GestureState::Changed => self.extend_stroke(point),
            GestureState::Ended | GestureState::Cancelled => self.end_stroke(point).map(|_| ()),
        }
    }

    /// Start a stroke. Returns `false` when no tool is selected or a stroke is already active.
    pub fn begin_stroke(&mut self, point: StrokePoint) -> bool {
        if self.stroke.is_some() || !self.config.can_draw() {
            return false;
        }
        let Some(tool) = self.config.tool else {
            return false;
        };

        self.history.clear_redo();
        self.stroke = Some(ActiveStroke {
            buffer: PathBuffer::starting_at(point.location),
            before: self.capture(),
            config: self.config,
            tool,
            dragged: false,
            segments_committed: 0,
        });
        self.refresh_overlay();
        self.emit(SurfaceEvent::StrokeBegan);
        true
    }

    pub fn extend_stroke(&mut self, point: StrokePoint) -> FlipbookResult<()> {
        let Some(stroke) = self.stroke.as_mut() else {
            return Ok(());
        };
        stroke.buffer.push(point.location);
        stroke.dragged = true;

        let freehand = !matches!(stroke.tool, Tool::Geometry(_));
        if freehand && stroke.buffer.len() >= self.opts.auto_commit_points.max(2) {
            self.flush_segment()?;
        }
        self.refresh_overlay();
        Ok(())
    }

    /// Finish the stroke and commit it. Returns `false` when no stroke was active.
    ///
    /// On a rasterization error the bitmap is rolled back to its state before the stroke and
    /// no history entry is recorded.
    pub fn end_stroke(&mut self, point: StrokePoint) -> FlipbookResult<bool> {
        let Some(mut stroke) = self.stroke.take() else {
            return Ok(false);
        };
        if stroke.buffer.last() != Some(point.location) {
            stroke.buffer.push(point.location);
        }
        self.overlay = None;

        let result = match stroke.final_op(point, self.opts.smoothing_granularity) {
            Some(op) => rasterize_onto(self.canvas, self.bitmap.as_ref(), &op).map(Some),
            None => Ok(None),
        };

        match result {
            Ok(drawn) => {
                if let Some(bitmap) = drawn {
                    self.bitmap = Some(bitmap);
                }
                self.history.commit(stroke.before);
                self.emit_history();
                self.emit(SurfaceEvent::StrokeEnded);
                Ok(true)
            }
            Err(err) => {
                if stroke.segments_committed > 0 {
                    self.bitmap = self.materialize(stroke.before);
                }
                tracing::warn!(
                    error = %err,
                    tool = stroke.tool.id(),
                    "stroke rasterization failed"
                );
                self.emit(SurfaceEvent::StrokeEnded);
                Err(err)
            }
        }
    }

    /// Treated like ending the gesture at its last recorded point.
    pub fn cancel_stroke(&mut self) -> FlipbookResult<bool> {
        let Some(last) = self.stroke.as_ref().and_then(|s| s.buffer.last()) else {
            return Ok(false);
        };
        self.end_stroke(StrokePoint {
            location: last,
            contact_radius: 0.0,
        })
    }

    pub fn undo(&mut self) -> bool {
        if self.stroke.is_some() {
            return false;
        }
        let current = self.capture();
        let Some(entry) = self.history.undo(current) else {
            return false;
        };
        self.bitmap = self.materialize(entry);
        self.emit_history();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.stroke.is_some() {
            return false;
        }
        let current = self.capture();
        let Some(entry) = self.history.redo(current) else {
            return false;
        };
        self.bitmap = self.materialize(entry);
        self.emit_history();
        true
    }

    /// Clear the bitmap, any stroke in progress and both history stacks.
    pub fn reset(&mut self) {
        self.stroke = None;
        self.overlay = None;
        self.bitmap = None;
        self.history.clear();
        self.emit(SurfaceEvent::BitmapReplaced);
        self.emit_history();
    }

    pub fn export_current_bitmap(&self) -> Option<Bitmap> {
        self.bitmap.clone()
    }

    /// Replace the bitmap wholesale. History does not span bitmap replacements.
    pub fn load_bitmap(&mut self, bitmap: Bitmap) -> FlipbookResult<()> {
        if bitmap.canvas() != self.canvas {
            return Err(FlipbookError::validation(format!(
                "bitmap is {}x{}, surface canvas is {}x{}",
                bitmap.width(),
                bitmap.height(),
                self.canvas.width,
                self.canvas.height
            )));
        }
        self.stroke = None;
        self.overlay = None;
        self.bitmap = Some(bitmap);
        self.history.clear();
        self.emit(SurfaceEvent::BitmapReplaced);
        self.emit_history();
        Ok(())
    }

    fn capture(&self) -> HistoryEntry {
        match &self.bitmap {
            Some(b) => HistoryEntry::Slice(b.crop(PixelRect::full(self.canvas))),
            None => HistoryEntry::Empty,
        }
    }

    fn materialize(&self, entry: HistoryEntry) -> Option<Bitmap> {
        match entry {
            HistoryEntry::Empty => None,
            HistoryEntry::Slice(slice) => {
                let base = self
                    .bitmap
                    .clone()
                    .unwrap_or_else(|| Bitmap::new_transparent(self.canvas));
                match slice.restore_onto(&base) {
                    Ok(b) => Some(b),
                    Err(err) => {
                        tracing::warn!(error = %err, "discarding history slice outside the canvas");
                        self.bitmap.clone()
                    }
                }
            }
        }
    }

    /// Rasterize the buffered freehand segment and keep drawing from its last point.
    fn flush_segment(&mut self) -> FlipbookResult<()> {
        let Some(stroke) = self.stroke.as_mut() else {
            return Ok(());
        };
        let Some(shape) = stroke.path_shape(self.opts.smoothing_granularity) else {
            return Ok(());
        };
        let bitmap = rasterize_onto(self.canvas, self.bitmap.as_ref(), &stroke.op(shape))?;
        self.bitmap = Some(bitmap);
        stroke.buffer.restart_from_last();
        stroke.segments_committed += 1;
        tracing::debug!(segments = stroke.segments_committed, "auto-committed stroke segment");
        Ok(())
    }

    fn refresh_overlay(&mut self) {
        self.overlay = self.stroke.as_ref().and_then(|s| {
            s.path_shape(self.opts.smoothing_granularity)
                .map(|shape| Overlay { op: s.op(shape) })
        });
    }

    fn emit_history(&mut self) {
        self.emit(SurfaceEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn emit(&mut self, event: SurfaceEvent) {
        self.observers.retain(|o| match o.upgrade() {
            Some(observer) => {
                observer.on_surface_event(event);
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/surface.rs"]
mod tests;
