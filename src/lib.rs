//! Flipbook is a frame-by-frame raster animation engine.
//!
//! - Draw strokes onto a [`DrawingSurface`] with bounded undo/redo
//! - Keep frames in a [`FrameSequence`], with idle images offloaded to disk by a [`FrameStore`]
//! - Loop them with a [`Player`], fill them with a [`BatchGenerator`]
//! - Write them out as an animated GIF with an [`Exporter`]
//!
//! [`Editor`] wires all of the above behind a single state machine.
#![forbid(unsafe_code)]

/// Errors, geometry primitives and cancellation.
pub mod foundation;

/// Premultiplied RGBA bitmaps and the CPU stroke rasterizer.
pub mod raster;

/// Path building for freehand strokes and geometric shapes.
pub mod geometry;

/// Tools, undo history and the drawing surface.
pub mod draw;

/// Frames, the disk-backed frame store and the ordered frame list.
pub mod frame;

/// Timed looping playback.
pub mod playback;

/// Parallel generation of animated shape frames.
pub mod generate;

/// Animated GIF export.
pub mod export;

pub mod config;
pub mod editor;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Canvas, Fps, Point, Rect, Rgba8};
pub use crate::foundation::error::{FlipbookError, FlipbookResult};

pub use crate::config::EngineConfig;
pub use crate::draw::surface::{DrawingSurface, GestureState, StrokePoint, SurfaceOpts};
pub use crate::draw::tool::{Tool, ToolConfig};
pub use crate::editor::{Editor, EditorState};
pub use crate::export::exporter::{
    ExportHandle, ExportOpts, ExportOutcome, Exporter, HeadlessPresenter, Presenter,
};
pub use crate::export::gif::GifSink;
pub use crate::export::sink::{AnimatedImageSink, InMemorySink, LoopPolicy, SinkConfig};
pub use crate::frame::frame::Frame;
pub use crate::frame::sequence::FrameSequence;
pub use crate::frame::store::{FrameStore, FrameStoreOpts};
pub use crate::generate::batch::{
    BatchGenerator, GenerationHandle, GenerationOutcome, GeneratorOpts,
};
pub use crate::geometry::shape::GeometryShape;
pub use crate::playback::player::{FrameDisplay, Player, PlayerState};
pub use crate::raster::bitmap::Bitmap;
