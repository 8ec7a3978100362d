use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::EngineConfig;
use crate::draw::surface::{DrawingSurface, GestureState, StrokePoint};
use crate::draw::tool::ToolConfig;
use crate::export::exporter::{ExportHandle, ExportOutcome, Exporter, Presenter};
use crate::foundation::core::Fps;
use crate::foundation::error::FlipbookResult;
use crate::frame::frame::Frame;
use crate::frame::sequence::FrameSequence;
use crate::frame::store::FrameStore;
use crate::generate::batch::{BatchGenerator, GenerationHandle, GenerationOutcome};
use crate::playback::player::{FrameDisplay, Player};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorState {
    ReadyForDrawing,
    DrawingInProgress,
    ManagingFrames,
    Playing,
    Generating,
    Exporting,
}

impl EditorState {
    fn accepts_drawing(self) -> bool {
        matches!(
            self,
            EditorState::ReadyForDrawing | EditorState::DrawingInProgress
        )
    }

    fn is_idle(self) -> bool {
        matches!(
            self,
            EditorState::ReadyForDrawing | EditorState::ManagingFrames
        )
    }
}

/// Results handed back from background work, applied on the next [`Editor::pump`].
enum EditorEvent {
    FramesGenerated { run: u64, frames: Vec<Frame> },
    Exported { run: u64, path: PathBuf },
    ExportDismissed { run: u64 },
}

struct Background<H> {
    run: u64,
    handle: H,
    resume: EditorState,
}

/// Ties the surface, frame list, player, generator and exporter together behind one state
/// machine. All methods are meant to be called from a single thread.
pub struct Editor {
    config: EngineConfig,
    state: EditorState,
    surface: DrawingSurface,
    sequence: FrameSequence,
    player: Player,
    generator: BatchGenerator,
    exporter: Exporter,
    generation: Option<Background<GenerationHandle>>,
    export: Option<Background<ExportHandle>>,
    last_export: Option<PathBuf>,
    export_dismissed: bool,
    next_run: u64,
    events_tx: Sender<EditorEvent>,
    events_rx: Receiver<EditorEvent>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("frames", &self.sequence.len())
            .field("selected", &self.sequence.selected_index())
            .field("last_export", &self.last_export)
            .finish()
    }
}

impl Editor {
    pub fn new(config: EngineConfig, display: Arc<dyn FrameDisplay>) -> FlipbookResult<Self> {
        config.validate()?;
        let store = FrameStore::new(config.frames.clone())?;
        let mut surface = DrawingSurface::new(config.canvas, config.surface.clone())?;
        surface.set_config(config.tool);
        let generator =
            BatchGenerator::new(store.clone(), config.canvas, config.generator.clone())?
                .with_style(config.tool);
        let exporter = Exporter::new(config.canvas, config.export.clone())?;
        let (events_tx, events_rx) = mpsc::channel();
        Ok(Self {
            state: EditorState::ReadyForDrawing,
            sequence: FrameSequence::new(store),
            player: Player::new(config.fps, display),
            surface,
            generator,
            exporter,
            generation: None,
            export: None,
            last_export: None,
            export_dismissed: false,
            next_run: 0,
            events_tx,
            events_rx,
            config,
        })
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.exporter = self.exporter.clone().with_presenter(presenter);
        self
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Path of the most recent successful export.
    pub fn last_export(&self) -> Option<&Path> {
        self.last_export.as_deref()
    }

    pub fn export_dismissed(&self) -> bool {
        self.export_dismissed
    }

    pub fn set_tool_config(&mut self, tool: ToolConfig) {
        self.config.tool = tool;
        self.surface.set_config(tool);
    }

    /// Feed one pointer event to the surface. Returns `false` when drawing is not allowed now.
    pub fn handle_gesture(
        &mut self,
        gesture: GestureState,
        point: StrokePoint,
    ) -> FlipbookResult<bool> {
        if !self.state.accepts_drawing() {
            return Ok(false);
        }
        let result = self.surface.handle_gesture(gesture, point);
        self.state = if self.surface.is_stroking() {
            EditorState::DrawingInProgress
        } else {
            EditorState::ReadyForDrawing
        };
        result.map(|()| true)
    }

    pub fn undo(&mut self) -> bool {
        self.state == EditorState::ReadyForDrawing && self.surface.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.state == EditorState::ReadyForDrawing && self.surface.redo()
    }

    /// Show the frame list. Frame observers are notified only while it is open.
    pub fn open_frames(&mut self) -> bool {
        if self.state != EditorState::ReadyForDrawing {
            return false;
        }
        self.state = EditorState::ManagingFrames;
        self.sequence.set_viewing_frames(true);
        true
    }

    pub fn close_frames(&mut self) -> bool {
        if self.state != EditorState::ManagingFrames {
            return false;
        }
        self.sequence.set_viewing_frames(false);
        self.state = EditorState::ReadyForDrawing;
        true
    }

    pub fn select_frame(&mut self, index: usize) -> FlipbookResult<bool> {
        if !self.state.is_idle() {
            return Ok(false);
        }
        self.sequence.select(index, &mut self.surface)?;
        Ok(true)
    }

    pub fn add_frame(&mut self) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        self.sequence.add_frame(&mut self.surface);
        true
    }

    pub fn duplicate_frame(&mut self, index: usize) -> FlipbookResult<bool> {
        if !self.state.is_idle() {
            return Ok(false);
        }
        self.sequence.duplicate(index, &mut self.surface)?;
        Ok(true)
    }

    pub fn remove_frame(&mut self, index: usize) -> FlipbookResult<bool> {
        if !self.state.is_idle() {
            return Ok(false);
        }
        self.sequence.remove(index, &mut self.surface)?;
        Ok(true)
    }

    pub fn remove_all_frames(&mut self) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        self.sequence.remove_all(&mut self.surface);
        true
    }

    /// Save the drawing into the selected frame and loop over all frames.
    pub fn play(&mut self) -> FlipbookResult<bool> {
        if !self.state.is_idle() {
            return Ok(false);
        }
        if self.state == EditorState::ManagingFrames {
            self.sequence.set_viewing_frames(false);
        }
        self.sequence.persist_current(&self.surface);
        self.player.load(self.sequence.frames().to_vec());
        self.player.start()?;
        self.state = EditorState::Playing;
        Ok(true)
    }

    pub fn pause(&mut self) -> bool {
        if self.state != EditorState::Playing {
            return false;
        }
        self.player.stop();
        self.state = EditorState::ReadyForDrawing;
        true
    }

    pub fn set_fps(&mut self, fps: Fps) -> FlipbookResult<()> {
        self.player.set_fps(fps)?;
        self.config.fps = fps;
        Ok(())
    }

    /// Start generating `count` frames. They replace the frame list once [`Editor::pump`] sees
    /// the finished run.
    pub fn generate_frames(&mut self, count: usize) -> FlipbookResult<bool> {
        if !self.state.is_idle() {
            return Ok(false);
        }
        self.sequence.persist_current(&self.surface);
        let run = self.bump_run();
        let tx = self.events_tx.clone();
        let handle = self.generator.generate(count, move |frames| {
            let _ = tx.send(EditorEvent::FramesGenerated { run, frames });
        })?;
        self.generation = Some(Background {
            run,
            handle,
            resume: self.state,
        });
        self.state = EditorState::Generating;
        Ok(true)
    }

    pub fn cancel_generation(&mut self) -> bool {
        let Some(bg) = self.generation.take() else {
            return false;
        };
        bg.handle.cancel();
        self.state = bg.resume;
        true
    }

    /// Export every frame as a GIF, to `out` or a generated temp path.
    pub fn export_gif(&mut self, out: Option<PathBuf>) -> FlipbookResult<bool> {
        if !self.state.is_idle() {
            return Ok(false);
        }
        self.sequence.persist_current(&self.surface);
        let run = self.bump_run();
        let out = out.unwrap_or_else(|| self.exporter.opts().next_out_path());
        let done_tx = self.events_tx.clone();
        let dismiss_tx = self.events_tx.clone();
        let handle = self.exporter.export_to(
            out,
            self.sequence.frames().to_vec(),
            self.config.fps,
            move |path| {
                let _ = done_tx.send(EditorEvent::Exported { run, path });
            },
            move || {
                let _ = dismiss_tx.send(EditorEvent::ExportDismissed { run });
            },
        )?;
        self.export_dismissed = false;
        self.export = Some(Background {
            run,
            handle,
            resume: self.state,
        });
        self.state = EditorState::Exporting;
        Ok(true)
    }

    pub fn cancel_export(&mut self) -> bool {
        let Some(bg) = self.export.take() else {
            return false;
        };
        bg.handle.cancel();
        self.state = bg.resume;
        true
    }

    /// Apply results from background work. Returns how many events were applied.
    pub fn pump(&mut self) -> FlipbookResult<usize> {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply(event)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Block until the running generation or export finishes, then [`Editor::pump`].
    pub fn wait_background(&mut self) -> FlipbookResult<usize> {
        if let Some(bg) = &self.generation
            && bg.handle.wait() == GenerationOutcome::Cancelled
        {
            self.cancel_generation();
        }
        if let Some(bg) = self.export.take() {
            self.state = bg.resume;
            match bg.handle.wait()? {
                ExportOutcome::Exported(path) => self.last_export = Some(path),
                ExportOutcome::Cancelled => {}
            }
        }
        self.pump()
    }

    fn apply(&mut self, event: EditorEvent) -> FlipbookResult<bool> {
        match event {
            EditorEvent::FramesGenerated { run, frames } => {
                let Some(bg) = self.generation.take_if(|bg| bg.run == run) else {
                    return Ok(false);
                };
                self.state = bg.resume;
                tracing::debug!(frames = frames.len(), "generated frames installed");
                self.sequence.replace_all(frames, &mut self.surface)?;
                Ok(true)
            }
            EditorEvent::Exported { run, path } => {
                let Some(bg) = self.export.take_if(|bg| bg.run == run) else {
                    return Ok(false);
                };
                self.state = bg.resume;
                self.last_export = Some(path);
                Ok(true)
            }
            EditorEvent::ExportDismissed { run } => {
                if self.last_run_exported(run) {
                    self.export_dismissed = true;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    fn bump_run(&mut self) -> u64 {
        self.next_run += 1;
        self.next_run
    }

    fn last_run_exported(&self, run: u64) -> bool {
        run == self.next_run && self.last_export.is_some()
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if let Some(bg) = &self.generation {
            bg.handle.cancel();
        }
        if let Some(bg) = &self.export {
            bg.handle.cancel();
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/editor.rs"]
mod tests;
