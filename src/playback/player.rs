use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::foundation::core::Fps;
use crate::foundation::error::FlipbookResult;
use crate::frame::frame::Frame;
use crate::playback::clock::FrameClock;
use crate::raster::bitmap::Bitmap;

/// Frames prefetched when a list is loaded, and how far ahead each tick reads.
pub const PREFETCH_AHEAD: usize = 5;

/// Receives the frame to put on screen.
pub trait FrameDisplay: Send + Sync {
    fn show(&self, index: usize, image: Option<&Bitmap>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
}

struct Timeline {
    frames: Vec<Frame>,
    index: usize,
    display: Arc<dyn FrameDisplay>,
}

impl Timeline {
    fn render(&self) {
        let Some(frame) = self.frames.get(self.index) else {
            return;
        };
        let image = frame.image();
        self.display.show(self.index, image.as_ref());
        if let Some(ahead) = self.frames.get(self.index + PREFETCH_AHEAD) {
            ahead.prefetch();
        }
    }

    fn advance(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        self.index += 1;
        if self.index >= self.frames.len() {
            self.index = 0;
        }
        self.render();
    }
}

/// Loops over a frame list at a fixed rate.
pub struct Player {
    timeline: Arc<Mutex<Timeline>>,
    fps: Fps,
    clock: Option<FrameClock>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("fps", &self.fps)
            .field("state", &self.state())
            .field("index", &self.index())
            .finish()
    }
}

impl Player {
    pub fn new(fps: Fps, display: Arc<dyn FrameDisplay>) -> Self {
        Self {
            timeline: Arc::new(Mutex::new(Timeline {
                frames: Vec::new(),
                index: 0,
                display,
            })),
            fps,
            clock: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        if self.clock.is_some() {
            PlayerState::Playing
        } else {
            PlayerState::Stopped
        }
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn index(&self) -> usize {
        self.lock().index
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().frames.is_empty()
    }

    /// Replace the frame list, rewind and show the first frame.
    pub fn load(&mut self, frames: Vec<Frame>) {
        let mut timeline = self.lock();
        for frame in frames.iter().take(PREFETCH_AHEAD) {
            frame.prefetch();
        }
        timeline.frames = frames;
        timeline.index = 0;
        timeline.render();
    }

    pub fn start(&mut self) -> FlipbookResult<()> {
        if self.clock.is_none() {
            self.clock = Some(self.spawn_clock()?);
        }
        Ok(())
    }

    /// Stop the clock, rewind and show the first frame.
    pub fn stop(&mut self) {
        self.clock = None;
        let mut timeline = self.lock();
        timeline.index = 0;
        timeline.render();
    }

    /// Change the rate. A running clock is replaced by one with the new period.
    pub fn set_fps(&mut self, fps: Fps) -> FlipbookResult<()> {
        if fps == self.fps {
            return Ok(());
        }
        self.fps = fps;
        if self.clock.is_some() {
            self.clock = None;
            self.clock = Some(self.spawn_clock()?);
            tracing::debug!(fps = fps.as_f64(), "playback clock rebuilt");
        }
        Ok(())
    }

    /// Advance by one frame, wrapping at the end. Called by the clock while playing.
    pub fn tick(&self) {
        self.lock().advance();
    }

    fn spawn_clock(&self) -> FlipbookResult<FrameClock> {
        let weak: Weak<Mutex<Timeline>> = Arc::downgrade(&self.timeline);
        let clock = FrameClock::start(self.fps.frame_duration(), move || {
            if let Some(timeline) = weak.upgrade() {
                lock_timeline(&timeline).advance();
            }
        })?;
        Ok(clock)
    }

    fn lock(&self) -> MutexGuard<'_, Timeline> {
        lock_timeline(&self.timeline)
    }
}

fn lock_timeline(timeline: &Mutex<Timeline>) -> MutexGuard<'_, Timeline> {
    timeline
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/playback/player.rs"]
mod tests;
