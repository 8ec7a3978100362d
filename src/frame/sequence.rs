use std::sync::Weak;

use crate::draw::surface::DrawingSurface;
use crate::foundation::error::FlipbookResult;
use crate::frame::frame::Frame;
use crate::frame::store::FrameStore;
use crate::raster::bitmap::Bitmap;

/// The frame list and selection observed as one value.
#[derive(Clone, Debug)]
pub struct SequenceState {
    pub frames: Vec<Frame>,
    pub selected: usize,
}

pub trait SequenceObserver: Send + Sync {
    fn on_sequence_changed(&self, state: &SequenceState);
}

/// Ordered frames plus the selected index.
///
/// Never empty: removing the last frame leaves an empty placeholder. Out-of-range indices are
/// ignored. Operations that change the selection move bitmaps between the surface and frames.
pub struct FrameSequence {
    store: FrameStore,
    frames: Vec<Frame>,
    selected: usize,
    viewing_frames: bool,
    observers: Vec<Weak<dyn SequenceObserver>>,
}

impl std::fmt::Debug for FrameSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSequence")
            .field("len", &self.frames.len())
            .field("selected", &self.selected)
            .field("viewing_frames", &self.viewing_frames)
            .finish()
    }
}

impl FrameSequence {
    pub fn new(store: FrameStore) -> Self {
        let placeholder = Frame::empty(&store);
        Self {
            store,
            frames: vec![placeholder],
            selected: 0,
            viewing_frames: false,
            observers: Vec::new(),
        }
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_frame(&self) -> &Frame {
        &self.frames[self.selected]
    }

    pub fn state(&self) -> SequenceState {
        SequenceState {
            frames: self.frames.clone(),
            selected: self.selected,
        }
    }

    pub fn subscribe(&mut self, observer: Weak<dyn SequenceObserver>) {
        self.observers.push(observer);
    }

    /// Change notifications are only delivered while the frame list is on screen.
    pub fn set_viewing_frames(&mut self, viewing: bool) {
        self.viewing_frames = viewing;
        self.notify();
    }

    /// Insert `frame` at `at` (clamped to the end). The selection keeps pointing at the same frame.
    pub fn insert(&mut self, frame: Frame, at: usize) {
        let at = at.min(self.frames.len());
        self.frames.insert(at, frame);
        if at <= self.selected {
            self.selected += 1;
        }
        self.notify();
    }

    /// Remove the frame at `at` and select its predecessor.
    pub fn remove(&mut self, at: usize, surface: &mut DrawingSurface) -> FlipbookResult<()> {
        if at >= self.frames.len() {
            return Ok(());
        }
        if self.frames.len() == 1 {
            self.frames[0] = Frame::empty(&self.store);
            self.selected = 0;
            surface.reset();
            self.notify();
            return Ok(());
        }

        if at != self.selected {
            self.persist_current(surface);
        }
        self.frames.remove(at);
        self.selected = at.saturating_sub(1);
        let result = self.load_selected(surface);
        self.notify();
        result
    }

    /// Copy the frame at `at` and select the copy, placed right after it.
    pub fn duplicate(&mut self, at: usize, surface: &mut DrawingSurface) -> FlipbookResult<()> {
        if at >= self.frames.len() {
            return Ok(());
        }
        self.persist_current(surface);
        let copy = Frame::new(&self.store, self.frames[at].image());
        self.frames.insert(at + 1, copy);
        self.selected = at + 1;
        let result = self.load_selected(surface);
        self.notify();
        result
    }

    /// Switch the surface to the frame at `index`, saving the current drawing first.
    pub fn select(&mut self, index: usize, surface: &mut DrawingSurface) -> FlipbookResult<()> {
        if index >= self.frames.len() {
            return Ok(());
        }
        self.persist_current(surface);
        self.selected = index;
        let result = self.load_selected(surface);
        if let Some(prev) = index.checked_sub(2) {
            self.frames[prev].prefetch();
        }
        if let Some(next) = self.frames.get(index + 1) {
            next.prefetch();
        }
        self.notify();
        result
    }

    /// Append an empty frame after the selection and select it.
    pub fn add_frame(&mut self, surface: &mut DrawingSurface) {
        self.persist_current(surface);
        let at = self.selected + 1;
        self.frames.insert(at, Frame::empty(&self.store));
        self.selected = at;
        surface.reset();
        self.notify();
    }

    pub fn remove_all(&mut self, surface: &mut DrawingSurface) {
        self.frames = vec![Frame::empty(&self.store)];
        self.selected = 0;
        surface.reset();
        self.notify();
    }

    /// Install a whole new frame list (e.g. generated frames) and select the first frame.
    pub fn replace_all(
        &mut self,
        frames: Vec<Frame>,
        surface: &mut DrawingSurface,
    ) -> FlipbookResult<()> {
        self.frames = if frames.is_empty() {
            vec![Frame::empty(&self.store)]
        } else {
            frames
        };
        self.selected = 0;
        let result = self.load_selected(surface);
        self.notify();
        result
    }

    /// Image of the frame before the selection, for onion skinning.
    pub fn previous_frame_image(&self) -> Option<Bitmap> {
        let prev = self.selected.checked_sub(1)?;
        self.frames[prev].image()
    }

    /// Store the surface's bitmap into the selected frame.
    pub fn persist_current(&mut self, surface: &DrawingSurface) {
        self.frames[self.selected].set_image(surface.export_current_bitmap());
    }

    fn load_selected(&mut self, surface: &mut DrawingSurface) -> FlipbookResult<()> {
        match self.frames[self.selected].image() {
            Some(bitmap) => surface.load_bitmap(bitmap),
            None => {
                surface.reset();
                Ok(())
            }
        }
    }

    fn notify(&mut self) {
        if !self.viewing_frames {
            return;
        }
        let state = self.state();
        self.observers.retain(|o| match o.upgrade() {
            Some(observer) => {
                observer.on_sequence_changed(&state);
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/sequence.rs"]
mod tests;
