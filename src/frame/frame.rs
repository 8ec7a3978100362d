use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::foundation::error::FlipbookResult;
use crate::frame::deferred::TaskSlot;
use crate::frame::store::FrameStore;
use crate::raster::bitmap::Bitmap;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// One animation frame: a bitmap that lives in memory while in use and on disk otherwise.
///
/// Handles are cheap to clone and share the same frame. When the last handle is dropped the
/// on-disk artifact is deleted. Background work only holds weak references.
#[derive(Clone)]
pub struct Frame {
    inner: Arc<FrameInner>,
}

struct FrameInner {
    id: u64,
    store: FrameStore,
    state: Mutex<FrameState>,
    offload: TaskSlot,
    // Serializes artifact writes, reads and deletes. Never taken while `state` is held.
    io_lock: Mutex<()>,
}

#[derive(Default)]
struct FrameState {
    resident: Option<Bitmap>,
    on_disk: bool,
    preview: Option<Bitmap>,
    generation: u64,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("Frame")
            .field("id", &self.inner.id)
            .field("resident", &state.resident.is_some())
            .field("on_disk", &state.on_disk)
            .field("preview", &state.preview.is_some())
            .finish()
    }
}

impl Frame {
    pub fn new(store: &FrameStore, image: Option<Bitmap>) -> Self {
        let frame = Self::empty(store);
        if image.is_some() {
            frame.set_image(image);
        }
        frame
    }

    pub fn empty(store: &FrameStore) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
                store: store.clone(),
                state: Mutex::new(FrameState::default()),
                offload: TaskSlot::default(),
                io_lock: Mutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether both handles refer to the same frame.
    pub fn same_as(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.inner.store.artifact_path(self.inner.id)
    }

    pub fn has_content(&self) -> bool {
        let state = self.inner.lock_state();
        state.resident.is_some() || state.on_disk
    }

    pub fn is_resident(&self) -> bool {
        self.inner.lock_state().resident.is_some()
    }

    pub fn is_on_disk(&self) -> bool {
        self.inner.lock_state().on_disk
    }

    /// Latest content of the frame, read back from disk when it has been offloaded.
    ///
    /// A disk read does not make the frame resident again; use [`Frame::prefetch`] for that.
    pub fn image(&self) -> Option<Bitmap> {
        let (resident, on_disk, generation) = {
            let state = self.inner.lock_state();
            (state.resident.clone(), state.on_disk, state.generation)
        };
        if resident.is_some() || !on_disk {
            return resident;
        }
        match self.inner.read_artifact() {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                tracing::warn!(
                    frame = self.inner.id,
                    generation,
                    error = %err,
                    "frame reload failed"
                );
                None
            }
        }
    }

    pub fn preview_image(&self) -> Option<Bitmap> {
        self.inner.lock_state().preview.clone()
    }

    /// Replace the frame content. Re-renders the preview and restarts the offload timer.
    pub fn set_image(&self, image: Option<Bitmap>) {
        let generation = {
            let mut state = self.inner.lock_state();
            let unchanged = match (&state.resident, &image) {
                (Some(current), Some(new)) => current.ptr_eq(new),
                (None, None) => !state.on_disk,
                _ => false,
            };
            if unchanged {
                return;
            }
            state.generation += 1;
            state.resident = image.clone();
            state.on_disk = false;
            state.preview = None;
            self.inner.offload.cancel();
            state.generation
        };

        if image.is_none() {
            self.inner.remove_artifact();
            return;
        }
        self.schedule_offload(generation);
        self.schedule_preview(generation);
    }

    /// Bring an offloaded frame back into memory ahead of use.
    ///
    /// A frame that is already resident gets its offload timer restarted instead.
    pub fn prefetch(&self) {
        let (resident, on_disk, generation) = {
            let state = self.inner.lock_state();
            (state.resident.is_some(), state.on_disk, state.generation)
        };
        if resident {
            self.schedule_offload(generation);
            return;
        }
        if !on_disk {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner.store.spawn(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let bitmap = match inner.read_artifact() {
                Ok(b) => b,
                Err(err) => {
                    tracing::warn!(frame = inner.id, error = %err, "frame prefetch failed");
                    return;
                }
            };
            {
                let mut state = inner.lock_state();
                if state.generation != generation || state.resident.is_some() {
                    return;
                }
                state.resident = Some(bitmap);
            }
            tracing::debug!(frame = inner.id, "frame prefetched");
            Frame { inner }.schedule_offload(generation);
        });
    }

    fn schedule_offload(&self, generation: u64) {
        let ticket = self.inner.offload.arm();
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .store
            .schedule(self.inner.store.offload_delay(), move || {
                offload(&weak, ticket, generation);
            });
    }

    fn schedule_preview(&self, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.store.spawn(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.lock_state().generation != generation {
                return;
            }
            let frame = Frame { inner };
            let Some(source) = frame.image() else {
                return;
            };
            let inner = frame.inner;
            match source.thumbnail(inner.store.preview_bounds()) {
                Ok(preview) => {
                    let mut state = inner.lock_state();
                    if state.generation == generation {
                        state.preview = Some(preview);
                    }
                }
                Err(err) => tracing::warn!(frame = inner.id, error = %err, "preview failed"),
            }
        });
    }
}

/// Persist the frame's bitmap and release it from memory, unless it changed in the meantime.
fn offload(weak: &Weak<FrameInner>, ticket: u64, generation: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if !inner.offload.is_current(ticket) {
        return;
    }
    let (bitmap, already_on_disk) = {
        let state = inner.lock_state();
        if state.generation != generation {
            return;
        }
        match &state.resident {
            Some(b) => (b.clone(), state.on_disk),
            None => return,
        }
    };

    let _io = inner.lock_io();
    if !already_on_disk {
        let path = inner.store.artifact_path(inner.id);
        let tmp = path.with_extension("png.tmp");
        let written = bitmap.save_png(&tmp).and_then(|()| {
            if !inner.offload.is_current(ticket) {
                let _ = std::fs::remove_file(&tmp);
                return Ok(false);
            }
            std::fs::rename(&tmp, &path)?;
            Ok(true)
        });
        match written {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                let _ = std::fs::remove_file(&tmp);
                tracing::warn!(
                    frame = inner.id,
                    error = %err,
                    "frame offload failed, keeping it in memory"
                );
                return;
            }
        }
    }

    let mut state = inner.lock_state();
    if state.generation == generation && inner.offload.is_current(ticket) {
        state.on_disk = true;
        state.resident = None;
        tracing::debug!(frame = inner.id, "frame offloaded to disk");
    }
}

impl FrameInner {
    fn lock_state(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_io(&self) -> MutexGuard<'_, ()> {
        self.io_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_artifact(&self) -> FlipbookResult<Bitmap> {
        let _io = self.lock_io();
        Bitmap::load_png(&self.store.artifact_path(self.id))
    }

    fn remove_artifact(&self) {
        let _io = self.lock_io();
        let path = self.store.artifact_path(self.id);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "frame artifact removal failed"
                );
            }
        }
    }
}

impl Drop for FrameInner {
    fn drop(&mut self) {
        self.offload.cancel();
        self.remove_artifact();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/frame.rs"]
mod tests;
