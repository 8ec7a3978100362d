use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::frame::deferred::Deferred;

/// Environment variable that overrides the base directory for frame artifacts.
pub const TMP_DIR_ENV: &str = "FLIPBOOK_TMP_DIR";

static STORE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameStoreOpts {
    /// Grace period before a frame's bitmap is written to disk and released from memory.
    pub offload_delay_ms: u64,
    pub preview_width: u32,
    pub preview_height: u32,
    /// Base directory for artifacts; falls back to `FLIPBOOK_TMP_DIR`, then the system temp dir.
    pub dir: Option<PathBuf>,
    pub worker_threads: Option<usize>,
}

impl Default for FrameStoreOpts {
    fn default() -> Self {
        Self {
            offload_delay_ms: 5_000,
            preview_width: 160,
            preview_height: 160,
            dir: None,
            worker_threads: None,
        }
    }
}

/// Shared backing services for frames: artifact directory, worker pool and eviction timer.
///
/// The directory is private to this store and removed when the last handle goes away.
#[derive(Clone)]
pub struct FrameStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    deferred: Deferred,
    pool: Arc<rayon::ThreadPool>,
    dir: PathBuf,
    offload_delay: Duration,
    preview_bounds: Canvas,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.dir) {
            tracing::debug!(dir = %self.dir.display(), error = %err, "frame dir cleanup failed");
        }
    }
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("dir", &self.inner.dir)
            .field("offload_delay", &self.inner.offload_delay)
            .finish()
    }
}

impl FrameStore {
    pub fn new(opts: FrameStoreOpts) -> FlipbookResult<Self> {
        let preview_bounds = Canvas::new(opts.preview_width, opts.preview_height)?;
        let base = match &opts.dir {
            Some(dir) => dir.clone(),
            None => std::env::var_os(TMP_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        };
        let pool = Arc::new(build_thread_pool(opts.worker_threads)?);
        let deferred = Deferred::new(pool.clone())?;

        let dir = base.join(format!(
            "flipbook-{}-{}",
            std::process::id(),
            STORE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create frame dir '{}'", dir.display()))?;
        tracing::debug!(dir = %dir.display(), "frame store ready");

        Ok(Self {
            inner: Arc::new(StoreInner {
                deferred,
                pool,
                dir,
                offload_delay: Duration::from_millis(opts.offload_delay_ms),
                preview_bounds,
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn offload_delay(&self) -> Duration {
        self.inner.offload_delay
    }

    pub fn preview_bounds(&self) -> Canvas {
        self.inner.preview_bounds
    }

    /// Location of the persisted bitmap for frame `id`.
    pub fn artifact_path(&self, id: u64) -> PathBuf {
        self.inner
            .dir
            .join(format!("frame_{}_{id}.png", std::process::id()))
    }

    pub(crate) fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.inner.pool.spawn(job);
    }

    pub(crate) fn schedule(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        self.inner.deferred.schedule(delay, job);
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> FlipbookResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FlipbookError::validation(
            "worker 'threads' must be >= 1 when set",
        ));
    }
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("flipbook-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FlipbookError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/frame/store.rs"]
mod tests;
