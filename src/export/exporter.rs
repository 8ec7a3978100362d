use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crate::export::gif::GifSink;
use crate::export::sink::{AnimatedImageSink, LoopPolicy, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::frame::frame::Frame;
use crate::raster::bitmap::Bitmap;

static EXPORT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportOpts {
    pub loop_policy: LoopPolicy,
    /// Where generated file names are placed; the system temp dir when unset.
    pub out_dir: Option<PathBuf>,
}

impl ExportOpts {
    /// A fresh `animation_<pid>_<n>.gif` path under the output directory.
    pub fn next_out_path(&self) -> PathBuf {
        let dir = self.out_dir.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!(
            "animation_{}_{}.gif",
            std::process::id(),
            EXPORT_SEQ.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

/// Shows a finished export to the user and reports when it is dismissed.
pub trait Presenter: Send + Sync {
    fn present(&self, path: &Path, on_dismissed: Box<dyn FnOnce() + Send>);
}

/// Presenter for environments without a viewer: logs the path and dismisses at once.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessPresenter;

impl Presenter for HeadlessPresenter {
    fn present(&self, path: &Path, on_dismissed: Box<dyn FnOnce() + Send>) {
        tracing::debug!(path = %path.display(), "export ready");
        on_dismissed();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamStatus {
    Finished,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported(PathBuf),
    Cancelled,
}

/// Stream `frames` into `sink`, checking `cancel` before every frame and before finalizing.
///
/// Frames without an image are written as transparent canvas-sized frames. On cancellation or
/// error the sink is aborted.
#[tracing::instrument(level = "debug", skip_all, fields(frames = frames.len()))]
pub fn run_export<S: AnimatedImageSink + ?Sized>(
    sink: &mut S,
    frames: &[Frame],
    cfg: SinkConfig,
    cancel: &CancelToken,
) -> FlipbookResult<StreamStatus> {
    if cancel.is_cancelled() {
        return Ok(StreamStatus::Cancelled);
    }
    sink.begin(cfg)?;

    let mut blank: Option<Bitmap> = None;
    for (idx, frame) in frames.iter().enumerate() {
        if cancel.is_cancelled() {
            sink.abort();
            return Ok(StreamStatus::Cancelled);
        }
        let image = match frame.image() {
            Some(image) => image,
            None => blank
                .get_or_insert_with(|| Bitmap::new_transparent(cfg.canvas))
                .clone(),
        };
        if let Err(err) = sink.push_frame(idx, &image) {
            sink.abort();
            return Err(err);
        }
    }

    if cancel.is_cancelled() {
        sink.abort();
        return Ok(StreamStatus::Cancelled);
    }
    sink.finish()?;
    Ok(StreamStatus::Finished)
}

/// Handle to a background export.
#[derive(Debug)]
pub struct ExportHandle {
    cancel: CancelToken,
    out_path: PathBuf,
    thread: Option<JoinHandle<FlipbookResult<ExportOutcome>>>,
}

impl ExportHandle {
    /// Request cancellation. Idempotent; a cancelled export invokes no callbacks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn wait(mut self) -> FlipbookResult<ExportOutcome> {
        let Some(thread) = self.thread.take() else {
            return Ok(ExportOutcome::Cancelled);
        };
        thread
            .join()
            .map_err(|_| FlipbookError::encode("export thread panicked"))?
    }
}

/// Writes frame lists to GIF files on a background thread.
#[derive(Clone)]
pub struct Exporter {
    canvas: Canvas,
    opts: ExportOpts,
    presenter: Arc<dyn Presenter>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("canvas", &self.canvas)
            .field("opts", &self.opts)
            .finish()
    }
}

impl Exporter {
    pub fn new(canvas: Canvas, opts: ExportOpts) -> FlipbookResult<Self> {
        canvas.validate()?;
        Ok(Self {
            canvas,
            opts,
            presenter: Arc::new(HeadlessPresenter),
        })
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn opts(&self) -> &ExportOpts {
        &self.opts
    }

    /// Export to a freshly named file; see [`Exporter::export_to`].
    pub fn export(
        &self,
        frames: Vec<Frame>,
        fps: Fps,
        on_complete: impl FnOnce(PathBuf) + Send + 'static,
        on_dismissed: impl FnOnce() + Send + 'static,
    ) -> FlipbookResult<ExportHandle> {
        self.export_to(self.opts.next_out_path(), frames, fps, on_complete, on_dismissed)
    }

    /// Encode `frames` into `out_path` on a background thread.
    ///
    /// `on_complete` runs on that thread after the file is finalized, then the presenter is asked
    /// to show it and `on_dismissed` fires when the presenter lets go.
    pub fn export_to(
        &self,
        out_path: impl Into<PathBuf>,
        frames: Vec<Frame>,
        fps: Fps,
        on_complete: impl FnOnce(PathBuf) + Send + 'static,
        on_dismissed: impl FnOnce() + Send + 'static,
    ) -> FlipbookResult<ExportHandle> {
        if frames.is_empty() {
            return Err(FlipbookError::validation("nothing to export: frame list is empty"));
        }
        let out_path = out_path.into();
        let cancel = CancelToken::new();
        let cfg = SinkConfig {
            canvas: self.canvas,
            fps,
            frame_count: frames.len(),
            loop_policy: self.opts.loop_policy,
        };

        let job = ExportJob {
            out_path: out_path.clone(),
            frames,
            cfg,
            cancel: cancel.clone(),
            presenter: self.presenter.clone(),
        };
        let thread = std::thread::Builder::new()
            .name("flipbook-export".to_owned())
            .spawn(move || job.run(on_complete, on_dismissed))?;

        Ok(ExportHandle {
            cancel,
            out_path,
            thread: Some(thread),
        })
    }
}

struct ExportJob {
    out_path: PathBuf,
    frames: Vec<Frame>,
    cfg: SinkConfig,
    cancel: CancelToken,
    presenter: Arc<dyn Presenter>,
}

impl ExportJob {
    fn run(
        self,
        on_complete: impl FnOnce(PathBuf),
        on_dismissed: impl FnOnce() + Send + 'static,
    ) -> FlipbookResult<ExportOutcome> {
        let mut sink = GifSink::new(&self.out_path);
        let status = run_export(&mut sink, &self.frames, self.cfg, &self.cancel)
            .inspect_err(|err| {
                tracing::warn!(path = %self.out_path.display(), error = %err, "export failed");
            })?;

        if status == StreamStatus::Cancelled || self.cancel.is_cancelled() {
            if status == StreamStatus::Finished {
                let _ = std::fs::remove_file(&self.out_path);
            }
            tracing::debug!(path = %self.out_path.display(), "export cancelled");
            return Ok(ExportOutcome::Cancelled);
        }

        tracing::debug!(
            path = %self.out_path.display(),
            frames = self.cfg.frame_count,
            "export finished"
        );
        on_complete(self.out_path.clone());
        self.presenter.present(&self.out_path, Box::new(on_dismissed));
        Ok(ExportOutcome::Exported(self.out_path))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/exporter.rs"]
mod tests;
