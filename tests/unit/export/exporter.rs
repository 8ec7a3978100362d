use std::sync::Mutex;
use std::sync::mpsc;

use super::*;
use crate::export::sink::InMemorySink;
use crate::frame::store::{FrameStore, FrameStoreOpts};

fn store(tmp: &Path) -> FrameStore {
    FrameStore::new(FrameStoreOpts {
        offload_delay_ms: 60_000,
        dir: Some(tmp.to_path_buf()),
        worker_threads: Some(1),
        ..FrameStoreOpts::default()
    })
    .unwrap()
}

fn canvas() -> Canvas {
    Canvas::new(10, 8).unwrap()
}

fn cfg(frame_count: usize) -> SinkConfig {
    SinkConfig {
        canvas: canvas(),
        fps: Fps::whole(5).unwrap(),
        frame_count,
        loop_policy: LoopPolicy::Forever,
    }
}

fn frames(store: &FrameStore) -> Vec<Frame> {
    vec![
        Frame::new(store, Some(Bitmap::filled(canvas(), [200, 0, 0, 255]))),
        Frame::empty(store),
        Frame::new(store, Some(Bitmap::filled(canvas(), [0, 0, 200, 255]))),
    ]
}

#[test]
fn missing_images_become_blank_frames() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store(tmp.path());
    let mut sink = InMemorySink::new();
    let status = run_export(&mut sink, &frames(&store), cfg(3), &CancelToken::new()).unwrap();
    assert_eq!(status, StreamStatus::Finished);
    assert!(sink.finished);
    assert_eq!(sink.config().unwrap().frame_count, 3);
    let indices: Vec<usize> = sink.frames.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(sink.frames[1].1.is_blank());
    assert_eq!(sink.frames[1].1.canvas(), canvas());
    assert_eq!(sink.frames[2].1.pixel(0, 0), Some([0, 0, 200, 255]));
}

#[test]
fn pre_cancelled_export_never_begins() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store(tmp.path());
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut sink = InMemorySink::new();
    let status = run_export(&mut sink, &frames(&store), cfg(3), &cancel).unwrap();
    assert_eq!(status, StreamStatus::Cancelled);
    assert!(sink.config().is_none());
}

/// Cancels the shared token once `after` frames have been pushed.
struct CancellingSink {
    inner: InMemorySink,
    cancel: CancelToken,
    after: usize,
}

impl AnimatedImageSink for CancellingSink {
    fn begin(&mut self, cfg: SinkConfig) -> FlipbookResult<()> {
        self.inner.begin(cfg)
    }

    fn push_frame(&mut self, idx: usize, frame: &Bitmap) -> FlipbookResult<()> {
        self.inner.push_frame(idx, frame)?;
        if self.inner.frames.len() >= self.after {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn finish(&mut self) -> FlipbookResult<()> {
        self.inner.finish()
    }

    fn abort(&mut self) {
        self.inner.abort();
    }
}

#[test]
fn cancel_mid_stream_aborts_without_finishing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store(tmp.path());
    let cancel = CancelToken::new();
    let mut sink = CancellingSink {
        inner: InMemorySink::new(),
        cancel: cancel.clone(),
        after: 1,
    };
    let status = run_export(&mut sink, &frames(&store), cfg(3), &cancel).unwrap();
    assert_eq!(status, StreamStatus::Cancelled);
    assert!(sink.inner.aborted);
    assert!(!sink.inner.finished);
}

#[test]
fn cancel_after_last_frame_still_skips_finalize() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store(tmp.path());
    let cancel = CancelToken::new();
    let mut sink = CancellingSink {
        inner: InMemorySink::new(),
        cancel: cancel.clone(),
        after: 3,
    };
    let status = run_export(&mut sink, &frames(&store), cfg(3), &cancel).unwrap();
    assert_eq!(status, StreamStatus::Cancelled);
    assert!(!sink.inner.finished);
}

#[derive(Default)]
struct RecordingPresenter(Mutex<Vec<PathBuf>>);

impl Presenter for RecordingPresenter {
    fn present(&self, path: &Path, on_dismissed: Box<dyn FnOnce() + Send>) {
        self.0.lock().unwrap().push(path.to_path_buf());
        on_dismissed();
    }
}

#[test]
fn export_runs_callbacks_after_finalize() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store(tmp.path());
    let presenter = Arc::new(RecordingPresenter::default());
    let exporter = Exporter::new(canvas(), ExportOpts::default())
        .unwrap()
        .with_presenter(presenter.clone());
    let out = tmp.path().join("out.gif");
    let (done_tx, done_rx) = mpsc::channel();
    let (dismiss_tx, dismiss_rx) = mpsc::channel();

    let handle = exporter
        .export_to(
            &out,
            frames(&store),
            Fps::whole(5).unwrap(),
            move |path| done_tx.send(path).unwrap(),
            move || dismiss_tx.send(()).unwrap(),
        )
        .unwrap();
    assert_eq!(handle.out_path(), out.as_path());
    assert_eq!(handle.wait().unwrap(), ExportOutcome::Exported(out.clone()));

    assert_eq!(done_rx.recv().unwrap(), out);
    dismiss_rx.recv().unwrap();
    assert_eq!(*presenter.0.lock().unwrap(), vec![out.clone()]);
    assert!(out.exists());
}

#[test]
fn empty_frame_list_is_rejected() {
    let exporter = Exporter::new(canvas(), ExportOpts::default()).unwrap();
    let result = exporter.export(Vec::new(), Fps::whole(5).unwrap(), |_| {}, || {});
    assert!(result.is_err());
}

#[test]
fn generated_names_are_unique_and_land_in_out_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let opts = ExportOpts {
        out_dir: Some(tmp.path().to_path_buf()),
        ..ExportOpts::default()
    };
    let a = opts.next_out_path();
    let b = opts.next_out_path();
    assert_ne!(a, b);
    assert_eq!(a.parent(), Some(tmp.path()));
    assert_eq!(a.extension().unwrap(), "gif");
}
