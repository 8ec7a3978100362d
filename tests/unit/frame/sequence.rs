use std::sync::{Arc, Mutex};

use super::*;
use crate::draw::surface::{StrokePoint, SurfaceOpts};
use crate::foundation::core::Canvas;
use crate::frame::store::FrameStoreOpts;

fn setup(tmp: &std::path::Path) -> (FrameSequence, DrawingSurface) {
    let store = FrameStore::new(FrameStoreOpts {
        offload_delay_ms: 60_000,
        dir: Some(tmp.to_path_buf()),
        worker_threads: Some(1),
        ..FrameStoreOpts::default()
    })
    .unwrap();
    let surface =
        DrawingSurface::new(Canvas::new(16, 16).unwrap(), SurfaceOpts::default()).unwrap();
    (FrameSequence::new(store), surface)
}

fn solid(tag: u8) -> Bitmap {
    Bitmap::filled(Canvas::new(16, 16).unwrap(), [tag, 0, 0, 255])
}

fn scribble(surface: &mut DrawingSurface) {
    surface.begin_stroke(StrokePoint::new(2.0, 8.0));
    surface.extend_stroke(StrokePoint::new(8.0, 8.0)).unwrap();
    surface.end_stroke(StrokePoint::new(14.0, 8.0)).unwrap();
}

#[test]
fn starts_with_one_placeholder() {
    let tmp = tempfile::tempdir().unwrap();
    let (seq, _) = setup(tmp.path());
    assert_eq!(seq.len(), 1);
    assert!(!seq.is_empty());
    assert_eq!(seq.selected_index(), 0);
    assert!(!seq.selected_frame().has_content());
}

#[test]
fn insert_keeps_selection_on_the_same_frame() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, _) = setup(tmp.path());
    let selected = seq.selected_frame().clone();
    let f = Frame::empty(seq.store());
    seq.insert(f, 0);
    assert_eq!(seq.selected_index(), 1);
    assert!(seq.selected_frame().same_as(&selected));

    let g = Frame::empty(seq.store());
    seq.insert(g, 99);
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.selected_index(), 1);
}

#[test]
fn removing_the_only_frame_leaves_a_placeholder() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    scribble(&mut surface);
    seq.persist_current(&surface);
    let old = seq.selected_frame().clone();

    seq.remove(0, &mut surface).unwrap();
    assert_eq!(seq.len(), 1);
    assert!(!seq.selected_frame().same_as(&old));
    assert!(!seq.selected_frame().has_content());
    assert!(surface.export_current_bitmap().is_none());
}

#[test]
fn remove_out_of_range_is_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    seq.remove(5, &mut surface).unwrap();
    assert_eq!(seq.len(), 1);
}

#[test]
fn remove_selects_the_predecessor() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    let frames: Vec<Frame> = (0..4)
        .map(|i| Frame::new(seq.store(), Some(solid(i))))
        .collect();
    seq.replace_all(frames, &mut surface).unwrap();

    seq.remove(2, &mut surface).unwrap();
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.selected_index(), 1);
    assert_eq!(surface.export_current_bitmap(), Some(solid(1)));

    seq.remove(0, &mut surface).unwrap();
    assert_eq!(seq.selected_index(), 0);
    assert_eq!(surface.export_current_bitmap(), Some(solid(1)));
}

#[test]
fn select_persists_current_and_loads_target() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    let mut frames: Vec<Frame> = (0..6)
        .map(|i| Frame::new(seq.store(), Some(solid(i * 10))))
        .collect();
    frames[3] = Frame::empty(seq.store());
    seq.replace_all(frames, &mut surface).unwrap();

    seq.select(1, &mut surface).unwrap();
    scribble(&mut surface);
    let drawn = surface.export_current_bitmap().unwrap();

    seq.select(3, &mut surface).unwrap();
    assert_eq!(seq.frames()[1].image(), Some(drawn));
    assert_eq!(seq.selected_index(), 3);
    assert!(surface.export_current_bitmap().is_none());

    seq.select(4, &mut surface).unwrap();
    assert_eq!(surface.export_current_bitmap(), Some(solid(40)));
    assert!(!seq.frames()[3].has_content());

    seq.select(6, &mut surface).unwrap();
    assert_eq!(seq.selected_index(), 4);
}

#[test]
fn duplicate_inserts_copy_after_and_selects_it() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    scribble(&mut surface);
    let drawn = surface.export_current_bitmap().unwrap();

    seq.duplicate(0, &mut surface).unwrap();
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.selected_index(), 1);
    assert_eq!(seq.frames()[0].image(), Some(drawn.clone()));
    assert_eq!(seq.frames()[1].image(), Some(drawn.clone()));
    assert!(!seq.frames()[0].same_as(&seq.frames()[1]));
    assert_eq!(surface.export_current_bitmap(), Some(drawn));
}

#[test]
fn add_frame_and_onion_skin() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    scribble(&mut surface);
    let drawn = surface.export_current_bitmap().unwrap();

    assert!(seq.previous_frame_image().is_none());
    seq.add_frame(&mut surface);
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.selected_index(), 1);
    assert!(surface.export_current_bitmap().is_none());
    assert_eq!(seq.previous_frame_image(), Some(drawn));
}

#[test]
fn remove_all_and_replace_with_nothing_keep_a_placeholder() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    seq.add_frame(&mut surface);
    seq.add_frame(&mut surface);
    seq.remove_all(&mut surface);
    assert_eq!(seq.len(), 1);
    assert_eq!(seq.selected_index(), 0);

    seq.replace_all(Vec::new(), &mut surface).unwrap();
    assert_eq!(seq.len(), 1);
}

#[derive(Default)]
struct Counter(Mutex<Vec<(usize, usize)>>);

impl SequenceObserver for Counter {
    fn on_sequence_changed(&self, state: &SequenceState) {
        self.0
            .lock()
            .unwrap()
            .push((state.frames.len(), state.selected));
    }
}

#[test]
fn observers_hear_changes_only_while_viewing() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut seq, mut surface) = setup(tmp.path());
    let counter = Arc::new(Counter::default());
    let observer: Arc<dyn SequenceObserver> = counter.clone();
    seq.subscribe(Arc::downgrade(&observer));

    seq.add_frame(&mut surface);
    assert!(counter.0.lock().unwrap().is_empty());

    seq.set_viewing_frames(true);
    seq.add_frame(&mut surface);
    assert_eq!(*counter.0.lock().unwrap(), vec![(2, 1), (3, 2)]);
}
