use std::time::{Duration, Instant};

use super::*;
use crate::foundation::core::Canvas;
use crate::frame::store::FrameStoreOpts;

fn store(tmp: &std::path::Path, delay_ms: u64) -> FrameStore {
    FrameStore::new(FrameStoreOpts {
        offload_delay_ms: delay_ms,
        preview_width: 8,
        preview_height: 8,
        dir: Some(tmp.to_path_buf()),
        worker_threads: Some(2),
    })
    .unwrap()
}

fn bitmap(seed: u8) -> Bitmap {
    let c = Canvas::new(16, 12).unwrap();
    let mut data = Vec::with_capacity(c.byte_len());
    for i in 0..c.pixel_count() {
        let a = ((i as u32 * 7 + u32::from(seed)) % 256) as u8;
        data.extend_from_slice(&[a / 2, a / 4, a / 3, a]);
    }
    Bitmap::from_premul_rgba8(c.width, c.height, data).unwrap()
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn empty_frame_has_no_content() {
    let tmp = tempfile::tempdir().unwrap();
    let f = Frame::empty(&store(tmp.path(), 10));
    assert!(!f.has_content());
    assert!(f.image().is_none());
    f.prefetch();
    assert!(f.preview_image().is_none());
}

#[test]
fn offload_then_reload_is_lossless() {
    let tmp = tempfile::tempdir().unwrap();
    let s = store(tmp.path(), 100);
    let original = bitmap(3);
    let f = Frame::new(&s, Some(original.clone()));
    assert!(f.is_resident());

    wait_until("offload", || f.is_on_disk());
    assert!(!f.is_resident());
    assert!(f.artifact_path().is_file());
    assert_eq!(f.image(), Some(original.clone()));
    // Reading does not pull the frame back into memory.
    assert!(!f.is_resident());

    f.prefetch();
    wait_until("prefetch", || f.is_resident());
    assert_eq!(f.image(), Some(original));
    // A prefetched frame is evicted again after the grace period.
    wait_until("re-eviction", || !f.is_resident());
}

#[test]
fn preview_is_rendered_in_the_background() {
    let tmp = tempfile::tempdir().unwrap();
    let f = Frame::new(&store(tmp.path(), 60_000), Some(bitmap(1)));
    wait_until("preview", || f.preview_image().is_some());
    let p = f.preview_image().unwrap();
    assert!(p.width() <= 8 && p.height() <= 8);
}

#[test]
fn only_the_latest_content_is_persisted() {
    let tmp = tempfile::tempdir().unwrap();
    let s = store(tmp.path(), 30);
    let f = Frame::new(&s, Some(bitmap(1)));
    f.set_image(Some(bitmap(2)));
    f.set_image(Some(bitmap(3)));
    wait_until("offload", || f.is_on_disk());
    assert_eq!(f.image(), Some(bitmap(3)));
}

#[test]
fn clearing_content_removes_the_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let f = Frame::new(&store(tmp.path(), 10), Some(bitmap(5)));
    wait_until("offload", || f.is_on_disk());
    let path = f.artifact_path();
    f.set_image(None);
    assert!(!path.exists());
    assert!(!f.has_content());
    assert!(f.image().is_none());
}

#[test]
fn dropping_the_last_handle_deletes_the_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let s = store(tmp.path(), 10);
    let f = Frame::new(&s, Some(bitmap(9)));
    let other = f.clone();
    assert!(other.same_as(&f));
    wait_until("offload", || f.is_on_disk());
    let path = f.artifact_path();
    drop(f);
    assert!(path.exists());
    drop(other);
    assert!(!path.exists());
}

#[test]
fn frames_get_distinct_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let s = store(tmp.path(), 10);
    let a = Frame::empty(&s);
    let b = Frame::empty(&s);
    assert_ne!(a.id(), b.id());
    assert!(!a.same_as(&b));
}
