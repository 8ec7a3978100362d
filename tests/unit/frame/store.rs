use super::*;

fn opts_in(dir: &Path) -> FrameStoreOpts {
    FrameStoreOpts {
        dir: Some(dir.to_path_buf()),
        worker_threads: Some(1),
        ..FrameStoreOpts::default()
    }
}

#[test]
fn each_store_gets_a_private_dir_removed_on_drop() {
    let tmp = tempfile::tempdir().unwrap();
    let a = FrameStore::new(opts_in(tmp.path())).unwrap();
    let b = FrameStore::new(opts_in(tmp.path())).unwrap();
    assert_ne!(a.dir(), b.dir());
    assert!(a.dir().is_dir());

    let dir = a.dir().to_path_buf();
    let clone = a.clone();
    drop(a);
    assert!(dir.is_dir());
    drop(clone);
    assert!(!dir.exists());
}

#[test]
fn artifact_names_carry_pid_and_frame_id() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FrameStore::new(opts_in(tmp.path())).unwrap();
    let path = store.artifact_path(42);
    assert_eq!(path.parent(), Some(store.dir()));
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        format!("frame_{}_42.png", std::process::id())
    );
}

#[test]
fn zero_threads_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let opts = FrameStoreOpts {
        worker_threads: Some(0),
        ..opts_in(tmp.path())
    };
    assert!(FrameStore::new(opts).is_err());
}

#[test]
fn opts_deserialize_with_defaults() {
    let opts: FrameStoreOpts = serde_json::from_str(r#"{"offload_delay_ms": 250}"#).unwrap();
    assert_eq!(opts.offload_delay_ms, 250);
    assert_eq!(opts.preview_width, 160);
    assert!(opts.dir.is_none());
}
