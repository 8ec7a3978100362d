use std::sync::mpsc;

use super::*;
use crate::frame::store::FrameStoreOpts;

fn store(tmp: &std::path::Path) -> FrameStore {
    FrameStore::new(FrameStoreOpts {
        offload_delay_ms: 60_000,
        dir: Some(tmp.to_path_buf()),
        worker_threads: Some(1),
        ..FrameStoreOpts::default()
    })
    .unwrap()
}

fn opts(seed: u64) -> GeneratorOpts {
    GeneratorOpts {
        min_size: 4.0,
        max_size: 20.0,
        threads: Some(3),
        seed: Some(seed),
        ..GeneratorOpts::default()
    }
}

fn canvas() -> Canvas {
    Canvas::new(48, 40).unwrap()
}

#[test]
fn generates_frames_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = BatchGenerator::new(store(tmp.path()), canvas(), opts(42)).unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = generator
        .generate(25, move |frames| tx.send(frames).unwrap())
        .unwrap();
    assert_eq!(handle.wait(), GenerationOutcome::Completed { frames: 25 });
    let frames = rx.recv().unwrap();
    assert!(rx.try_recv().is_err());
    assert_eq!(frames.len(), 25);

    let mut plan = MotionPlan::new(Rng64::new(42), canvas().rect(), &opts(42));
    let painter = ShapePainter {
        canvas: canvas(),
        shape: plan.shape(),
        style: ToolConfig::default(),
    };
    let mut expected = Vec::new();
    for chunk in 0..3 {
        let segment = plan.next_segment();
        let steps = if chunk == 2 { 5 } else { 10 };
        for i in 0..steps {
            expected.push(painter.paint(segment.at(i)).unwrap());
        }
    }
    for (i, (frame, want)) in frames.iter().zip(&expected).enumerate() {
        assert_eq!(frame.image().as_ref(), Some(want), "frame {i}");
    }
}

#[test]
fn segments_chain_and_stay_inside_bounds() {
    let bounds = Rect::new(5.0, 5.0, 60.0, 45.0);
    let o = GeneratorOpts {
        min_size: 10.0,
        max_size: 250.0,
        ..GeneratorOpts::default()
    };
    let mut plan = MotionPlan::new(Rng64::new(3), bounds, &o);
    assert!(GENERATED_SHAPES.contains(&plan.shape()));
    let mut prev = plan.next_segment();
    for _ in 0..50 {
        let seg = plan.next_segment();
        assert_eq!(seg.from, prev.to);
        for key in [seg.from, seg.to] {
            assert!(key.size <= 40.0 + 1e-9);
            let r = key.rect();
            assert!(r.x0 >= bounds.x0 - 1e-9 && r.x1 <= bounds.x1 + 1e-9);
            assert!(r.y0 >= bounds.y0 - 1e-9 && r.y1 <= bounds.y1 + 1e-9);
        }
        assert_eq!(seg.at(0), seg.from);
        prev = seg;
    }
}

#[test]
fn count_is_validated() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = BatchGenerator::new(
        store(tmp.path()),
        canvas(),
        GeneratorOpts {
            max_count: 30,
            ..opts(1)
        },
    )
    .unwrap();
    assert!(generator.generate(0, |_| {}).is_err());
    assert!(generator.generate(31, |_| {}).is_err());
}

#[test]
fn bad_size_range_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let o = GeneratorOpts {
        min_size: 30.0,
        max_size: 10.0,
        ..GeneratorOpts::default()
    };
    assert!(BatchGenerator::new(store(tmp.path()), canvas(), o).is_err());
}

#[test]
fn cancelled_run_never_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = BatchGenerator::new(store(tmp.path()), canvas(), opts(5)).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let (tx, rx) = mpsc::channel::<Vec<Frame>>();
    let handle = generator
        .generate_with_cancel(40, cancel, move |frames| tx.send(frames).unwrap())
        .unwrap();
    assert_eq!(handle.wait(), GenerationOutcome::Cancelled);
    assert!(handle.is_cancelled());
    assert!(rx.recv().is_err());
}

#[test]
fn cancel_after_first_chunk_suppresses_completion() {
    let tmp = tempfile::tempdir().unwrap();
    let o = GeneratorOpts {
        threads: Some(1),
        ..opts(9)
    };
    let generator = BatchGenerator::new(store(tmp.path()), canvas(), o).unwrap();
    let cancel = CancelToken::new();
    let in_hook = cancel.clone();
    let (tx, rx) = mpsc::channel::<Vec<Frame>>();
    let handle = generator
        .start(
            25,
            cancel,
            Box::new(move |frames: Vec<Frame>| tx.send(frames).unwrap()),
            Some(Arc::new(move |_chunk: usize| in_hook.cancel())),
        )
        .unwrap();

    assert_eq!(handle.wait(), GenerationOutcome::Cancelled);
    assert!(rx.recv().is_err());
    let rendered = handle.run.slots.iter().filter(|s| s.get().is_some()).count();
    assert!(rendered > 0 && rendered < 25, "rendered {rendered}");
}
