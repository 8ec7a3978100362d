use std::sync::mpsc;

use super::*;

fn pool() -> Arc<rayon::ThreadPool> {
    Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap(),
    )
}

#[test]
fn jobs_run_in_due_order() {
    let timer = Deferred::new(pool()).unwrap();
    let (tx, rx) = mpsc::channel();
    for (delay, tag) in [(60u64, 'c'), (5, 'a'), (30, 'b')] {
        let tx = tx.clone();
        timer.schedule(Duration::from_millis(delay), move || {
            let _ = tx.send(tag);
        });
    }
    let got: Vec<char> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(got, vec!['a', 'b', 'c']);
}

#[test]
fn job_does_not_run_early() {
    let timer = Deferred::new(pool()).unwrap();
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    timer.schedule(Duration::from_millis(80), move || {
        let _ = tx.send(Instant::now());
    });
    let ran_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(ran_at - start >= Duration::from_millis(80));
}

#[test]
fn pending_jobs_are_dropped_with_the_timer() {
    let timer = Deferred::new(pool()).unwrap();
    let (tx, rx) = mpsc::channel::<()>();
    timer.schedule(Duration::from_secs(30), move || {
        let _ = tx.send(());
    });
    drop(timer);
    // The sender was dropped together with the discarded job.
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    );
}

#[test]
fn arming_invalidates_older_tickets() {
    let slot = TaskSlot::default();
    let first = slot.arm();
    assert!(slot.is_current(first));
    let second = slot.arm();
    assert!(!slot.is_current(first));
    assert!(slot.is_current(second));
    slot.cancel();
    assert!(!slot.is_current(second));
}
