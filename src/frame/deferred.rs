use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Scheduled {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

#[derive(Default)]
struct TimerState {
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Single timer thread that hands due jobs to a rayon pool.
///
/// Jobs still pending when the timer is dropped are discarded without running.
pub(crate) struct Deferred {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Deferred {
    pub(crate) fn new(pool: Arc<rayon::ThreadPool>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState::default()),
            wake: Condvar::new(),
        });
        let worker = shared.clone();
        let thread = std::thread::Builder::new()
            .name("flipbook-deferred".to_owned())
            .spawn(move || run_timer(&worker, &pool))?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub(crate) fn schedule(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        let Ok(mut state) = self.shared.state.lock() else {
            return;
        };
        if state.shutdown {
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(Reverse(Scheduled {
            due: Instant::now() + delay,
            seq,
            job: Box::new(job),
        }));
        drop(state);
        self.shared.wake.notify_one();
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.shutdown = true;
            state.queue.clear();
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.thread.take()
            && handle.thread().id() != std::thread::current().id()
        {
            let _ = handle.join();
        }
    }
}

fn run_timer(shared: &Shared, pool: &rayon::ThreadPool) {
    let Ok(mut state) = shared.state.lock() else {
        return;
    };
    loop {
        if state.shutdown {
            return;
        }
        let now = Instant::now();
        let next_due = state.queue.peek().map(|Reverse(s)| s.due);
        state = match next_due {
            Some(due) if due <= now => {
                if let Some(Reverse(item)) = state.queue.pop() {
                    pool.spawn(item.job);
                }
                state
            }
            Some(due) => match shared.wake.wait_timeout(state, due - now) {
                Ok((guard, _)) => guard,
                Err(_) => return,
            },
            None => match shared.wake.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            },
        };
    }
}

/// Cancel-and-reschedule token for one kind of pending task.
///
/// Arming returns a fresh ticket and implicitly cancels every earlier one, so only the most
/// recently scheduled task may act.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot(AtomicU64);

impl TaskSlot {
    pub(crate) fn arm(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/deferred.rs"]
mod tests;
