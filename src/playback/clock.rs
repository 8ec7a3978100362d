use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Background thread that calls `tick` once per period until dropped.
///
/// Deadlines are absolute, so a slow tick shortens the next wait instead of drifting. If the
/// thread falls more than a full period behind it skips ahead rather than bursting.
pub struct FrameClock {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    period: Duration,
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("period", &self.period)
            .finish()
    }
}

impl FrameClock {
    pub fn start(period: Duration, tick: impl Fn() + Send + 'static) -> std::io::Result<Self> {
        let period = period.max(Duration::from_millis(1));
        let (stop, stopped) = mpsc::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("flipbook-clock".to_owned())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stopped.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            tick();
                            deadline += period;
                            let now = Instant::now();
                            if deadline + period < now {
                                deadline = now + period;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            })?;
        tracing::debug!(period_ms = period.as_millis() as u64, "frame clock started");
        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.thread.take()
            && handle.thread().id() != std::thread::current().id()
        {
            let _ = handle.join();
        }
        tracing::debug!("frame clock stopped");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/clock.rs"]
mod tests;
