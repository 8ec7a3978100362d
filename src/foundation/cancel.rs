use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag. Long-running jobs poll it between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/cancel.rs"]
mod tests;
