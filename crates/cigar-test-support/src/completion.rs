//! Completion counter — counts completion-callback invocations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out completion callbacks and records how often they fired.
#[derive(Debug, Clone, Default)]
pub struct CompletionCounter {
    calls: Arc<AtomicUsize>,
}

impl CompletionCounter {
    /// Create a counter with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a callback that increments this counter when invoked.
    #[must_use]
    pub fn callback(&self) -> impl FnOnce() + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of times a callback from this counter has fired.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
