//! Cooperative cancellation checked between transport steps

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Clones share one flag. The engine polls it before every step; a cancelled
/// run returns [`DispersionError::Cancelled`](crate::DispersionError::Cancelled)
/// and never exposes its partial grid.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancel: Arc<AtomicBool>,
}

// Compile-time assertion: tokens cross rayon worker threads
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<CancellationToken>();
};

impl CancellationToken {
    /// A token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}
