//! Cooperative cancellation.
//!
//! The host exposes a poll-style "should I stop?" query. Dispatchers call
//! [`AbortSignal::should_abort`] once per row, never per pixel.
//!
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use fxkit_core::{AbortSignal, NeverAbort};
//!
//! let flag = AtomicBool::new(false);
//! assert!(!flag.should_abort());
//! flag.store(true, Ordering::Relaxed);
//! assert!(flag.should_abort());
//!
//! assert!(!NeverAbort.should_abort());
//! assert!((|| true).should_abort());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of a render call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Every row of the window was written.
    Completed,
    /// The host cancelled; rows after the cancellation point are unwritten.
    Aborted,
}

impl RenderStatus {
    /// Whether the render was cancelled.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Poll-style cancellation query shared by all render workers.
pub trait AbortSignal: Sync {
    /// Returns `true` once the host wants the render to stop.
    fn should_abort(&self) -> bool;
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAbort;

impl AbortSignal for NeverAbort {
    #[inline]
    fn should_abort(&self) -> bool {
        false
    }
}

impl AbortSignal for AtomicBool {
    #[inline]
    fn should_abort(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> AbortSignal for F
where
    F: Fn() -> bool + Sync,
{
    #[inline]
    fn should_abort(&self) -> bool {
        self()
    }
}
