/*!
 * Reference Counting
 * Atomic counted-ownership cell shared by every counted object
 */

use crate::core::types::RefCount;
use std::sync::atomic::{fence, AtomicU32, Ordering};

/// Atomic reference counter starting at one
///
/// Handles may be shared across threads, so every mutation is atomic.
/// Increments saturate at `u32::MAX`; a decrement observed at zero is an
/// over-release by the caller and is reported without wrapping.
#[derive(Debug)]
pub struct RefCounter(AtomicU32);

impl RefCounter {
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Add a reference, returning the new count
    #[inline]
    pub fn increment(&self) -> RefCount {
        match self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some(c.saturating_add(1)))
        {
            Ok(prev) | Err(prev) => prev.saturating_add(1),
        }
    }

    /// Drop a reference, returning the remaining count
    ///
    /// A return of zero means the caller now owns destruction.
    #[inline]
    pub fn decrement(&self) -> RefCount {
        match self
            .0
            .fetch_update(Ordering::Release, Ordering::Relaxed, |c| c.checked_sub(1))
        {
            Ok(1) => {
                // Synchronize with every earlier release before storage is freed
                fence(Ordering::Acquire);
                0
            }
            Ok(prev) => prev - 1,
            Err(_) => {
                log::error!("Reference count released below zero");
                0
            }
        }
    }

    #[inline]
    pub fn count(&self) -> RefCount {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for RefCounter {
    fn default() -> Self {
        Self::new()
    }
}
