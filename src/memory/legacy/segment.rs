/*!
 * Segmented Addressing
 * Selector + offset pairs and the process-wide selector pool
 */

use crate::core::limits::FIRST_SELECTOR;
use crate::core::types::BlockRef;
use crate::memory::types::{AllocError, MemoryResult};
use crossbeam_queue::SegQueue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Segment selector naming one arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(pub u16);

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// Segmented address: selector plus 16-bit offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegPtr {
    pub selector: Selector,
    pub offset: u16,
}

impl SegPtr {
    #[inline]
    pub const fn new(selector: Selector, offset: u16) -> Self {
        Self { selector, offset }
    }

    /// Pack as `selector << 16 | offset` for the dispatch table
    #[inline]
    pub fn to_block(self) -> BlockRef {
        BlockRef(((self.selector.0 as usize) << 16) | self.offset as usize)
    }

    /// Unpack a block word; `None` for null or words wider than 32 bits
    #[inline]
    pub fn from_block(block: BlockRef) -> Option<Self> {
        let raw = u32::try_from(block.raw()).ok()?;
        let selector = (raw >> 16) as u16;
        if selector == 0 {
            return None;
        }
        Some(Self::new(Selector(selector), raw as u16))
    }
}

impl fmt::Display for SegPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:04x}", self.selector, self.offset)
    }
}

/// Selector generator with recycling
///
/// Released selectors are reused first through a lock-free queue; fresh
/// selectors come from an atomic counter until the 16-bit space runs out.
pub struct SelectorPool {
    next: AtomicU32,
    recycled: SegQueue<u16>,
}

impl SelectorPool {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(FIRST_SELECTOR as u32),
            recycled: SegQueue::new(),
        }
    }

    /// Process-wide pool shared by every arena
    pub fn global() -> &'static SelectorPool {
        static POOL: OnceLock<SelectorPool> = OnceLock::new();
        POOL.get_or_init(SelectorPool::new)
    }

    pub fn allocate(&self) -> MemoryResult<Selector> {
        if let Some(sel) = self.recycled.pop() {
            return Ok(Selector(sel));
        }

        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n <= u16::MAX as u32).then_some(n + 1)
            })
            .map(|n| Selector(n as u16))
            .map_err(|_| AllocError::SelectorsExhausted)
    }

    pub fn recycle(&self, selector: Selector) {
        self.recycled.push(selector.0);
    }

    /// Selectors waiting for reuse
    pub fn recycled(&self) -> usize {
        self.recycled.len()
    }
}

impl Default for SelectorPool {
    fn default() -> Self {
        Self::new()
    }
}
