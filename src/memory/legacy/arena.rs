/*!
 * Segment Arena
 *
 * One bounded segment addressed by selector:offset. Blocks are carved from
 * a segregated free list at arena granularity; adjacent free ranges are
 * merged periodically, on an allocation miss, and on HeapMinimize.
 */

use super::free_list::{FreeRange, SegregatedFreeList};
use super::segment::{SegPtr, Selector, SelectorPool};
use crate::core::limits::{ARENA_GRANULARITY, DEALLOC_COALESCE_INTERVAL, LEGACY_ARENA_SIZE};
use crate::core::types::{BlockRef, Size};
use crate::memory::types::{AllocError, ArenaStats, MemoryResult};
use ahash::AHashMap;
use log::{debug, info, warn};

/// Round a request up to arena granularity; zero-byte requests get one unit
fn granular(size: Size) -> Option<Size> {
    let size = size.max(1);
    size.checked_add(ARENA_GRANULARITY - 1)
        .map(|s| s & !(ARENA_GRANULARITY - 1))
}

pub struct SegmentArena {
    selector: Selector,
    memory: Box<[u8]>,
    free_list: SegregatedFreeList,
    /// Live blocks: offset -> bookkeeping size
    live: AHashMap<u16, Size>,
    used: Size,
    frees_since_coalesce: u64,
}

impl SegmentArena {
    /// Create an arena with a fresh selector from the global pool
    pub fn new() -> MemoryResult<Self> {
        let selector = SelectorPool::global().allocate()?;
        Ok(Self::with_selector(selector))
    }

    fn with_selector(selector: Selector) -> Self {
        let mut free_list = SegregatedFreeList::new();
        free_list.insert(FreeRange {
            offset: 0,
            size: LEGACY_ARENA_SIZE,
        });
        info!("Segment arena {} created ({} bytes)", selector, LEGACY_ARENA_SIZE);

        Self {
            selector,
            memory: vec![0u8; LEGACY_ARENA_SIZE].into_boxed_slice(),
            free_list,
            live: AHashMap::new(),
            used: 0,
            frees_since_coalesce: 0,
        }
    }

    #[inline]
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Resolve a block word to a live block of this arena
    fn resolve(&self, block: BlockRef) -> MemoryResult<(u16, Size)> {
        let ptr = SegPtr::from_block(block).ok_or(AllocError::InvalidBlock(block))?;
        if ptr.selector != self.selector {
            return Err(AllocError::ForeignBlock {
                block,
                owner: ptr.selector.0,
                expected: self.selector.0,
            });
        }
        self.live
            .get(&ptr.offset)
            .map(|size| (ptr.offset, *size))
            .ok_or(AllocError::InvalidBlock(block))
    }

    fn issue(&mut self, range: FreeRange, size: Size) -> BlockRef {
        if range.size > size {
            self.free_list.insert(FreeRange {
                offset: range.offset + size,
                size: range.size - size,
            });
        }
        let offset = range.offset as u16;
        self.live.insert(offset, size);
        self.used += size;
        SegPtr::new(self.selector, offset).to_block()
    }

    fn release_range(&mut self, range: FreeRange) {
        self.free_list.insert(range);
        self.frees_since_coalesce += 1;
        if self.frees_since_coalesce >= DEALLOC_COALESCE_INTERVAL {
            self.coalesce();
        }
    }

    pub fn alloc(&mut self, size: Size) -> MemoryResult<BlockRef> {
        let rounded = granular(size)
            .filter(|s| *s <= LEGACY_ARENA_SIZE)
            .ok_or(AllocError::OutOfMemory { requested: size })?;

        let range = match self.free_list.take_fit(rounded) {
            Some(range) => range,
            None => {
                self.coalesce();
                self.free_list.take_fit(rounded).ok_or_else(|| {
                    warn!(
                        "Arena {} exhausted: requested {} bytes, {} free",
                        self.selector,
                        size,
                        self.free_list.total()
                    );
                    AllocError::OutOfMemory { requested: size }
                })?
            }
        };

        Ok(self.issue(range, rounded))
    }

    /// Resize in place when possible, otherwise move
    pub fn realloc(&mut self, block: BlockRef, size: Size) -> MemoryResult<BlockRef> {
        let (offset, old) = self.resolve(block)?;
        let rounded = granular(size)
            .filter(|s| *s <= LEGACY_ARENA_SIZE)
            .ok_or(AllocError::OutOfMemory { requested: size })?;

        if rounded <= old {
            if rounded < old {
                self.live.insert(offset, rounded);
                self.used -= old - rounded;
                self.release_range(FreeRange {
                    offset: offset as usize + rounded,
                    size: old - rounded,
                });
            }
            return Ok(block);
        }

        // Grow into the free ranges that directly follow, if together they fit
        let tail = offset as usize + old;
        let extra = rounded - old;
        let mut gathered = Vec::new();
        let mut cursor = tail;
        let mut have = 0;
        while have < extra {
            match self.free_list.take_at(cursor) {
                Some(next) => {
                    cursor = next.end();
                    have += next.size;
                    gathered.push(next);
                }
                None => break,
            }
        }

        if have >= extra {
            self.free_list.insert(FreeRange {
                offset: tail + extra,
                size: have - extra,
            });
            self.live.insert(offset, rounded);
            self.used += extra;
            debug!("Arena block {} grown in place to {} bytes", block, rounded);
            return Ok(block);
        }
        for range in gathered {
            self.free_list.insert(range);
        }

        let moved = self.alloc(size)?;
        let dst = SegPtr::from_block(moved).map_or(0, |p| p.offset as usize);
        let src = offset as usize;
        self.memory.copy_within(src..src + old, dst);
        self.free(block)?;
        debug!("Arena block {} moved to {} ({} bytes)", block, moved, rounded);
        Ok(moved)
    }

    pub fn free(&mut self, block: BlockRef) -> MemoryResult<()> {
        let (offset, size) = self.resolve(block)?;
        self.live.remove(&offset);
        self.used -= size;
        self.release_range(FreeRange {
            offset: offset as usize,
            size,
        });
        Ok(())
    }

    pub fn size(&self, block: BlockRef) -> MemoryResult<Size> {
        self.resolve(block).map(|(_, size)| size)
    }

    fn span(&self, block: BlockRef, offset: Size, len: Size) -> MemoryResult<std::ops::Range<usize>> {
        let (start, size) = self.resolve(block)?;
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(start as usize + offset..start as usize + end),
            _ => Err(AllocError::OutOfBounds {
                block,
                offset,
                len,
                size,
            }),
        }
    }

    pub fn read(&self, block: BlockRef, offset: Size, buf: &mut [u8]) -> MemoryResult<()> {
        let span = self.span(block, offset, buf.len())?;
        buf.copy_from_slice(&self.memory[span]);
        Ok(())
    }

    pub fn write(&mut self, block: BlockRef, offset: Size, data: &[u8]) -> MemoryResult<()> {
        let span = self.span(block, offset, data.len())?;
        self.memory[span].copy_from_slice(data);
        Ok(())
    }

    /// Merge adjacent free ranges
    pub fn coalesce(&mut self) -> usize {
        self.frees_since_coalesce = 0;
        let merges = self.free_list.coalesce();
        if merges > 0 {
            debug!("Arena {} coalesced {} free ranges", self.selector, merges);
        }
        merges
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            selector: self.selector.0,
            capacity: LEGACY_ARENA_SIZE,
            used: self.used,
            available: LEGACY_ARENA_SIZE - self.used,
            usage_percentage: (self.used as f64 / LEGACY_ARENA_SIZE as f64) * 100.0,
            live_blocks: self.live.len(),
            free_ranges: self.free_list.len(),
            largest_free: self.free_list.largest(),
        }
    }
}

impl Drop for SegmentArena {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            debug!(
                "Arena {} released with {} live blocks ({} bytes)",
                self.selector,
                self.live.len(),
                self.used
            );
        }
        SelectorPool::global().recycle(self.selector);
    }
}

impl std::fmt::Debug for SegmentArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentArena")
            .field("selector", &self.selector)
            .field("used", &self.used)
            .field("live_blocks", &self.live.len())
            .finish()
    }
}
