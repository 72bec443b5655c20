/*!
 * Memory Traits
 * Allocator service abstraction behind the allocator dispatch table
 */

use super::types::{MemoryResult, Ownership};
use crate::core::types::{BlockRef, Size};
use crate::object::ComObject;

/// Allocator service implementation
pub trait AllocatorService: ComObject {
    /// Allocate a block of at least `size` bytes
    fn allocate(&self, size: Size) -> MemoryResult<BlockRef>;

    /// Resize a block, preserving its contents up to the smaller size
    ///
    /// On failure the original block is left untouched.
    fn reallocate(&self, block: BlockRef, size: Size) -> MemoryResult<BlockRef>;

    /// Release a block issued by this allocator
    fn deallocate(&self, block: BlockRef) -> MemoryResult<()>;

    /// Bookkeeping size of a live block
    fn block_size(&self, block: BlockRef) -> MemoryResult<Size>;

    /// Ownership is not tracked by default
    fn did_alloc(&self, _block: BlockRef) -> Ownership {
        Ownership::Unknown
    }

    /// Advisory compaction hook
    fn minimize(&self) {}
}
