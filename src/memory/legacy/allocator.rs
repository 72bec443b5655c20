/*!
 * Legacy Allocator
 *
 * Counted allocator object over one segment arena. Its dispatch table is
 * not built locally: it is the table the resolver assembled from the
 * service module's exports, shared by every instance in the process.
 *
 * Unlike the classic segmented allocator, whose AddRef and Release were
 * pinned and never freed the object, instances here are really counted:
 * the last Release drops the arena and returns its selector to the pool.
 * Only the service registry's task allocator stays pinned, by holding its
 * reference for the life of the process.
 */

use super::arena::SegmentArena;
use super::resolver::LegacyResolver;
use super::segment::Selector;
use crate::core::errors::ObjectResult;
use crate::core::types::{BlockRef, RefCount, Size};
use crate::memory::malloc::Malloc;
use crate::memory::traits::AllocatorService;
use crate::memory::types::{ArenaStats, MemoryResult};
use crate::object::{ComObject, Interface, InterfaceId, MallocVtbl, RawHandle, RawObject, RefCounter, IID_IMALLOC, IID_IUNKNOWN};
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

/// Arena-backed allocator object
#[repr(C)]
pub struct SegmentedMalloc {
    header: RawObject,
    refs: RefCounter,
    arena: Mutex<SegmentArena>,
}

// SAFETY: the header points at a table that is never mutated once resolved;
// the count is atomic and the arena is behind its own lock
unsafe impl Send for SegmentedMalloc {}
unsafe impl Sync for SegmentedMalloc {}

unsafe impl ComObject for SegmentedMalloc {
    const INTERFACES: &'static [InterfaceId] = &[IID_IUNKNOWN, IID_IMALLOC];

    fn add_ref(&self) -> RefCount {
        self.refs.increment()
    }

    unsafe fn release(this: NonNull<Self>) -> RefCount {
        let remaining = this.as_ref().refs.decrement();
        if remaining == 0 {
            debug!("Legacy allocator {:p} released", this);
            drop(Box::from_raw(this.as_ptr()));
        }
        remaining
    }
}

impl AllocatorService for SegmentedMalloc {
    fn allocate(&self, size: Size) -> MemoryResult<BlockRef> {
        self.arena.lock().alloc(size)
    }

    fn reallocate(&self, block: BlockRef, size: Size) -> MemoryResult<BlockRef> {
        self.arena.lock().realloc(block, size)
    }

    fn deallocate(&self, block: BlockRef) -> MemoryResult<()> {
        self.arena.lock().free(block)
    }

    fn block_size(&self, block: BlockRef) -> MemoryResult<Size> {
        self.arena.lock().size(block)
    }

    fn minimize(&self) {
        self.arena.lock().coalesce();
    }
}

/// Owned handle to a legacy allocator, with arena-level access
///
/// Dereferences to [`Malloc`] for the allocator capability.
pub struct LegacyAllocator {
    malloc: Malloc,
    object: NonNull<SegmentedMalloc>,
}

// SAFETY: the handle keeps the object alive; SegmentedMalloc is Sync
unsafe impl Send for LegacyAllocator {}
unsafe impl Sync for LegacyAllocator {}

impl LegacyAllocator {
    /// Construct against the process-wide resolver
    pub fn new() -> ObjectResult<Self> {
        Self::with_resolver(LegacyResolver::global())
    }

    /// Construct against a specific resolver
    ///
    /// Fails with a fatal configuration error when the resolver's table
    /// cannot be built; the failure is final for that resolver.
    pub fn with_resolver(resolver: &'static LegacyResolver) -> ObjectResult<Self> {
        let table: &'static MallocVtbl = resolver.table()?;
        let arena = SegmentArena::new()?;
        let selector = arena.selector();

        let object = Box::new(SegmentedMalloc {
            header: RawObject::new(table.as_unknown()),
            refs: RefCounter::new(),
            arena: Mutex::new(arena),
        });
        let object = NonNull::from(Box::leak(object));
        debug!("Legacy allocator {:p} bound to arena {}", object, selector);

        // SAFETY: freshly constructed with one reference; answers IID_IMALLOC
        let malloc = unsafe { Malloc::from_raw(RawHandle::new(object.cast::<RawObject>())) };
        Ok(Self { malloc, object })
    }

    #[inline]
    fn object(&self) -> &SegmentedMalloc {
        // SAFETY: self.malloc holds a reference, so the object is live
        unsafe { self.object.as_ref() }
    }

    pub fn selector(&self) -> Selector {
        self.object().arena.lock().selector()
    }

    pub fn stats(&self) -> ArenaStats {
        self.object().arena.lock().stats()
    }

    /// Copy bytes out of a block of this arena
    pub fn read(&self, block: BlockRef, offset: Size, buf: &mut [u8]) -> MemoryResult<()> {
        self.object().arena.lock().read(block, offset, buf)
    }

    /// Copy bytes into a block of this arena
    pub fn write(&self, block: BlockRef, offset: Size, data: &[u8]) -> MemoryResult<()> {
        self.object().arena.lock().write(block, offset, data)
    }

    /// The dispatch table this object was bound to
    pub fn table_ptr(&self) -> *const MallocVtbl {
        self.object().header.vtbl as *const MallocVtbl
    }

    /// Current reference count
    pub fn ref_count(&self) -> RefCount {
        self.object().refs.count()
    }

    /// Keep only the allocator capability
    pub fn into_malloc(self) -> Malloc {
        self.malloc
    }
}

impl Deref for LegacyAllocator {
    type Target = Malloc;

    fn deref(&self) -> &Malloc {
        &self.malloc
    }
}

impl fmt::Debug for LegacyAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LegacyAllocator({:p}, arena {})", self.object, self.selector())
    }
}
