/*!
 * Native Allocator
 *
 * Process-wide pinned allocator over the process heap. A live-block ledger
 * records every issued block with its layout, so sizes come from
 * bookkeeping and foreign or repeated frees are rejected instead of
 * reaching the heap.
 */

use super::malloc::Malloc;
use super::traits::AllocatorService;
use super::types::{AllocError, MemoryResult, NativeStats};
use crate::core::limits::{NATIVE_ALIGN, PINNED_REFCOUNT};
use crate::core::types::{Address, BlockRef, RefCount, Size};
use crate::object::{ComObject, Interface, InterfaceId, MallocVtbl, RawHandle, RawObject, IID_IMALLOC, IID_IUNKNOWN};
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info};
use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::OnceLock;

static NATIVE_VTBL: MallocVtbl = MallocVtbl::of::<NativeMalloc>();
static NATIVE: OnceLock<NativeMalloc> = OnceLock::new();

/// Pinned heap-backed allocator object
#[repr(C)]
pub struct NativeMalloc {
    header: RawObject,
    ledger: DashMap<Address, Layout, RandomState>,
}

// SAFETY: the header points at an immutable static table; the ledger is concurrent
unsafe impl Send for NativeMalloc {}
unsafe impl Sync for NativeMalloc {}

impl NativeMalloc {
    fn new() -> Self {
        info!("Native allocator initialized");
        Self {
            header: RawObject::new(NATIVE_VTBL.as_unknown()),
            ledger: DashMap::with_hasher(RandomState::new()),
        }
    }

    fn layout(size: Size) -> MemoryResult<Layout> {
        Layout::from_size_align(size.max(1), NATIVE_ALIGN).map_err(|_| AllocError::SizeOverflow(size))
    }

    fn stats(&self) -> NativeStats {
        let live_bytes = self.ledger.iter().map(|entry| entry.value().size()).sum();
        NativeStats {
            live_blocks: self.ledger.len(),
            live_bytes,
        }
    }

    /// Run `f` over a live block's bytes while its ledger entry is held
    fn with_block<R>(
        &self,
        block: BlockRef,
        offset: Size,
        len: Size,
        f: impl FnOnce(*mut u8) -> R,
    ) -> MemoryResult<R> {
        let entry = self
            .ledger
            .get(&block.raw())
            .ok_or(AllocError::InvalidBlock(block))?;
        let size = entry.value().size();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(f(block.as_ptr().wrapping_add(offset))),
            _ => Err(AllocError::OutOfBounds {
                block,
                offset,
                len,
                size,
            }),
        }
    }
}

unsafe impl ComObject for NativeMalloc {
    const INTERFACES: &'static [InterfaceId] = &[IID_IUNKNOWN, IID_IMALLOC];

    fn add_ref(&self) -> RefCount {
        PINNED_REFCOUNT
    }

    unsafe fn release(_this: NonNull<Self>) -> RefCount {
        PINNED_REFCOUNT
    }
}

impl AllocatorService for NativeMalloc {
    fn allocate(&self, size: Size) -> MemoryResult<BlockRef> {
        let layout = Self::layout(size)?;
        // SAFETY: layout has a non-zero size
        let ptr = unsafe { std::alloc::alloc(layout) };
        if ptr.is_null() {
            return Err(AllocError::OutOfMemory { requested: size });
        }
        self.ledger.insert(ptr as Address, layout);
        Ok(BlockRef::from_ptr(ptr))
    }

    fn reallocate(&self, block: BlockRef, size: Size) -> MemoryResult<BlockRef> {
        let new_layout = Self::layout(size)?;
        let (address, old_layout) = self
            .ledger
            .remove(&block.raw())
            .ok_or(AllocError::InvalidBlock(block))?;

        // SAFETY: the ledger proves the block came from alloc with old_layout;
        // the new size was validated against the same alignment
        let ptr = unsafe { std::alloc::realloc(address as *mut u8, old_layout, new_layout.size()) };
        if ptr.is_null() {
            self.ledger.insert(address, old_layout);
            return Err(AllocError::OutOfMemory { requested: size });
        }

        self.ledger.insert(ptr as Address, new_layout);
        if ptr as Address != address {
            debug!("Native block moved {} -> {:p} ({} bytes)", block, ptr, size);
        }
        Ok(BlockRef::from_ptr(ptr))
    }

    fn deallocate(&self, block: BlockRef) -> MemoryResult<()> {
        let (address, layout) = self
            .ledger
            .remove(&block.raw())
            .ok_or(AllocError::InvalidBlock(block))?;
        // SAFETY: the ledger entry was just removed, so this is the only free
        unsafe { std::alloc::dealloc(address as *mut u8, layout) };
        Ok(())
    }

    fn block_size(&self, block: BlockRef) -> MemoryResult<Size> {
        self.ledger
            .get(&block.raw())
            .map(|entry| entry.value().size())
            .ok_or(AllocError::InvalidBlock(block))
    }
}

fn native() -> &'static NativeMalloc {
    NATIVE.get_or_init(NativeMalloc::new)
}

/// Process-wide native allocator service
pub struct NativeAllocator;

impl NativeAllocator {
    /// Handle to the pinned native allocator
    ///
    /// Every call yields the same object; its reference count is cosmetic.
    pub fn instance() -> Malloc {
        let raw = NonNull::from(&native().header);
        // SAFETY: the singleton answers IID_IMALLOC and is never destroyed
        unsafe { Malloc::from_raw(RawHandle::new(raw)) }
    }

    pub fn stats() -> NativeStats {
        native().stats()
    }

    /// Copy bytes out of a live block
    pub fn read(block: BlockRef, offset: Size, buf: &mut [u8]) -> MemoryResult<()> {
        native().with_block(block, offset, buf.len(), |src| {
            // SAFETY: range checked against the ledger size; entry held
            unsafe { std::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) }
        })
    }

    /// Copy bytes into a live block
    pub fn write(block: BlockRef, offset: Size, data: &[u8]) -> MemoryResult<()> {
        native().with_block(block, offset, data.len(), |dst| {
            // SAFETY: range checked against the ledger size; entry held
            unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) }
        })
    }
}
