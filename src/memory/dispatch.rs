/*!
 * Allocator Dispatch Entries
 *
 * Table entries for the six allocator methods, generic over the
 * implementation. Errors cross the table as status codes; null-block
 * conventions are handled here so every backend shares them:
 * - Free(null) succeeds without effect
 * - Realloc(null, n) behaves as Alloc(n)
 * - Realloc(block, 0) frees the block and yields null
 */

use super::traits::AllocatorService;
use super::types::Ownership;
use crate::core::types::{BlockRef, Size};
use crate::object::{HResult, MallocVtbl, RawObject, UnknownVtbl};
use tracing::trace;

#[inline]
unsafe fn service<'a, T: AllocatorService>(this: *mut RawObject) -> Option<&'a T> {
    (this as *const T).as_ref()
}

/// Alloc entry
///
/// # Safety
/// `this` must be a live object of type `T`; `out` must be writable.
pub unsafe extern "C" fn alloc<T: AllocatorService>(
    this: *mut RawObject,
    size: Size,
    out: *mut BlockRef,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    *out = BlockRef::NULL;
    let Some(object) = service::<T>(this) else {
        return HResult::E_POINTER;
    };
    trace!(target: "relay", "({:p})->Alloc({})", this, size);

    match object.allocate(size) {
        Ok(block) => {
            *out = block;
            HResult::S_OK
        }
        Err(e) => {
            log::debug!("Alloc of {} bytes failed: {}", size, e);
            e.status()
        }
    }
}

/// Realloc entry
///
/// # Safety
/// `this` must be a live object of type `T`; `out` must be writable.
pub unsafe extern "C" fn realloc<T: AllocatorService>(
    this: *mut RawObject,
    block: BlockRef,
    size: Size,
    out: *mut BlockRef,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    *out = BlockRef::NULL;
    let Some(object) = service::<T>(this) else {
        return HResult::E_POINTER;
    };
    trace!(target: "relay", "({:p})->Realloc({},{})", this, block, size);

    let result = if block.is_null() {
        object.allocate(size)
    } else if size == 0 {
        object.deallocate(block).map(|()| BlockRef::NULL)
    } else {
        object.reallocate(block, size)
    };

    match result {
        Ok(moved) => {
            *out = moved;
            HResult::S_OK
        }
        Err(e) => {
            log::debug!("Realloc of {} to {} bytes failed: {}", block, size, e);
            e.status()
        }
    }
}

/// Free entry
///
/// # Safety
/// `this` must be a live object of type `T`.
pub unsafe extern "C" fn free<T: AllocatorService>(this: *mut RawObject, block: BlockRef) -> HResult {
    let Some(object) = service::<T>(this) else {
        return HResult::E_POINTER;
    };
    trace!(target: "relay", "({:p})->Free({})", this, block);

    if block.is_null() {
        return HResult::S_OK;
    }
    match object.deallocate(block) {
        Ok(()) => HResult::S_OK,
        Err(e) => {
            log::warn!("Rejected free of {}: {}", block, e);
            e.status()
        }
    }
}

/// GetSize entry
///
/// # Safety
/// `this` must be a live object of type `T`; `out` must be writable.
pub unsafe extern "C" fn get_size<T: AllocatorService>(
    this: *mut RawObject,
    block: BlockRef,
    out: *mut Size,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    *out = 0;
    let Some(object) = service::<T>(this) else {
        return HResult::E_POINTER;
    };
    trace!(target: "relay", "({:p})->GetSize({})", this, block);

    match object.block_size(block) {
        Ok(size) => {
            *out = size;
            HResult::S_OK
        }
        Err(e) => e.status(),
    }
}

/// DidAlloc entry
///
/// # Safety
/// `this` must be a live object of type `T`.
pub unsafe extern "C" fn did_alloc<T: AllocatorService>(this: *mut RawObject, block: BlockRef) -> i32 {
    trace!(target: "relay", "({:p})->DidAlloc({})", this, block);
    match service::<T>(this) {
        Some(object) => object.did_alloc(block).as_raw(),
        None => Ownership::Unknown.as_raw(),
    }
}

/// HeapMinimize entry
///
/// # Safety
/// `this` must be a live object of type `T`.
pub unsafe extern "C" fn heap_minimize<T: AllocatorService>(this: *mut RawObject) {
    trace!(target: "relay", "({:p})->HeapMinimize()", this);
    if let Some(object) = service::<T>(this) {
        object.minimize();
    }
}

impl MallocVtbl {
    /// Allocator table built from `T`'s implementation
    pub const fn of<T: AllocatorService>() -> Self {
        Self {
            base: UnknownVtbl::of::<T>(),
            alloc: alloc::<T>,
            realloc: realloc::<T>,
            free: free::<T>,
            get_size: get_size::<T>,
            did_alloc: did_alloc::<T>,
            heap_minimize: heap_minimize::<T>,
        }
    }
}
