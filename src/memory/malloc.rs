/*!
 * Allocator Handle
 * Owned handle dispatching through an allocator table
 */

use super::types::{AllocError, Ownership};
use crate::core::errors::{ObjectError, ObjectResult};
use crate::core::types::{BlockRef, Size};
use crate::object::{HResult, InterfaceId, Interface, MallocVtbl, RawHandle, Unknown, IID_IMALLOC};
use std::fmt;

/// Owned allocator handle; one reference, released on drop
pub struct Malloc {
    raw: RawHandle,
}

unsafe impl Interface for Malloc {
    const IID: InterfaceId = IID_IMALLOC;

    #[inline]
    unsafe fn from_raw(handle: RawHandle) -> Self {
        Self { raw: handle }
    }

    #[inline]
    fn as_raw(&self) -> RawHandle {
        self.raw
    }
}

/// Map a failed status back to a typed error
fn status_error(hr: HResult, fallback: AllocError) -> ObjectError {
    match hr {
        HResult::E_OUTOFMEMORY | HResult::E_INVALIDARG => ObjectError::Allocation(fallback),
        hr => ObjectError::Status(hr),
    }
}

impl Malloc {
    #[inline]
    fn vtbl(&self) -> &MallocVtbl {
        // SAFETY: handles are only built for objects answering IID_IMALLOC,
        // whose tables begin with the identity prefix of a MallocVtbl
        unsafe { &*((*self.raw.as_ptr()).vtbl as *const MallocVtbl) }
    }

    pub fn alloc(&self, size: Size) -> ObjectResult<BlockRef> {
        let mut out = BlockRef::NULL;
        // SAFETY: self holds a reference; out is a local
        let hr = unsafe { (self.vtbl().alloc)(self.raw.as_ptr(), size, &mut out) };
        if hr.is_ok() {
            Ok(out)
        } else {
            Err(status_error(hr, AllocError::OutOfMemory { requested: size }))
        }
    }

    /// Resize a block; a null block allocates, a zero size frees
    pub fn realloc(&self, block: BlockRef, size: Size) -> ObjectResult<BlockRef> {
        let mut out = BlockRef::NULL;
        // SAFETY: self holds a reference; out is a local
        let hr = unsafe { (self.vtbl().realloc)(self.raw.as_ptr(), block, size, &mut out) };
        if hr.is_ok() {
            Ok(out)
        } else {
            let fallback = match hr {
                HResult::E_INVALIDARG => AllocError::InvalidBlock(block),
                _ => AllocError::OutOfMemory { requested: size },
            };
            Err(status_error(hr, fallback))
        }
    }

    pub fn free(&self, block: BlockRef) -> ObjectResult<()> {
        // SAFETY: self holds a reference
        let hr = unsafe { (self.vtbl().free)(self.raw.as_ptr(), block) };
        if hr.is_ok() {
            Ok(())
        } else {
            Err(status_error(hr, AllocError::InvalidBlock(block)))
        }
    }

    pub fn get_size(&self, block: BlockRef) -> ObjectResult<Size> {
        let mut out: Size = 0;
        // SAFETY: self holds a reference; out is a local
        let hr = unsafe { (self.vtbl().get_size)(self.raw.as_ptr(), block, &mut out) };
        if hr.is_ok() {
            Ok(out)
        } else {
            Err(status_error(hr, AllocError::InvalidBlock(block)))
        }
    }

    pub fn did_alloc(&self, block: BlockRef) -> Ownership {
        // SAFETY: self holds a reference
        Ownership::from_raw(unsafe { (self.vtbl().did_alloc)(self.raw.as_ptr(), block) })
    }

    pub fn heap_minimize(&self) {
        // SAFETY: self holds a reference
        unsafe { (self.vtbl().heap_minimize)(self.raw.as_ptr()) }
    }

    /// Base-identity alias of this allocator
    pub fn to_unknown(&self) -> ObjectResult<Unknown> {
        self.query::<Unknown>()
    }
}

impl Clone for Malloc {
    fn clone(&self) -> Self {
        // SAFETY: self holds a reference
        unsafe { self.raw.add_ref() };
        Self { raw: self.raw }
    }
}

impl Drop for Malloc {
    fn drop(&mut self) {
        // SAFETY: self owns exactly one reference
        unsafe { self.raw.release() };
    }
}

impl fmt::Debug for Malloc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malloc({:p})", self.raw)
    }
}
