/*!
 * Core Types
 * Common types used across the runtime
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Linear address in the native address space
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Reference count reported by AddRef/Release
pub type RefCount = u32;

/// Opaque block word that crosses a dispatch table
///
/// Native allocators put a linear address here; segmented allocators put a
/// packed `selector:offset` pair. Only the allocator that issued a block knows
/// how to interpret it.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockRef(pub usize);

impl BlockRef {
    /// The null block (never issued by any allocator)
    pub const NULL: Self = Self(0);

    #[inline]
    pub fn from_ptr(ptr: *mut u8) -> Self {
        Self(ptr as usize)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut u8 {
        self.0 as *mut u8
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::Pointer for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}
