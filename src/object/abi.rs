/*!
 * Dispatch ABI
 *
 * Fixed-layout dispatch tables and the object header every interface pointer
 * refers to. Slot order is the method identity: QueryInterface, AddRef and
 * Release lead every table; allocator tables append their six methods.
 */

use super::iid::InterfaceId;
use crate::core::types::{BlockRef, RefCount, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code returned through dispatch tables
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: Self = Self(0);
    pub const E_NOINTERFACE: Self = Self(0x8000_4002_u32 as i32);
    pub const E_POINTER: Self = Self(0x8000_4003_u32 as i32);
    pub const E_UNEXPECTED: Self = Self(0x8000_FFFF_u32 as i32);
    pub const E_OUTOFMEMORY: Self = Self(0x8007_000E_u32 as i32);
    pub const E_INVALIDARG: Self = Self(0x8007_0057_u32 as i32);

    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub const fn is_err(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::S_OK => "S_OK",
            Self::E_NOINTERFACE => "E_NOINTERFACE",
            Self::E_POINTER => "E_POINTER",
            Self::E_UNEXPECTED => "E_UNEXPECTED",
            Self::E_OUTOFMEMORY => "E_OUTOFMEMORY",
            Self::E_INVALIDARG => "E_INVALIDARG",
            _ => return write!(f, "HResult({})", self),
        };
        write!(f, "{}", name)
    }
}

/// Header at offset zero of every object; an interface pointer points here
#[repr(C)]
pub struct RawObject {
    pub vtbl: *const UnknownVtbl,
}

impl RawObject {
    #[inline]
    pub const fn new(vtbl: &'static UnknownVtbl) -> Self {
        Self { vtbl }
    }
}

pub type QueryInterfaceFn =
    unsafe extern "C" fn(this: *mut RawObject, iid: *const InterfaceId, out: *mut *mut RawObject) -> HResult;
pub type AddRefFn = unsafe extern "C" fn(this: *mut RawObject) -> RefCount;
pub type ReleaseFn = unsafe extern "C" fn(this: *mut RawObject) -> RefCount;

/// Identity capability table
#[repr(C)]
#[derive(Clone, Copy)]
pub struct UnknownVtbl {
    pub query_interface: QueryInterfaceFn,
    pub add_ref: AddRefFn,
    pub release: ReleaseFn,
}

pub type AllocFn = unsafe extern "C" fn(this: *mut RawObject, size: Size, out: *mut BlockRef) -> HResult;
pub type ReallocFn =
    unsafe extern "C" fn(this: *mut RawObject, block: BlockRef, size: Size, out: *mut BlockRef) -> HResult;
pub type FreeFn = unsafe extern "C" fn(this: *mut RawObject, block: BlockRef) -> HResult;
pub type GetSizeFn = unsafe extern "C" fn(this: *mut RawObject, block: BlockRef, out: *mut Size) -> HResult;
/// Returns 1 (owned), 0 (not owned) or -1 (unknown)
pub type DidAllocFn = unsafe extern "C" fn(this: *mut RawObject, block: BlockRef) -> i32;
pub type HeapMinimizeFn = unsafe extern "C" fn(this: *mut RawObject);

/// Allocator capability table; begins with the identity table
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MallocVtbl {
    pub base: UnknownVtbl,
    pub alloc: AllocFn,
    pub realloc: ReallocFn,
    pub free: FreeFn,
    pub get_size: GetSizeFn,
    pub did_alloc: DidAllocFn,
    pub heap_minimize: HeapMinimizeFn,
}

impl MallocVtbl {
    /// The identity prefix, suitable for an object header
    #[inline]
    pub fn as_unknown(&self) -> &UnknownVtbl {
        &self.base
    }
}

impl fmt::Debug for MallocVtbl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MallocVtbl@{:p}", self)
    }
}
