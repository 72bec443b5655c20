/*!
 * Object Traits
 * Implementation-side and handle-side capability abstractions
 */

use super::abi::RawObject;
use super::handle::RawHandle;
use super::iid::InterfaceId;
use crate::core::errors::ObjectResult;
use crate::core::types::RefCount;
use std::ptr::NonNull;

/// An object implementation reachable through a dispatch table
///
/// # Safety
/// Implementors must be `#[repr(C)]` with a [`RawObject`] as their first
/// field, and that header must point at a table whose entries were built
/// for the same implementation type.
///
/// The table must be at least as large as every interface listed in
/// `INTERFACES` requires: an implementor listing `IID_IMALLOC` must point
/// its header at a complete `MallocVtbl`, because `Malloc` handles read the
/// allocator slots that follow the base entries.
pub unsafe trait ComObject: Send + Sync + Sized + 'static {
    /// Identifiers this implementation answers to
    const INTERFACES: &'static [InterfaceId];

    fn supports(iid: &InterfaceId) -> bool {
        Self::INTERFACES.contains(iid)
    }

    /// Add a reference, returning the new count
    fn add_ref(&self) -> RefCount;

    /// Drop a reference, returning the remaining count
    ///
    /// # Safety
    /// `this` must be live. When zero is returned the storage is gone.
    unsafe fn release(this: NonNull<Self>) -> RefCount;

    /// Header pointer handed out as the interface pointer
    #[inline]
    fn header(&self) -> *mut RawObject {
        self as *const Self as *mut RawObject
    }
}

/// A typed handle that owns one reference to an object
///
/// # Safety
/// `from_raw` must only accept handles whose object answered `IID`, and
/// `as_raw` must return the handle the value was built from.
pub unsafe trait Interface: Sized {
    const IID: InterfaceId;

    /// Adopt one reference held by `handle`
    ///
    /// # Safety
    /// The handle must be live, answer `Self::IID`, and the caller must
    /// transfer one reference.
    unsafe fn from_raw(handle: RawHandle) -> Self;

    fn as_raw(&self) -> RawHandle;

    /// Give up ownership without releasing
    fn into_raw(self) -> RawHandle {
        let handle = self.as_raw();
        std::mem::forget(self);
        handle
    }

    /// Capability lookup; a successful lookup holds its own reference
    fn query<I: Interface>(&self) -> ObjectResult<I> {
        // SAFETY: self holds a reference, so the handle is live
        let handle = unsafe { self.as_raw().query_interface(&I::IID)? };
        // SAFETY: query_interface succeeded for I::IID and added a reference
        Ok(unsafe { I::from_raw(handle) })
    }

    /// Whether two handles alias the same object
    fn same_object<I: Interface>(&self, other: &I) -> bool {
        self.as_raw() == other.as_raw()
    }

    /// Live-map validation; only meaningful where
    /// [`validate::is_supported`](super::validate::is_supported) holds
    fn is_valid(&self) -> bool {
        self.as_raw().is_valid()
    }
}
