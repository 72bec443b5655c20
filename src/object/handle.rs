/*!
 * Object Handles
 *
 * `RawHandle` is an uncounted interface pointer exposing the identity
 * capability directly. `Unknown` owns one reference: cloning adds a
 * reference, dropping releases it.
 */

use super::abi::{HResult, RawObject, UnknownVtbl};
use super::iid::{InterfaceId, IID_IUNKNOWN};
use super::traits::Interface;
use super::validate::is_valid_interface;
use crate::core::errors::{ObjectError, ObjectResult};
use crate::core::types::RefCount;
use std::fmt;
use std::ptr::{self, NonNull};

/// Uncounted interface pointer
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<RawObject>);

// SAFETY: every object reachable through a handle keeps its mutable state
// behind atomics or locks, so handles may cross threads.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    #[inline]
    pub const fn new(ptr: NonNull<RawObject>) -> Self {
        Self(ptr)
    }

    /// Wrap an interface pointer; `None` when null
    #[inline]
    pub fn from_ptr(ptr: *mut RawObject) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut RawObject {
        self.0.as_ptr()
    }

    /// Defensive shape check; never dereferences unreadable memory
    #[inline]
    pub fn is_valid(self) -> bool {
        is_valid_interface(self.as_ptr())
    }

    #[inline]
    unsafe fn vtbl(self) -> &'static UnknownVtbl {
        &*(*self.as_ptr()).vtbl
    }

    /// Capability lookup through slot 0
    ///
    /// On success the returned alias carries its own reference.
    ///
    /// # Safety
    /// The handle must be live.
    pub unsafe fn query_interface(self, iid: &InterfaceId) -> ObjectResult<RawHandle> {
        let mut out: *mut RawObject = ptr::null_mut();
        let hr = (self.vtbl().query_interface)(self.as_ptr(), iid, &mut out);

        match hr {
            hr if hr.is_ok() => Self::from_ptr(out).ok_or(ObjectError::Status(HResult::E_POINTER)),
            HResult::E_NOINTERFACE => Err(ObjectError::InterfaceNotSupported { iid: *iid }),
            hr => Err(ObjectError::Status(hr)),
        }
    }

    /// # Safety
    /// The handle must be live.
    #[inline]
    pub unsafe fn add_ref(self) -> RefCount {
        (self.vtbl().add_ref)(self.as_ptr())
    }

    /// # Safety
    /// The handle must be live and the caller must own the reference being
    /// dropped; after a zero return the handle is dangling.
    #[inline]
    pub unsafe fn release(self) -> RefCount {
        (self.vtbl().release)(self.as_ptr())
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:p})", self.0)
    }
}

impl fmt::Pointer for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

/// Owned base-identity handle
pub struct Unknown {
    raw: RawHandle,
}

unsafe impl Interface for Unknown {
    const IID: InterfaceId = IID_IUNKNOWN;

    #[inline]
    unsafe fn from_raw(handle: RawHandle) -> Self {
        Self { raw: handle }
    }

    #[inline]
    fn as_raw(&self) -> RawHandle {
        self.raw
    }
}

impl Unknown {
    /// Untyped lookup by identifier, returning the alias as a base handle
    pub fn query_interface(&self, iid: &InterfaceId) -> ObjectResult<Unknown> {
        // SAFETY: self holds a reference
        let handle = unsafe { self.raw.query_interface(iid)? };
        // SAFETY: every object answers the base identity; one reference was added
        Ok(unsafe { Unknown::from_raw(handle) })
    }
}

impl Clone for Unknown {
    fn clone(&self) -> Self {
        // SAFETY: self holds a reference
        unsafe { self.raw.add_ref() };
        Self { raw: self.raw }
    }
}

impl Drop for Unknown {
    fn drop(&mut self) {
        // SAFETY: self owns exactly one reference
        unsafe { self.raw.release() };
    }
}

impl fmt::Debug for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown({:p})", self.raw)
    }
}
