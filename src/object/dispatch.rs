/*!
 * Identity Dispatch Entries
 * Table entries shared by every ComObject implementation
 */

use super::abi::{HResult, RawObject, UnknownVtbl};
use super::iid::InterfaceId;
use super::traits::ComObject;
use crate::core::types::RefCount;
use std::ptr::{self, NonNull};
use tracing::trace;

/// QueryInterface entry
///
/// # Safety
/// `this` must be a live object of type `T`; `iid` and `out` must be valid
/// for read and write respectively.
pub unsafe extern "C" fn query_interface<T: ComObject>(
    this: *mut RawObject,
    iid: *const InterfaceId,
    out: *mut *mut RawObject,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    *out = ptr::null_mut();
    if this.is_null() || iid.is_null() {
        return HResult::E_POINTER;
    }

    let iid = &*iid;
    trace!(target: "relay", "({:p})->QueryInterface({:?},{:p})", this, iid, out);

    if T::supports(iid) {
        (*(this as *const T)).add_ref();
        *out = this;
        HResult::S_OK
    } else {
        HResult::E_NOINTERFACE
    }
}

/// AddRef entry
///
/// # Safety
/// `this` must be a live object of type `T`.
pub unsafe extern "C" fn add_ref<T: ComObject>(this: *mut RawObject) -> RefCount {
    trace!(target: "relay", "({:p})->AddRef()", this);
    match (this as *const T).as_ref() {
        Some(object) => object.add_ref(),
        None => 0,
    }
}

/// Release entry
///
/// # Safety
/// `this` must be a live object of type `T`; after a zero return it is gone.
pub unsafe extern "C" fn release<T: ComObject>(this: *mut RawObject) -> RefCount {
    trace!(target: "relay", "({:p})->Release()", this);
    match NonNull::new(this as *mut T) {
        Some(object) => T::release(object),
        None => 0,
    }
}

impl UnknownVtbl {
    /// Identity table built from `T`'s implementation
    pub const fn of<T: ComObject>() -> Self {
        Self {
            query_interface: query_interface::<T>,
            add_ref: add_ref::<T>,
            release: release::<T>,
        }
    }
}
