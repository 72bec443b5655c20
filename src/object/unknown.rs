/*!
 * Base Object
 * Heap-allocated counted object answering only the base identity
 */

use super::abi::{RawObject, UnknownVtbl};
use super::handle::{RawHandle, Unknown};
use super::iid::{InterfaceId, IID_IUNKNOWN};
use super::refcount::RefCounter;
use super::traits::{ComObject, Interface};
use crate::core::types::RefCount;
use std::ptr::NonNull;
use tracing::debug;

static UNKNOWN_VTBL: UnknownVtbl = UnknownVtbl::of::<UnknownObject>();

/// Base object: dispatch header plus reference count
#[repr(C)]
pub struct UnknownObject {
    header: RawObject,
    refs: RefCounter,
}

// SAFETY: the header only points at an immutable static table; the count is atomic
unsafe impl Send for UnknownObject {}
unsafe impl Sync for UnknownObject {}

impl UnknownObject {
    /// Construct a base object with one reference
    pub fn create() -> Unknown {
        let object = Box::new(Self {
            header: RawObject::new(&UNKNOWN_VTBL),
            refs: RefCounter::new(),
        });
        let raw = NonNull::from(Box::leak(object)).cast::<RawObject>();
        debug!(object = ?raw, "Constructed base object");

        // SAFETY: freshly constructed with a count of one, answers IID_IUNKNOWN
        unsafe { Unknown::from_raw(RawHandle::new(raw)) }
    }
}

unsafe impl ComObject for UnknownObject {
    const INTERFACES: &'static [InterfaceId] = &[IID_IUNKNOWN];

    fn add_ref(&self) -> RefCount {
        self.refs.increment()
    }

    unsafe fn release(this: NonNull<Self>) -> RefCount {
        let remaining = this.as_ref().refs.decrement();
        if remaining == 0 {
            debug!(object = ?this, "Base object released");
            drop(Box::from_raw(this.as_ptr()));
        }
        remaining
    }
}
