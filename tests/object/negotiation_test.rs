/*!
 * Interface Negotiation Tests
 * QueryInterface matching, aliasing and failure shape
 */

use iface_kernel::object::{RawObject, UnknownVtbl};
use iface_kernel::{
    HResult, Interface, InterfaceId, LegacyAllocator, Malloc, NativeAllocator, ObjectError, Unknown, UnknownObject,
    IID_IMALLOC, IID_IUNKNOWN,
};
use pretty_assertions::assert_eq;
use std::ptr;
use uuid::Uuid;

fn random_iid() -> InterfaceId {
    InterfaceId::from(Uuid::new_v4())
}

#[test]
fn test_own_identity_yields_alias() {
    let unknown = UnknownObject::create();
    let alias = unknown.query_interface(&IID_IUNKNOWN).unwrap();
    assert!(alias.same_object(&unknown));
}

#[test]
fn test_unregistered_identifier_rejected() {
    let unknown = UnknownObject::create();
    let iid = random_iid();

    assert_eq!(
        unknown.query_interface(&iid).unwrap_err(),
        ObjectError::InterfaceNotSupported { iid }
    );
}

#[test]
fn test_failed_query_writes_null_alias() {
    let unknown = UnknownObject::create();
    let raw = unknown.as_raw();
    let iid = random_iid();

    unsafe {
        let vtbl: &UnknownVtbl = &*(*raw.as_ptr()).vtbl;
        let mut out = raw.as_ptr();
        let hr = (vtbl.query_interface)(raw.as_ptr(), &iid, &mut out);
        assert_eq!(hr, HResult::E_NOINTERFACE);
        assert_eq!(out, ptr::null_mut::<RawObject>());

        // Count unchanged by the failed query
        assert_eq!(raw.add_ref(), 2);
        assert_eq!(raw.release(), 1);
    }
}

#[test]
fn test_query_null_out_rejected() {
    let unknown = UnknownObject::create();
    let raw = unknown.as_raw();
    unsafe {
        let vtbl: &UnknownVtbl = &*(*raw.as_ptr()).vtbl;
        let hr = (vtbl.query_interface)(raw.as_ptr(), &IID_IUNKNOWN, ptr::null_mut());
        assert_eq!(hr, HResult::E_POINTER);
    }
}

#[test]
fn test_base_object_has_no_allocator() {
    let unknown = UnknownObject::create();
    let err = unknown.query::<Malloc>().unwrap_err();
    assert_eq!(err, ObjectError::InterfaceNotSupported { iid: IID_IMALLOC });
    assert!(!err.is_fatal());
}

#[test]
fn test_singleton_answers_both_identities() {
    let malloc = NativeAllocator::instance();
    let unknown = malloc.query::<Unknown>().unwrap();
    let again = unknown.query::<Malloc>().unwrap();
    assert!(again.same_object(&malloc));
    assert!(unknown.same_object(&malloc));
}

#[test]
fn test_legacy_allocator_negotiation() {
    let legacy = LegacyAllocator::new().unwrap();
    let unknown = legacy.query::<Unknown>().unwrap();
    assert!(unknown.same_object(&*legacy));
    assert!(matches!(
        unknown.query_interface(&random_iid()),
        Err(ObjectError::InterfaceNotSupported { .. })
    ));
}
