/*!
 * Validator Tests
 * Handle shape checks against the live process memory map
 */

use iface_kernel::object::validate::{is_supported, is_valid_interface_in, MemoryMap};
use iface_kernel::object::{RawObject, UnknownVtbl};
use iface_kernel::{is_valid_interface, Interface, LegacyAllocator, NativeAllocator, UnknownObject};
use pretty_assertions::assert_eq;
use std::ptr;

#[test]
fn test_null_handle_invalid() {
    assert!(!is_valid_interface(ptr::null()));
}

#[test]
fn test_null_table_invalid() {
    let object = RawObject { vtbl: ptr::null() };
    assert!(!is_valid_interface(&object));
}

#[test]
fn test_null_first_slot_invalid() {
    let table = Box::new([0usize; 3]);
    let object = RawObject {
        vtbl: table.as_ptr() as *const UnknownVtbl,
    };
    assert!(!is_valid_interface(&object));
}

#[test]
fn test_non_executable_slot_invalid() {
    // First slot points at readable heap data, which is not executable
    let data = Box::new([0x90u8; 64]);
    let table = Box::new([data.as_ptr() as usize; 3]);
    let object = RawObject {
        vtbl: table.as_ptr() as *const UnknownVtbl,
    };
    assert!(!is_valid_interface(&object));
}

#[test]
fn test_empty_map_rejects_everything() {
    let unknown = UnknownObject::create();
    let map = MemoryMap::parse("");
    assert!(!is_valid_interface_in(&map, unknown.as_raw().as_ptr()));
}

#[test]
fn test_constructed_handles_follow_platform_support() {
    // Valid wherever a live memory map exists, rejected everywhere else
    let unknown = UnknownObject::create();
    assert_eq!(unknown.is_valid(), is_supported());

    let native = NativeAllocator::instance();
    assert_eq!(native.is_valid(), is_supported());

    let legacy = LegacyAllocator::new().unwrap();
    assert_eq!(legacy.is_valid(), is_supported());
}

#[cfg(target_os = "linux")]
#[test]
fn test_live_map_available_on_linux() {
    assert!(is_supported());
    assert!(!MemoryMap::snapshot().unwrap().regions().is_empty());
}
