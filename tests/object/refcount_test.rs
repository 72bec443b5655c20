/*!
 * Reference Counting Tests
 * AddRef/Release bookkeeping on counted and pinned objects
 */

use iface_kernel::{Interface, NativeAllocator, Unknown, UnknownObject};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn test_n_add_refs_then_n_plus_one_releases() {
    const N: u32 = 5;
    let raw = UnknownObject::create().into_raw();

    unsafe {
        for i in 0..N {
            assert_eq!(raw.add_ref(), i + 2);
        }
        for i in (1..=N).rev() {
            assert_eq!(raw.release(), i);
        }
        // The construction reference is the last one
        assert_eq!(raw.release(), 0);
    }
}

#[test]
fn test_clone_and_drop_balance() {
    let unknown = UnknownObject::create();
    let raw = unknown.as_raw();

    let copies: Vec<_> = (0..4).map(|_| unknown.clone()).collect();
    unsafe {
        assert_eq!(raw.add_ref(), 6);
        assert_eq!(raw.release(), 5);
    }
    drop(copies);
    unsafe {
        assert_eq!(raw.add_ref(), 2);
        assert_eq!(raw.release(), 1);
    }
}

#[test]
fn test_concurrent_add_ref_release() {
    let unknown = Arc::new(UnknownObject::create());
    let raw = unknown.as_raw();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let unknown = Arc::clone(&unknown);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let copy = Unknown::clone(&unknown);
                    drop(copy);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    unsafe {
        assert_eq!(raw.add_ref(), 2);
        assert_eq!(raw.release(), 1);
    }
}

#[test]
fn test_singleton_count_is_constant() {
    let malloc = NativeAllocator::instance();
    let raw = malloc.as_raw();

    unsafe {
        for _ in 0..100 {
            assert_eq!(raw.add_ref(), 1);
        }
        for _ in 0..250 {
            assert_eq!(raw.release(), 1);
        }
    }

    let block = malloc.alloc(64).unwrap();
    malloc.free(block).unwrap();
    assert_eq!(NativeAllocator::instance().as_raw(), raw);
}
