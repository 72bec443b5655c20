/*!
 * Native Allocator Tests
 * Heap round trips through the pinned allocator
 */

use iface_kernel::{AllocError, BlockRef, LegacyAllocator, NativeAllocator, ObjectError, Ownership};
use pretty_assertions::assert_eq;
use serial_test::serial;

#[test]
#[serial]
fn test_round_trip_sizes() {
    let malloc = NativeAllocator::instance();
    for size in [0usize, 1, 7, 64, 1000, 4096, 1 << 20] {
        let block = malloc.alloc(size).unwrap();
        assert!(!block.is_null());
        assert!(malloc.get_size(block).unwrap() >= size);
        assert_eq!(malloc.did_alloc(block), Ownership::Unknown);
        malloc.free(block).unwrap();
    }
}

#[test]
#[serial]
fn test_realloc_preserves_prefix() {
    let malloc = NativeAllocator::instance();
    let pattern: Vec<u8> = (0..200u8).collect();

    let block = malloc.alloc(pattern.len()).unwrap();
    NativeAllocator::write(block, 0, &pattern).unwrap();

    let grown = malloc.realloc(block, 10_000).unwrap();
    let mut buf = vec![0u8; pattern.len()];
    NativeAllocator::read(grown, 0, &mut buf).unwrap();
    assert_eq!(buf, pattern);

    let shrunk = malloc.realloc(grown, 50).unwrap();
    let mut buf = vec![0u8; 50];
    NativeAllocator::read(shrunk, 0, &mut buf).unwrap();
    assert_eq!(&buf[..], &pattern[..50]);

    malloc.free(shrunk).unwrap();
}

#[test]
#[serial]
fn test_failed_realloc_keeps_block() {
    let malloc = NativeAllocator::instance();
    let block = malloc.alloc(32).unwrap();
    NativeAllocator::write(block, 0, b"kept").unwrap();

    assert!(malloc.realloc(block, usize::MAX).is_err());

    let mut buf = [0u8; 4];
    NativeAllocator::read(block, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"kept");
    malloc.free(block).unwrap();
}

#[test]
#[serial]
fn test_oversized_alloc_fails() {
    let malloc = NativeAllocator::instance();
    assert_eq!(
        malloc.alloc(usize::MAX).unwrap_err(),
        ObjectError::Allocation(AllocError::OutOfMemory { requested: usize::MAX })
    );
}

#[test]
#[serial]
fn test_foreign_blocks_rejected() {
    let malloc = NativeAllocator::instance();
    let legacy = LegacyAllocator::new().unwrap();
    let segmented = legacy.alloc(16).unwrap();

    assert_eq!(
        malloc.free(segmented).unwrap_err(),
        ObjectError::Allocation(AllocError::InvalidBlock(segmented))
    );
    assert!(malloc.get_size(BlockRef(0x1234)).is_err());
    legacy.free(segmented).unwrap();
}

#[test]
#[serial]
fn test_free_null_is_noop() {
    let malloc = NativeAllocator::instance();
    malloc.free(BlockRef::NULL).unwrap();
}

#[test]
#[serial]
fn test_stats_track_live_blocks() {
    let malloc = NativeAllocator::instance();
    let before = NativeAllocator::stats();

    let blocks: Vec<_> = (0..10).map(|_| malloc.alloc(100).unwrap()).collect();
    let during = NativeAllocator::stats();
    assert_eq!(during.live_blocks, before.live_blocks + 10);
    assert!(during.live_bytes >= before.live_bytes + 1000);

    for block in blocks {
        malloc.free(block).unwrap();
    }
    assert_eq!(NativeAllocator::stats(), before);
}
