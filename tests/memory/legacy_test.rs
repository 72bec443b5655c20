/*!
 * Legacy Allocator Tests
 * Arena isolation and block integrity across alloc/free/realloc
 */

use iface_kernel::memory::legacy::SegPtr;
use iface_kernel::{
    AllocError, BlockRef, LegacyAllocator, Malloc, MemoryPressure, NativeAllocator, ObjectError, Ownership,
};
use pretty_assertions::assert_eq;
use serial_test::serial;

const BLOCK: usize = 1000;
const BLOCKS: usize = 64;

fn marker(index: usize) -> Vec<u8> {
    vec![(index as u8).wrapping_mul(7).wrapping_add(1); BLOCK]
}

#[test]
fn test_fill_free_realloc_keeps_markers() {
    let legacy = LegacyAllocator::new().unwrap();

    // 64 x 1000 bytes fills the arena exactly
    let mut blocks: Vec<BlockRef> = (0..BLOCKS)
        .map(|i| {
            let block = legacy.alloc(BLOCK).unwrap();
            legacy.write(block, 0, &marker(i)).unwrap();
            block
        })
        .collect();
    assert!(legacy.alloc(1).is_err());
    assert_eq!(legacy.stats().memory_pressure(), MemoryPressure::Critical);

    for i in (1..BLOCKS).step_by(2) {
        legacy.free(blocks[i]).unwrap();
    }

    // Grows into the freed neighbour or moves; either way contents survive
    blocks[0] = legacy.realloc(blocks[0], BLOCK + 500).unwrap();

    for i in (0..BLOCKS).step_by(2) {
        let mut buf = vec![0u8; BLOCK];
        legacy.read(blocks[i], 0, &mut buf).unwrap();
        assert_eq!(buf, marker(i), "block {} corrupted", i);
    }
}

#[test]
fn test_fill_free_one_alloc_same_size_keeps_markers() {
    let legacy = LegacyAllocator::new().unwrap();
    let mut blocks: Vec<BlockRef> = (0..BLOCKS)
        .map(|i| {
            let block = legacy.alloc(BLOCK).unwrap();
            legacy.write(block, 0, &marker(i)).unwrap();
            block
        })
        .collect();
    assert!(legacy.alloc(1).is_err());

    const HOLE: usize = 17;
    legacy.free(blocks[HOLE]).unwrap();

    // The only free range is the hole, so the new block lands exactly there
    let refill = legacy.alloc(BLOCK).unwrap();
    assert_eq!(refill, blocks[HOLE]);
    legacy.write(refill, 0, &marker(HOLE)).unwrap();
    blocks[HOLE] = refill;
    assert!(legacy.alloc(1).is_err());

    for (i, block) in blocks.iter().enumerate() {
        let mut buf = vec![0u8; BLOCK];
        legacy.read(*block, 0, &mut buf).unwrap();
        assert_eq!(buf, marker(i), "block {} corrupted", i);
    }
}

#[test]
#[serial]
fn test_native_block_unknown_to_legacy() {
    let legacy = LegacyAllocator::new().unwrap();
    let native = NativeAllocator::instance();
    let from_native = native.alloc(64).unwrap();

    assert!(legacy.get_size(from_native).is_err());
    assert!(legacy.realloc(from_native, 128).is_err());
    assert_eq!(native.get_size(from_native).unwrap(), 64);

    let from_legacy = legacy.alloc(64).unwrap();
    assert!(native.get_size(from_legacy).is_err());
    assert_eq!(legacy.get_size(from_legacy).unwrap(), 64);

    native.free(from_native).unwrap();
    legacy.free(from_legacy).unwrap();
}

#[test]
#[serial]
fn test_arenas_do_not_cross_accept() {
    let a = LegacyAllocator::new().unwrap();
    let b = LegacyAllocator::new().unwrap();
    let native = NativeAllocator::instance();

    let from_a = a.alloc(128).unwrap();
    let from_native = native.alloc(128).unwrap();

    assert_eq!(
        b.free(from_a).unwrap_err(),
        ObjectError::Allocation(AllocError::InvalidBlock(from_a))
    );
    assert!(b.realloc(from_a, 256).is_err());
    assert!(a.free(from_native).is_err());
    assert!(native.free(from_a).is_err());

    // Direct arena access reports the owner
    let mut buf = [0u8; 4];
    assert_eq!(
        b.read(from_a, 0, &mut buf).unwrap_err(),
        AllocError::ForeignBlock {
            block: from_a,
            owner: a.selector().0,
            expected: b.selector().0,
        }
    );

    a.free(from_a).unwrap();
    native.free(from_native).unwrap();
}

#[test]
fn test_blocks_are_segmented() {
    let legacy = LegacyAllocator::new().unwrap();
    let block = legacy.alloc(10).unwrap();

    let ptr = SegPtr::from_block(block).unwrap();
    assert_eq!(ptr.selector, legacy.selector());
    assert_eq!(legacy.get_size(block).unwrap(), 16);
    assert_eq!(legacy.did_alloc(block), Ownership::Unknown);
}

#[test]
fn test_heap_minimize_coalesces() {
    let legacy = LegacyAllocator::new().unwrap();
    let blocks: Vec<_> = (0..16).map(|_| legacy.alloc(512).unwrap()).collect();
    for block in blocks {
        legacy.free(block).unwrap();
    }
    assert!(legacy.stats().free_ranges > 1);

    legacy.heap_minimize();
    let stats = legacy.stats();
    assert_eq!(stats.free_ranges, 1);
    assert_eq!(stats.largest_free, stats.capacity);
}

#[test]
fn test_handles_share_one_count() {
    let legacy = LegacyAllocator::new().unwrap();
    let extra = Malloc::clone(&legacy);
    assert_eq!(legacy.ref_count(), 2);

    let block = extra.alloc(24).unwrap();
    drop(extra);
    assert_eq!(legacy.ref_count(), 1);
    assert_eq!(legacy.get_size(block).unwrap(), 24);

    let malloc = legacy.into_malloc();
    malloc.free(block).unwrap();
}
