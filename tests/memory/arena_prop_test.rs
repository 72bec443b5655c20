/*!
 * Arena Property Tests
 * Random alloc/free/realloc sequences keep blocks disjoint and intact
 */

use iface_kernel::core::limits::LEGACY_ARENA_SIZE;
use iface_kernel::memory::legacy::{SegPtr, SegmentArena};
use iface_kernel::BlockRef;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
    Realloc(usize, usize),
    Coalesce,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..3000).prop_map(Op::Alloc),
        3 => any::<usize>().prop_map(Op::Free),
        2 => (any::<usize>(), 1usize..4000).prop_map(|(i, s)| Op::Realloc(i, s)),
        1 => Just(Op::Coalesce),
    ]
}

struct Live {
    block: BlockRef,
    requested: usize,
    fill: u8,
}

fn check(arena: &SegmentArena, live: &[Live]) {
    let mut spans: Vec<(usize, usize)> = live
        .iter()
        .map(|l| {
            let offset = SegPtr::from_block(l.block).unwrap().offset as usize;
            (offset, offset + arena.size(l.block).unwrap())
        })
        .collect();
    spans.sort();
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping blocks {:?}", pair);
    }
    assert!(spans.last().map_or(true, |s| s.1 <= LEGACY_ARENA_SIZE));

    for l in live {
        let mut buf = vec![0u8; l.requested];
        arena.read(l.block, 0, &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == l.fill));
    }

    let stats = arena.stats();
    let used: usize = live.iter().map(|l| arena.size(l.block).unwrap()).sum();
    assert_eq!(stats.used, used);
    assert_eq!(stats.live_blocks, live.len());
    assert_eq!(stats.used + stats.available, LEGACY_ARENA_SIZE);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_arena_sequences(ops in prop::collection::vec(op(), 1..120)) {
        let mut arena = SegmentArena::new().unwrap();
        let mut live: Vec<Live> = Vec::new();
        let mut next_fill = 1u8;

        for op in ops {
            match op {
                Op::Alloc(size) => {
                    if let Ok(block) = arena.alloc(size) {
                        arena.write(block, 0, &vec![next_fill; size]).unwrap();
                        live.push(Live { block, requested: size, fill: next_fill });
                        next_fill = next_fill.wrapping_add(1).max(1);
                    }
                }
                Op::Free(i) if !live.is_empty() => {
                    let l = live.swap_remove(i % live.len());
                    arena.free(l.block).unwrap();
                    prop_assert!(arena.free(l.block).is_err());
                }
                Op::Realloc(i, size) if !live.is_empty() => {
                    let idx = i % live.len();
                    let (requested, fill) = (live[idx].requested, live[idx].fill);
                    if let Ok(block) = arena.realloc(live[idx].block, size) {
                        let mut kept = vec![0u8; requested.min(size)];
                        arena.read(block, 0, &mut kept).unwrap();
                        prop_assert!(kept.iter().all(|b| *b == fill));

                        arena.write(block, 0, &vec![fill; size]).unwrap();
                        live[idx] = Live { block, requested: size, fill };
                    }
                }
                Op::Coalesce => {
                    arena.coalesce();
                }
                _ => {}
            }
            check(&arena, &live);
        }
    }
}
