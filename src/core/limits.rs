/*!
 * System Limits and Constants
 *
 * Centralized location for runtime-wide limits, thresholds, and magic numbers.
 * Organized by domain for maintainability and discoverability.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Values fixed by the legacy segmented model are marked with [LEGACY-COMPAT]
 */

use crate::core::types::RefCount;

// =============================================================================
// OBJECT RUNTIME
// =============================================================================

/// Count reported by AddRef/Release on pinned singleton objects
pub const PINNED_REFCOUNT: RefCount = 1;

/// Bytes of a QueryInterface entry point that must be readable for a handle
/// to pass validation
pub const ENTRY_PROBE_LEN: usize = 9;

// =============================================================================
// NATIVE HEAP
// =============================================================================

/// Alignment of every native heap block
/// Matches the strictest scalar alignment on supported targets
pub const NATIVE_ALIGN: usize = 16;

// =============================================================================
// SEGMENTED ARENA
// =============================================================================

/// Bytes in each legacy arena
/// [LEGACY-COMPAT] One segment, offsets must fit in 16 bits
pub const LEGACY_ARENA_SIZE: usize = 64_000;

/// Arena block granularity; every block size is rounded up to this
pub const ARENA_GRANULARITY: usize = 8;

/// First selector handed out to an arena (selector 0 is the null segment)
pub const FIRST_SELECTOR: u16 = 1;

/// Upper bound of the smallest free-list bucket
pub const FREE_LIST_MIN_BUCKET: usize = 16;

/// Largest size served from power-of-2 buckets (1KB)
/// [PERF] Larger ranges go to an ordered map keyed by size
pub const FREE_LIST_SMALL_MAX: usize = 1024;

/// Coalesce the free list every N frees
/// [PERF] Amortizes the sort across frees; misses also trigger a coalesce
pub const DEALLOC_COALESCE_INTERVAL: u64 = 64;

// =============================================================================
// MEMORY PRESSURE
// =============================================================================

/// Usage percentage reported as medium pressure
pub const PRESSURE_MEDIUM_PERCENT: f64 = 60.0;

/// Usage percentage reported as high pressure
pub const PRESSURE_HIGH_PERCENT: f64 = 80.0;

/// Usage percentage reported as critical pressure
pub const PRESSURE_CRITICAL_PERCENT: f64 = 95.0;
