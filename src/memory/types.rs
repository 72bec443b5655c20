/*!
 * Memory Types
 * Common types for allocator services
 */

use crate::core::limits::{PRESSURE_CRITICAL_PERCENT, PRESSURE_HIGH_PERCENT, PRESSURE_MEDIUM_PERCENT};
use crate::core::types::{BlockRef, Size};
use crate::object::HResult;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allocator operation result
pub type MemoryResult<T> = Result<T, AllocError>;

/// Allocation failures
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum AllocError {
    #[error("Out of memory: requested {requested} bytes")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("The heap or arena is exhausted. Free blocks or use a larger backend.")
    )]
    OutOfMemory { requested: Size },

    #[error("Invalid block {0}")]
    #[diagnostic(
        code(memory::invalid_block),
        help("The block was not issued by this allocator or was already freed.")
    )]
    InvalidBlock(BlockRef),

    #[error("Block {block} belongs to selector {owner:#06x}, not {expected:#06x}")]
    #[diagnostic(
        code(memory::foreign_block),
        help("Blocks are only valid against the arena that issued them.")
    )]
    ForeignBlock { block: BlockRef, owner: u16, expected: u16 },

    #[error("Range {offset}+{len} exceeds block {block} of {size} bytes")]
    #[diagnostic(code(memory::out_of_bounds))]
    OutOfBounds {
        block: BlockRef,
        offset: Size,
        len: Size,
        size: Size,
    },

    #[error("Allocation size {0} overflows the addressable range")]
    #[diagnostic(code(memory::size_overflow))]
    SizeOverflow(Size),

    #[error("No free segment selectors remain")]
    #[diagnostic(
        code(memory::selectors_exhausted),
        help("Release legacy allocators to recycle their selectors.")
    )]
    SelectorsExhausted,
}

impl AllocError {
    /// Status code used when this error crosses a dispatch table
    pub fn status(&self) -> HResult {
        match self {
            AllocError::OutOfMemory { .. }
            | AllocError::SizeOverflow(_)
            | AllocError::SelectorsExhausted => HResult::E_OUTOFMEMORY,
            AllocError::InvalidBlock(_)
            | AllocError::ForeignBlock { .. }
            | AllocError::OutOfBounds { .. } => HResult::E_INVALIDARG,
        }
    }
}

/// DidAlloc answer
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Unknown = -1,
    NotOwned = 0,
    Owned = 1,
}

impl Ownership {
    #[inline]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Ownership::NotOwned,
            1 => Ownership::Owned,
            _ => Ownership::Unknown,
        }
    }

    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn from_usage(usage_percentage: f64) -> Self {
        if usage_percentage >= PRESSURE_CRITICAL_PERCENT {
            MemoryPressure::Critical
        } else if usage_percentage >= PRESSURE_HIGH_PERCENT {
            MemoryPressure::High
        } else if usage_percentage >= PRESSURE_MEDIUM_PERCENT {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Segmented arena statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaStats {
    pub selector: u16,
    pub capacity: Size,
    pub used: Size,
    pub available: Size,
    pub usage_percentage: f64,
    pub live_blocks: usize,
    pub free_ranges: usize,
    pub largest_free: Size,
}

impl ArenaStats {
    pub fn memory_pressure(&self) -> MemoryPressure {
        MemoryPressure::from_usage(self.usage_percentage)
    }
}

/// Native heap statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeStats {
    pub live_blocks: usize,
    pub live_bytes: Size,
}
