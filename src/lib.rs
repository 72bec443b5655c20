/*!
 * Interface Kernel Library
 * Reference-counted dispatch-table objects and the allocator services built on them
 */

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod object;
pub mod services;

// Re-exports
pub use crate::core::{AllocatorBackend, BlockRef, ConfigError, ObjectError, ObjectResult, RuntimeConfig, Size};
pub use memory::{
    AllocError, AllocatorService, ArenaStats, LegacyAllocator, Malloc, MemoryPressure, NativeAllocator, NativeStats,
    Ownership,
};
pub use monitoring::init_tracing;
pub use object::{
    is_valid_interface, ComObject, HResult, Interface, InterfaceId, RawHandle, Unknown, UnknownObject, IID_IMALLOC,
    IID_IUNKNOWN,
};
pub use services::{ServiceReport, ServiceRegistry};
