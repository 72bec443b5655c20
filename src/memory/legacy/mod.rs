/*!
 * Legacy Segmented Allocator
 *
 * Allocator objects bridging the flat address space to a bounded segmented
 * one. Each instance owns a 64 000 byte arena addressed by selector:offset;
 * the dispatch table every instance shares is resolved lazily, once, from
 * the service module registry.
 */

pub mod allocator;
pub mod arena;
pub mod compobj;
mod free_list;
pub mod module;
pub mod resolver;
pub mod segment;

pub use allocator::{LegacyAllocator, SegmentedMalloc};
pub use arena::SegmentArena;
pub use module::{Export, ModuleRegistry, ResolveError, ServiceModule, Slot};
pub use resolver::LegacyResolver;
pub use segment::{SegPtr, Selector, SelectorPool};
