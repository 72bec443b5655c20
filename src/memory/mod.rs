/*!
 * Memory Module
 * Allocator services reachable through the allocator dispatch table
 */

pub mod dispatch;
pub mod legacy;
pub mod malloc;
pub mod native;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use legacy::{LegacyAllocator, LegacyResolver, ModuleRegistry};
pub use malloc::Malloc;
pub use native::NativeAllocator;
pub use traits::*;
pub use types::*;
