/*!
 * Object Runtime
 *
 * Opaque reference-counted objects exposing capability sets through
 * fixed-layout dispatch tables.
 *
 * ## Layout
 *
 * Every object starts with a [`RawObject`] header holding a pointer to its
 * dispatch table. Tables are `#[repr(C)]` function-pointer structs; slot 0 is
 * always QueryInterface, so a handle of unknown provenance can be probed with
 * [`is_valid_interface`] before anything is dispatched through it.
 *
 * ## Ownership
 *
 * Reference counts are atomic. A successful QueryInterface adds a reference
 * to the returned alias. Typed handles ([`Unknown`], [`crate::memory::Malloc`])
 * own one reference each and release it on drop; [`RawHandle`] exposes the
 * uncounted AddRef/Release pair directly.
 */

pub mod abi;
pub mod dispatch;
pub mod handle;
pub mod iid;
pub mod refcount;
pub mod traits;
pub mod unknown;
pub mod validate;

pub use abi::{HResult, MallocVtbl, RawObject, UnknownVtbl};
pub use handle::{RawHandle, Unknown};
pub use iid::{interface_name, register_interface_name, IidParseError, InterfaceId, IID_IMALLOC, IID_IUNKNOWN};
pub use refcount::RefCounter;
pub use traits::{ComObject, Interface};
pub use unknown::UnknownObject;
pub use validate::{is_valid_interface, MemoryMap};
