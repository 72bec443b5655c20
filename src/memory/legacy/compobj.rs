/*!
 * Built-in Service Module
 * Segmented allocator entry points exported under their legacy names
 */

use super::allocator::SegmentedMalloc;
use super::module::{Export, ServiceModule, Slot};

pub const MODULE_NAME: &str = "COMPOBJ";

pub const QUERY_INTERFACE: &str = "IMalloc16_QueryInterface";
pub const ADD_REF: &str = "IMalloc16_AddRef";
pub const RELEASE: &str = "IMalloc16_Release";
pub const ALLOC: &str = "IMalloc16_Alloc";
pub const REALLOC: &str = "IMalloc16_Realloc";
pub const FREE: &str = "IMalloc16_Free";
pub const GET_SIZE: &str = "IMalloc16_GetSize";
pub const DID_ALLOC: &str = "IMalloc16_DidAlloc";
pub const HEAP_MINIMIZE: &str = "IMalloc16_HeapMinimize";

/// Allocator entry points in table order
pub const EXPORTS: [(&str, Slot); 9] = [
    (QUERY_INTERFACE, Slot::QueryInterface),
    (ADD_REF, Slot::AddRef),
    (RELEASE, Slot::Release),
    (ALLOC, Slot::Alloc),
    (REALLOC, Slot::Realloc),
    (FREE, Slot::Free),
    (GET_SIZE, Slot::GetSize),
    (DID_ALLOC, Slot::DidAlloc),
    (HEAP_MINIMIZE, Slot::HeapMinimize),
];

/// The module as it is loaded at startup
pub fn module() -> ServiceModule {
    EXPORTS
        .iter()
        .fold(ServiceModule::new(MODULE_NAME), |module, (name, slot)| {
            module.with_export(*name, Export::of::<SegmentedMalloc>(*slot))
        })
}
