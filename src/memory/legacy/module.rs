/*!
 * Service Modules
 *
 * Host-resident modules exporting named entry points, and the registry the
 * legacy resolver looks them up in. Exports carry their table slot and the
 * implementation type they were built for, so a lookup can detect an entry
 * point of the wrong shape or one that expects a different object.
 */

use super::compobj;
use crate::memory::traits::AllocatorService;
use crate::object::abi::{
    AddRefFn, AllocFn, DidAllocFn, FreeFn, GetSizeFn, HeapMinimizeFn, QueryInterfaceFn, ReallocFn, ReleaseFn,
};
use crate::object::MallocVtbl;
use ahash::{AHashMap, RandomState};
use dashmap::DashMap;
use log::info;
use miette::Diagnostic;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Module or entry point resolution failure; always fatal
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ResolveError {
    #[error("Service module {0} is not loaded")]
    #[diagnostic(
        code(resolve::module_not_found),
        help("Register the module before the first legacy allocator is constructed.")
    )]
    ModuleNotFound(String),

    #[error("Module {module} does not export {export}")]
    #[diagnostic(code(resolve::missing_export))]
    MissingExport { module: String, export: String },

    #[error("Export {module}.{export} has signature {found}, expected {expected}")]
    #[diagnostic(code(resolve::signature_mismatch))]
    SignatureMismatch {
        module: String,
        export: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Export {module}.{export} was built for {found}, expected {expected}")]
    #[diagnostic(
        code(resolve::foreign_implementation),
        help("Export entry points built for the segmented allocator.")
    )]
    ForeignImplementation {
        module: String,
        export: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Allocator table slot an entry point fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    QueryInterface,
    AddRef,
    Release,
    Alloc,
    Realloc,
    Free,
    GetSize,
    DidAlloc,
    HeapMinimize,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::QueryInterface => "QueryInterface",
            Slot::AddRef => "AddRef",
            Slot::Release => "Release",
            Slot::Alloc => "Alloc",
            Slot::Realloc => "Realloc",
            Slot::Free => "Free",
            Slot::GetSize => "GetSize",
            Slot::DidAlloc => "DidAlloc",
            Slot::HeapMinimize => "HeapMinimize",
        }
    }
}

/// Raw entry point, tagged with its signature
#[derive(Clone, Copy)]
pub(crate) enum Entry {
    QueryInterface(QueryInterfaceFn),
    AddRef(AddRefFn),
    Release(ReleaseFn),
    Alloc(AllocFn),
    Realloc(ReallocFn),
    Free(FreeFn),
    GetSize(GetSizeFn),
    DidAlloc(DidAllocFn),
    HeapMinimize(HeapMinimizeFn),
}

/// Exported entry point
///
/// Only constructible from an allocator implementation, so every export
/// records which object type its thunk expects behind the header.
#[derive(Clone, Copy)]
pub struct Export {
    slot: Slot,
    entry: Entry,
    implementor: TypeId,
    implementor_name: &'static str,
}

impl Export {
    /// The entry point `T` provides for `slot`
    pub fn of<T: AllocatorService>(slot: Slot) -> Self {
        let table = MallocVtbl::of::<T>();
        let entry = match slot {
            Slot::QueryInterface => Entry::QueryInterface(table.base.query_interface),
            Slot::AddRef => Entry::AddRef(table.base.add_ref),
            Slot::Release => Entry::Release(table.base.release),
            Slot::Alloc => Entry::Alloc(table.alloc),
            Slot::Realloc => Entry::Realloc(table.realloc),
            Slot::Free => Entry::Free(table.free),
            Slot::GetSize => Entry::GetSize(table.get_size),
            Slot::DidAlloc => Entry::DidAlloc(table.did_alloc),
            Slot::HeapMinimize => Entry::HeapMinimize(table.heap_minimize),
        };
        Self {
            slot,
            entry,
            implementor: TypeId::of::<T>(),
            implementor_name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn kind(&self) -> &'static str {
        self.slot.name()
    }

    /// Type name of the implementation the entry point was built for
    pub fn implementor(&self) -> &'static str {
        self.implementor_name
    }

    pub fn is_for<T: 'static>(&self) -> bool {
        self.implementor == TypeId::of::<T>()
    }

    #[inline]
    pub(crate) fn entry(&self) -> Entry {
        self.entry
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Export::{}<{}>", self.kind(), self.implementor_name)
    }
}

/// A loaded module and its export table
#[derive(Debug, Clone)]
pub struct ServiceModule {
    name: String,
    exports: AHashMap<String, Export>,
}

impl ServiceModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: AHashMap::new(),
        }
    }

    pub fn with_export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.exports.insert(name.into(), export);
        self
    }

    pub fn without_export(mut self, name: &str) -> Self {
        self.exports.remove(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Look up an entry point by exact name
    pub fn proc_address(&self, export: &str) -> Result<Export, ResolveError> {
        self.exports
            .get(export)
            .copied()
            .ok_or_else(|| ResolveError::MissingExport {
                module: self.name.clone(),
                export: export.to_string(),
            })
    }
}

/// Registry of loaded modules, keyed case-insensitively
pub struct ModuleRegistry {
    modules: DashMap<String, Arc<ServiceModule>, RandomState>,
    lookups: AtomicU64,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: DashMap::with_hasher(RandomState::new()),
            lookups: AtomicU64::new(0),
        }
    }

    /// Process-wide registry, seeded with the built-in service module
    pub fn global() -> &'static ModuleRegistry {
        static REGISTRY: OnceLock<ModuleRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let registry = ModuleRegistry::new();
            registry.register(compobj::module());
            registry
        })
    }

    fn key(name: &str) -> String {
        name.to_ascii_uppercase()
    }

    /// Load a module, replacing any module of the same name
    pub fn register(&self, module: ServiceModule) -> Option<Arc<ServiceModule>> {
        info!("Registered service module {} ({} exports)", module.name(), module.exports.len());
        self.modules.insert(Self::key(module.name()), Arc::new(module))
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<ServiceModule>> {
        self.modules.remove(&Self::key(name)).map(|(_, module)| module)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(&Self::key(name))
    }

    /// Find an already-loaded module
    pub fn module_handle(&self, name: &str) -> Result<Arc<ServiceModule>, ResolveError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.modules
            .get(&Self::key(name))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ResolveError::ModuleNotFound(name.to_string()))
    }

    /// Number of module lookups performed
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
