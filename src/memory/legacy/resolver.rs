/*!
 * Legacy Table Resolver
 *
 * Builds the segmented allocator's dispatch table from a service module's
 * exports, exactly once. The outcome is cached either way: every later
 * caller observes the same table, or the same fatal error without a second
 * lookup.
 */

use super::allocator::SegmentedMalloc;
use super::compobj;
use super::module::{Entry, ModuleRegistry, ResolveError};
use crate::core::errors::ConfigError;
use crate::object::{MallocVtbl, UnknownVtbl};
use log::{error, info, warn};
use std::any::type_name;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Resolve one export, checking its signature against the table slot and
/// that its thunk was built for the segmented allocator
macro_rules! resolve_entry {
    ($module:expr, $name:expr, $variant:ident) => {{
        let export = $module.proc_address($name)?;
        let entry = match export.entry() {
            Entry::$variant(entry) => entry,
            _ => {
                return Err(ResolveError::SignatureMismatch {
                    module: $module.name().to_string(),
                    export: $name.to_string(),
                    expected: stringify!($variant),
                    found: export.kind(),
                })
            }
        };
        if !export.is_for::<SegmentedMalloc>() {
            return Err(ResolveError::ForeignImplementation {
                module: $module.name().to_string(),
                export: $name.to_string(),
                expected: type_name::<SegmentedMalloc>(),
                found: export.implementor(),
            });
        }
        entry
    }};
}

pub struct LegacyResolver {
    registry: &'static ModuleRegistry,
    module: String,
    table: OnceLock<Result<MallocVtbl, ResolveError>>,
    resolutions: AtomicU64,
}

impl LegacyResolver {
    pub fn new(registry: &'static ModuleRegistry, module: impl Into<String>) -> Self {
        Self {
            registry,
            module: module.into(),
            table: OnceLock::new(),
            resolutions: AtomicU64::new(0),
        }
    }

    fn global_cell() -> &'static OnceLock<LegacyResolver> {
        static GLOBAL: OnceLock<LegacyResolver> = OnceLock::new();
        &GLOBAL
    }

    /// Process-wide resolver; binds the built-in module if none is bound yet
    pub fn global() -> &'static LegacyResolver {
        Self::global_cell().get_or_init(|| LegacyResolver::new(ModuleRegistry::global(), compobj::MODULE_NAME))
    }

    /// Process-wide resolver bound to `module`
    ///
    /// The first caller names the module. Requesting a different one later
    /// is a configuration conflict: the bound resolver cannot be rebound.
    pub fn global_for(module: &str) -> Result<&'static LegacyResolver, ConfigError> {
        let resolver = Self::global_cell().get_or_init(|| LegacyResolver::new(ModuleRegistry::global(), module));
        if !resolver.module.eq_ignore_ascii_case(module) {
            warn!(
                "Legacy resolver already bound to {}, rejecting request for {}",
                resolver.module, module
            );
            return Err(ConfigError::ModuleConflict {
                requested: module.to_string(),
                bound: resolver.module.clone(),
            });
        }
        Ok(resolver)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// The shared table, resolving it on first call
    pub fn table(&self) -> Result<&MallocVtbl, ResolveError> {
        match self.table.get_or_init(|| self.resolve()) {
            Ok(table) => Ok(table),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.table.get(), Some(Ok(_)))
    }

    /// Resolution attempts made; at most one
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    fn resolve(&self) -> Result<MallocVtbl, ResolveError> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let result = self.build();
        match &result {
            Ok(_) => info!("Resolved legacy allocator table from {}", self.module),
            Err(e) => error!("Legacy allocator unavailable: {}", e),
        }
        result
    }

    fn build(&self) -> Result<MallocVtbl, ResolveError> {
        let module = self.registry.module_handle(&self.module)?;

        Ok(MallocVtbl {
            base: UnknownVtbl {
                query_interface: resolve_entry!(module, compobj::QUERY_INTERFACE, QueryInterface),
                add_ref: resolve_entry!(module, compobj::ADD_REF, AddRef),
                release: resolve_entry!(module, compobj::RELEASE, Release),
            },
            alloc: resolve_entry!(module, compobj::ALLOC, Alloc),
            realloc: resolve_entry!(module, compobj::REALLOC, Realloc),
            free: resolve_entry!(module, compobj::FREE, Free),
            get_size: resolve_entry!(module, compobj::GET_SIZE, GetSize),
            did_alloc: resolve_entry!(module, compobj::DID_ALLOC, DidAlloc),
            heap_minimize: resolve_entry!(module, compobj::HEAP_MINIMIZE, HeapMinimize),
        })
    }
}

impl std::fmt::Debug for LegacyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyResolver")
            .field("module", &self.module)
            .field("resolved", &self.is_resolved())
            .field("resolutions", &self.resolutions())
            .finish()
    }
}
