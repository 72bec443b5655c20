/*!
 * Service Registry
 *
 * Process-wide services, brought up once in a fixed order:
 * 1. module registry (seeded with the built-in service module)
 * 2. native allocator singleton
 * 3. legacy backend only: resolved legacy table and a pinned task allocator
 *
 * There is no teardown; services live for the rest of the process.
 */

use crate::core::config::{AllocatorBackend, RuntimeConfig};
use crate::core::errors::{ObjectError, ObjectResult};
use crate::memory::types::{ArenaStats, NativeStats};
use crate::memory::{LegacyAllocator, LegacyResolver, Malloc, ModuleRegistry, NativeAllocator};
use crate::object::HResult;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{info, warn};

static SERVICES: OnceLock<ServiceRegistry> = OnceLock::new();

enum TaskAllocator {
    Native,
    Legacy(LegacyAllocator),
}

pub struct ServiceRegistry {
    config: RuntimeConfig,
    modules: &'static ModuleRegistry,
    resolver: &'static LegacyResolver,
    task: TaskAllocator,
}

/// Snapshot of service state
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub backend: AllocatorBackend,
    pub legacy_module: String,
    pub legacy_resolved: bool,
    pub module_lookups: u64,
    pub native: NativeStats,
    pub task_arena: Option<ArenaStats>,
}

impl ServiceRegistry {
    /// Bring up services for `config`
    ///
    /// Idempotent: once services exist, later calls return them unchanged.
    /// A fatal configuration error leaves nothing installed.
    pub fn init(config: RuntimeConfig) -> ObjectResult<&'static ServiceRegistry> {
        if let Some(existing) = SERVICES.get() {
            if existing.config != config {
                warn!(backend = %existing.config.allocator, "Services already initialized, ignoring new configuration");
            }
            return Ok(existing);
        }

        let modules = ModuleRegistry::global();
        info!(lookups = modules.lookups(), "Module registry ready");

        // Touch the singleton so it exists before any task allocator
        NativeAllocator::stats();
        info!("Native allocator ready");

        let resolver = LegacyResolver::global_for(&config.legacy_module)?;
        let task = match config.allocator {
            AllocatorBackend::Native => TaskAllocator::Native,
            AllocatorBackend::Legacy => {
                let legacy = LegacyAllocator::with_resolver(resolver)?;
                info!(selector = %legacy.selector(), "Legacy task allocator pinned");
                TaskAllocator::Legacy(legacy)
            }
        };

        if SERVICES
            .set(ServiceRegistry {
                config,
                modules,
                resolver,
                task,
            })
            .is_err()
        {
            warn!("Concurrent initialization won the race, discarding this configuration and task allocator");
        }
        let services = SERVICES.get().ok_or(ObjectError::Status(HResult::E_UNEXPECTED))?;
        info!(backend = %services.config.allocator, "Services initialized");
        Ok(services)
    }

    /// Installed services, if initialized
    pub fn global() -> Option<&'static ServiceRegistry> {
        SERVICES.get()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn resolver(&self) -> &'static LegacyResolver {
        self.resolver
    }

    pub fn modules(&self) -> &'static ModuleRegistry {
        self.modules
    }

    /// Handle to the configured task allocator
    pub fn task_allocator(&self) -> Malloc {
        match &self.task {
            TaskAllocator::Native => NativeAllocator::instance(),
            TaskAllocator::Legacy(legacy) => Malloc::clone(legacy),
        }
    }

    pub fn report(&self) -> ServiceReport {
        ServiceReport {
            backend: self.config.allocator,
            legacy_module: self.resolver.module().to_string(),
            legacy_resolved: self.resolver.is_resolved(),
            module_lookups: self.modules.lookups(),
            native: NativeAllocator::stats(),
            task_arena: match &self.task {
                TaskAllocator::Native => None,
                TaskAllocator::Legacy(legacy) => Some(legacy.stats()),
            },
        }
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish()
    }
}
