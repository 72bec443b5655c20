/*!
 * Legacy Resolver Tests
 * One-time lazy table resolution and cached fatal failures
 */

use iface_kernel::memory::legacy::{
    compobj, Export, LegacyResolver, ModuleRegistry, ResolveError, ServiceModule, Slot,
};
use iface_kernel::memory::native::NativeMalloc;
use iface_kernel::{LegacyAllocator, ObjectError};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;

fn leak_registry(modules: Vec<ServiceModule>) -> &'static ModuleRegistry {
    let registry: &'static ModuleRegistry = Box::leak(Box::new(ModuleRegistry::new()));
    for module in modules {
        registry.register(module);
    }
    registry
}

fn leak_resolver(registry: &'static ModuleRegistry, module: &str) -> &'static LegacyResolver {
    Box::leak(Box::new(LegacyResolver::new(registry, module)))
}

#[test]
fn test_concurrent_first_construction_resolves_once() {
    const THREADS: usize = 16;
    let registry = leak_registry(vec![compobj::module()]);
    let resolver = leak_resolver(registry, compobj::MODULE_NAME);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let legacy = LegacyAllocator::with_resolver(resolver).unwrap();
                let block = legacy.alloc(32).unwrap();
                legacy.free(block).unwrap();
                legacy.table_ptr() as usize
            })
        })
        .collect();

    let tables: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(tables.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(resolver.resolutions(), 1);
    assert_eq!(registry.lookups(), 1);
    assert!(resolver.is_resolved());
}

#[test]
fn test_missing_module_is_fatal_and_final() {
    let registry = leak_registry(vec![compobj::module()]);
    let resolver = leak_resolver(registry, "OLE2");

    let err = LegacyAllocator::with_resolver(resolver).unwrap_err();
    assert_eq!(
        err,
        ObjectError::FatalConfiguration(ResolveError::ModuleNotFound("OLE2".into()))
    );
    assert!(err.is_fatal());

    // Registering the module afterwards does not trigger a retry
    registry.register(ServiceModule::new("OLE2"));
    assert_eq!(LegacyAllocator::with_resolver(resolver).unwrap_err(), err);
    assert_eq!(resolver.resolutions(), 1);
    assert_eq!(registry.lookups(), 1);
}

#[test]
fn test_missing_export_is_fatal() {
    let registry = leak_registry(vec![compobj::module().without_export(compobj::FREE)]);
    let resolver = leak_resolver(registry, compobj::MODULE_NAME);

    for _ in 0..3 {
        let err = LegacyAllocator::with_resolver(resolver).unwrap_err();
        assert_eq!(
            err,
            ObjectError::FatalConfiguration(ResolveError::MissingExport {
                module: compobj::MODULE_NAME.into(),
                export: compobj::FREE.into(),
            })
        );
    }
    assert_eq!(resolver.resolutions(), 1);
}

#[test]
fn test_wrong_signature_is_fatal() {
    let builtin = compobj::module();
    let swapped = builtin.proc_address(compobj::GET_SIZE).unwrap();
    let registry = leak_registry(vec![compobj::module().with_export(compobj::DID_ALLOC, swapped)]);
    let resolver = leak_resolver(registry, compobj::MODULE_NAME);

    match LegacyAllocator::with_resolver(resolver).unwrap_err() {
        ObjectError::FatalConfiguration(ResolveError::SignatureMismatch {
            export,
            expected,
            found,
            ..
        }) => {
            assert_eq!(export, compobj::DID_ALLOC);
            assert_eq!(expected, "DidAlloc");
            assert_eq!(found, "GetSize");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_export_built_for_another_allocator_is_fatal() {
    let registry = leak_registry(vec![
        compobj::module().with_export(compobj::GET_SIZE, Export::of::<NativeMalloc>(Slot::GetSize)),
    ]);
    let resolver = leak_resolver(registry, compobj::MODULE_NAME);

    let err = LegacyAllocator::with_resolver(resolver).unwrap_err();
    assert!(err.is_fatal());
    match err {
        ObjectError::FatalConfiguration(ResolveError::ForeignImplementation { export, found, .. }) => {
            assert_eq!(export, compobj::GET_SIZE);
            assert!(found.ends_with("NativeMalloc"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Cached like any other resolution failure
    assert!(LegacyAllocator::with_resolver(resolver).is_err());
    assert_eq!(resolver.resolutions(), 1);
    assert!(!resolver.is_resolved());
}

#[test]
fn test_registered_module_replaces_builtin() {
    let registry = leak_registry(vec![compobj::module()]);
    let previous = registry.register(compobj::module());
    assert!(previous.is_some());
    assert!(registry.contains("compobj"));
    assert!(registry.unregister("CompObj").is_some());
    assert!(!registry.contains(compobj::MODULE_NAME));
}
