/*!
 * Interface Kernel - Main Entry Point
 *
 * Brings up the object runtime services:
 * - Configuration from the environment
 * - Structured tracing
 * - Module registry, native allocator, optional legacy task allocator
 *
 * then runs an allocation smoke pass and prints service state as JSON.
 */

use iface_kernel::monitoring::span_operation;
use iface_kernel::{init_tracing, Interface, RuntimeConfig, ServiceRegistry, Unknown};
use miette::{IntoDiagnostic, Result};
use tracing::info;

const SMOKE_SIZES: [usize; 4] = [16, 100, 1000, 4000];

fn main() -> Result<()> {
    let config = RuntimeConfig::from_env()?;
    init_tracing(&config);

    info!("Interface kernel starting...");
    info!(backend = %config.allocator, module = %config.legacy_module, "Configuration loaded");

    let services = ServiceRegistry::init(config)?;
    let malloc = services.task_allocator();

    {
        let span = span_operation("smoke_pass");
        let _entered = span.enter();

        let unknown = malloc.query::<Unknown>()?;
        info!(valid = unknown.is_valid(), "Task allocator answers base identity");

        let mut blocks = Vec::with_capacity(SMOKE_SIZES.len());
        for size in SMOKE_SIZES {
            let block = malloc.alloc(size)?;
            let actual = malloc.get_size(block)?;
            info!(%block, size, actual, "Allocated");
            blocks.push(block);
        }

        let grown = malloc.realloc(blocks[0], 2048)?;
        blocks[0] = grown;
        info!(block = %grown, "Reallocated first block to 2048 bytes");

        for block in blocks {
            malloc.free(block)?;
        }
        malloc.heap_minimize();
    }

    let report = serde_json::to_string_pretty(&services.report()).into_diagnostic()?;
    println!("{}", report);

    info!("Interface kernel shutting down");
    Ok(())
}
