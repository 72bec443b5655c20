/*!
 * Structured Tracing
 * Subscriber setup and operation spans using the tracing crate
 */

use crate::core::config::RuntimeConfig;
use tracing::{info, span, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info). `RUST_LOG=relay=trace`
///   enables per-call dispatch traces.
/// - IFACE_TRACE_JSON: Enable JSON output (read into `RuntimeConfig`)
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing(config: &RuntimeConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.trace_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = config.trace_json, "Structured tracing initialized");
    }
    installed
}

/// Generate a unique trace ID for correlating one operation's events
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span for a named operation, tagged with a fresh trace ID
pub fn span_operation(operation: &str) -> Span {
    span!(
        Level::INFO,
        "operation",
        trace_id = %generate_trace_id(),
        operation = operation
    )
}
