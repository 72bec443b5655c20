/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use crate::object::{HResult, InterfaceId};
use miette::Diagnostic;
use thiserror::Error;

// Re-export AllocError from memory module
pub use crate::memory::AllocError;

// Re-export ResolveError from the legacy module loader
pub use crate::memory::legacy::ResolveError;

/// Errors surfaced by object handles
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ObjectError {
    #[error("Interface not supported: {iid}")]
    #[diagnostic(
        code(object::interface_not_supported),
        help("The object does not implement this interface. Query a capability it advertises.")
    )]
    InterfaceNotSupported { iid: InterfaceId },

    #[error("Allocation failed: {0}")]
    #[diagnostic(transparent)]
    Allocation(#[from] AllocError),

    #[error("Fatal configuration error: {0}")]
    #[diagnostic(transparent)]
    FatalConfiguration(#[from] ResolveError),

    #[error("Configuration rejected: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Dispatch failed with status {0}")]
    #[diagnostic(
        code(object::dispatch_status),
        help("A dispatch table entry returned an unexpected status code.")
    )]
    Status(HResult),
}

impl ObjectError {
    /// Whether this error indicates a broken deployment rather than a
    /// transient condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, ObjectError::FatalConfiguration(_) | ObjectError::Config(_))
    }

    /// Status code used when this error crosses a dispatch table
    pub fn status(&self) -> HResult {
        match self {
            ObjectError::InterfaceNotSupported { .. } => HResult::E_NOINTERFACE,
            ObjectError::Allocation(err) => err.status(),
            ObjectError::FatalConfiguration(_) | ObjectError::Config(_) => HResult::E_UNEXPECTED,
            ObjectError::Status(hr) => *hr,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: expected {expected}")]
    #[diagnostic(
        code(config::invalid_value),
        help("Fix or unset the environment variable and restart.")
    )]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Empty value for {0}")]
    #[diagnostic(code(config::empty_value), help("Unset the variable to use the default."))]
    Empty(&'static str),

    #[error("Legacy module {requested} requested, but the resolver is already bound to {bound}")]
    #[diagnostic(
        code(config::module_conflict),
        help("Initialize services before constructing any legacy allocator.")
    )]
    ModuleConflict { requested: String, bound: String },
}

/// Result type for object operations
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;
