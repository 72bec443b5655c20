/*!
 * Runtime Configuration
 *
 * Startup settings, read once from the environment:
 * - IFACE_ALLOCATOR: task allocator backend, `native` (default) or `legacy`
 * - IFACE_LEGACY_MODULE: service module resolved by the legacy allocator (default COMPOBJ)
 * - IFACE_TRACE_JSON: JSON log output when `1` or `true`
 */

use super::errors::ConfigError;
use crate::memory::legacy::compobj;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENV_ALLOCATOR: &str = "IFACE_ALLOCATOR";
pub const ENV_LEGACY_MODULE: &str = "IFACE_LEGACY_MODULE";
pub const ENV_TRACE_JSON: &str = "IFACE_TRACE_JSON";

/// Which implementation backs the task allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocatorBackend {
    /// Process heap
    #[default]
    Native,
    /// Segmented arena resolved from the legacy service module
    Legacy,
}

impl FromStr for AllocatorBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(AllocatorBackend::Native),
            "legacy" => Ok(AllocatorBackend::Legacy),
            "" => Err(ConfigError::Empty(ENV_ALLOCATOR)),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_ALLOCATOR,
                value: s.to_string(),
                expected: "native or legacy",
            }),
        }
    }
}

impl fmt::Display for AllocatorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocatorBackend::Native => write!(f, "native"),
            AllocatorBackend::Legacy => write!(f, "legacy"),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub allocator: AllocatorBackend,
    pub legacy_module: String,
    pub trace_json: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            allocator: AllocatorBackend::default(),
            legacy_module: compobj::MODULE_NAME.to_string(),
            trace_json: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ALLOCATOR) {
            config.allocator = value.parse()?;
        }

        if let Some(value) = lookup(ENV_LEGACY_MODULE) {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::Empty(ENV_LEGACY_MODULE));
            }
            config.legacy_module = value.to_string();
        }

        if let Some(value) = lookup(ENV_TRACE_JSON) {
            config.trace_json = value == "1" || value.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }

    pub fn with_allocator(mut self, allocator: AllocatorBackend) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_legacy_module(mut self, module: impl Into<String>) -> Self {
        self.legacy_module = module.into();
        self
    }
}
