/*!
 * Interface Identifiers
 * Fixed-width capability keys and the registry of well-known names
 */

use ahash::RandomState;
use dashmap::DashMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// 16-byte interface identifier
///
/// Equality is exact byte comparison. Rendered in registry form,
/// `{00000000-0000-0000-C000-000000000046}`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(Uuid);

/// Base identity, answered by every object
pub const IID_IUNKNOWN: InterfaceId = InterfaceId::from_u128(0x00000000_0000_0000_C000_000000000046);

/// Allocator service
pub const IID_IMALLOC: InterfaceId = InterfaceId::from_u128(0x00000002_0000_0000_C000_000000000046);

const BUILTIN_NAMES: &[(InterfaceId, &str)] = &[(IID_IUNKNOWN, "IUnknown"), (IID_IMALLOC, "IMalloc")];

impl InterfaceId {
    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Well-known name, if registered
    pub fn name(&self) -> Option<&'static str> {
        interface_name(self)
    }
}

impl From<Uuid> for InterfaceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:X}}}", self.0)
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self, name),
            None => write!(f, "{}", self),
        }
    }
}

/// Identifier parse failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("Malformed interface identifier {input:?}: {reason}")]
#[diagnostic(
    code(object::malformed_iid),
    help("Use registry form, e.g. {{00000002-0000-0000-C000-000000000046}}.")
)]
pub struct IidParseError {
    pub input: String,
    pub reason: String,
}

impl FromStr for InterfaceId {
    type Err = IidParseError;

    /// Accepts braced, hyphenated, simple and URN forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| IidParseError {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

// ============================================================================
// Name Registry
// ============================================================================

fn extra_names() -> &'static DashMap<InterfaceId, &'static str, RandomState> {
    static NAMES: OnceLock<DashMap<InterfaceId, &'static str, RandomState>> = OnceLock::new();
    NAMES.get_or_init(|| DashMap::with_hasher(RandomState::new()))
}

/// Name a well-known identifier (used in relay traces)
pub fn interface_name(iid: &InterfaceId) -> Option<&'static str> {
    BUILTIN_NAMES
        .iter()
        .find(|(known, _)| known == iid)
        .map(|(_, name)| *name)
        .or_else(|| extra_names().get(iid).map(|entry| *entry.value()))
}

/// Register a name for an identifier
///
/// Returns false if the identifier already had a name.
pub fn register_interface_name(iid: InterfaceId, name: &'static str) -> bool {
    if BUILTIN_NAMES.iter().any(|(known, _)| *known == iid) {
        return false;
    }
    match extra_names().entry(iid) {
        dashmap::mapref::entry::Entry::Occupied(_) => false,
        dashmap::mapref::entry::Entry::Vacant(slot) => {
            slot.insert(name);
            true
        }
    }
}
