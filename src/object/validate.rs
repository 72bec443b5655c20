/*!
 * Interface Validation
 *
 * Defensive probe for handles of unknown provenance. A handle is valid only
 * if the handle is readable for one table pointer, the table is readable for
 * its first slot, and that slot's target is readable and executable.
 * Readability comes from the process memory map, so no probe dereferences
 * memory it has not first proven mapped.
 *
 * The live map is read from `/proc/self/maps`, which only Linux provides.
 * Elsewhere no handle can be proven readable and every handle is reported
 * invalid; `is_supported` tells callers which behavior they get.
 */

use super::abi::RawObject;
use crate::core::limits::ENTRY_PROBE_LEN;
use std::mem::{align_of, size_of};
use tracing::trace;

/// One mapped address range with its permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRegion {
    pub start: usize,
    pub end: usize,
    pub readable: bool,
    pub executable: bool,
}

/// Snapshot of the process memory map, sorted by start address
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    regions: Vec<MappedRegion>,
}

impl MemoryMap {
    /// Capture the current process map
    #[cfg(target_os = "linux")]
    pub fn snapshot() -> std::io::Result<Self> {
        let maps = std::fs::read_to_string("/proc/self/maps")?;
        Ok(Self::parse(&maps))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn snapshot() -> std::io::Result<Self> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process memory map unavailable on this platform",
        ))
    }

    /// Parse `/proc/<pid>/maps` text; malformed lines are skipped
    pub fn parse(text: &str) -> Self {
        let mut regions: Vec<MappedRegion> = text.lines().filter_map(parse_line).collect();
        regions.sort_by_key(|r| r.start);
        Self { regions }
    }

    pub fn regions(&self) -> &[MappedRegion] {
        &self.regions
    }

    fn region_at(&self, address: usize) -> Option<&MappedRegion> {
        let idx = self.regions.partition_point(|r| r.end <= address);
        self.regions
            .get(idx)
            .filter(|r| r.start <= address && address < r.end)
    }

    /// Whether `[address, address + len)` lies in contiguous readable regions
    pub fn is_readable(&self, address: usize, len: usize) -> bool {
        let Some(end) = address.checked_add(len.max(1)) else {
            return false;
        };

        let mut cursor = address;
        while cursor < end {
            match self.region_at(cursor) {
                Some(region) if region.readable => cursor = region.end,
                _ => return false,
            }
        }
        true
    }

    pub fn is_executable(&self, address: usize) -> bool {
        self.region_at(address).map_or(false, |r| r.executable)
    }
}

fn parse_line(line: &str) -> Option<MappedRegion> {
    let mut fields = line.split_whitespace();
    let (start, end) = fields.next()?.split_once('-')?;
    let perms = fields.next()?.as_bytes();
    if perms.len() < 3 {
        return None;
    }

    Some(MappedRegion {
        start: usize::from_str_radix(start, 16).ok()?,
        end: usize::from_str_radix(end, 16).ok()?,
        readable: perms[0] == b'r',
        executable: perms[2] == b'x',
    })
}

/// Validate an interface pointer against a given memory map
pub fn is_valid_interface_in(map: &MemoryMap, ptr: *const RawObject) -> bool {
    let handle = ptr as usize;
    if handle == 0 || handle % align_of::<usize>() != 0 {
        return false;
    }
    if !map.is_readable(handle, size_of::<usize>()) {
        return false;
    }

    // SAFETY: the handle word is mapped readable and aligned
    let table = unsafe { std::ptr::read(handle as *const usize) };
    if table == 0 || table % align_of::<usize>() != 0 || !map.is_readable(table, size_of::<usize>()) {
        return false;
    }

    // SAFETY: the first table slot is mapped readable and aligned
    let entry = unsafe { std::ptr::read(table as *const usize) };
    entry != 0 && map.is_readable(entry, ENTRY_PROBE_LEN) && map.is_executable(entry)
}

/// Whether this platform exposes a live memory map to validate against
pub const fn is_supported() -> bool {
    cfg!(target_os = "linux")
}

/// Validate an interface pointer against the live process map
///
/// Advisory only: returns false rather than failing, including when the map
/// cannot be read. Always false where [`is_supported`] is false.
pub fn is_valid_interface(ptr: *const RawObject) -> bool {
    match MemoryMap::snapshot() {
        Ok(map) => is_valid_interface_in(&map, ptr),
        Err(e) => {
            trace!(error = %e, "Memory map unavailable, rejecting handle {:p}", ptr);
            false
        }
    }
}
