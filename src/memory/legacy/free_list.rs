/*!
 * Segregated Free List
 * Free ranges of one arena, bucketed by size
 */

use crate::core::limits::{FREE_LIST_MIN_BUCKET, FREE_LIST_SMALL_MAX};
use crate::core::types::Size;
use std::collections::BTreeMap;

/// Free range inside an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct FreeRange {
    pub offset: usize,
    pub size: Size,
}

impl FreeRange {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

const SMALL_BUCKETS: usize =
    (FREE_LIST_SMALL_MAX.trailing_zeros() - FREE_LIST_MIN_BUCKET.trailing_zeros()) as usize + 1;

/// Segregated free list
/// - Small ranges (<=1KB): power-of-2 buckets, 16 .. 1024 bytes
/// - Large ranges: BTreeMap keyed by size
#[derive(Debug)]
pub(super) struct SegregatedFreeList {
    small: Vec<Vec<FreeRange>>,
    large: BTreeMap<Size, Vec<FreeRange>>,
}

impl SegregatedFreeList {
    pub fn new() -> Self {
        Self {
            small: vec![Vec::new(); SMALL_BUCKETS],
            large: BTreeMap::new(),
        }
    }

    /// Bucket holding sizes in (2^(i-1) * MIN, 2^i * MIN]
    fn small_bucket_index(size: Size) -> Option<usize> {
        if size > FREE_LIST_SMALL_MAX {
            return None;
        }
        let rounded = size.max(FREE_LIST_MIN_BUCKET).next_power_of_two();
        Some((rounded.trailing_zeros() - FREE_LIST_MIN_BUCKET.trailing_zeros()) as usize)
    }

    pub fn insert(&mut self, range: FreeRange) {
        if range.size == 0 {
            return;
        }
        match Self::small_bucket_index(range.size) {
            Some(idx) => self.small[idx].push(range),
            None => self.large.entry(range.size).or_default().push(range),
        }
    }

    /// Remove a range of at least `size` bytes
    pub fn take_fit(&mut self, size: Size) -> Option<FreeRange> {
        if let Some(start) = Self::small_bucket_index(size) {
            // The start bucket can hold ranges smaller than the request
            let bucket = &mut self.small[start];
            if let Some(pos) = bucket.iter().position(|r| r.size >= size) {
                return Some(bucket.swap_remove(pos));
            }
            // Every range in a higher bucket is large enough
            for bucket in &mut self.small[start + 1..] {
                if let Some(range) = bucket.pop() {
                    return Some(range);
                }
            }
        }

        let key = *self.large.range(size..).next()?.0;
        let ranges = self.large.get_mut(&key)?;
        let range = ranges.pop();
        if ranges.is_empty() {
            self.large.remove(&key);
        }
        range
    }

    /// Remove the range starting exactly at `offset`
    pub fn take_at(&mut self, offset: usize) -> Option<FreeRange> {
        for bucket in &mut self.small {
            if let Some(pos) = bucket.iter().position(|r| r.offset == offset) {
                return Some(bucket.swap_remove(pos));
            }
        }

        let (key, pos) = self
            .large
            .iter()
            .find_map(|(size, ranges)| ranges.iter().position(|r| r.offset == offset).map(|p| (*size, p)))?;
        let ranges = self.large.get_mut(&key)?;
        let range = ranges.swap_remove(pos);
        if ranges.is_empty() {
            self.large.remove(&key);
        }
        Some(range)
    }

    pub fn len(&self) -> usize {
        let small: usize = self.small.iter().map(Vec::len).sum();
        let large: usize = self.large.values().map(Vec::len).sum();
        small + large
    }

    pub fn total(&self) -> Size {
        let small: Size = self.small.iter().flatten().map(|r| r.size).sum();
        let large: Size = self.large.values().flatten().map(|r| r.size).sum();
        small + large
    }

    pub fn largest(&self) -> Size {
        if let Some((size, _)) = self.large.iter().next_back() {
            return *size;
        }
        self.small.iter().flatten().map(|r| r.size).max().unwrap_or(0)
    }

    fn drain_sorted(&mut self) -> Vec<FreeRange> {
        let mut all = Vec::with_capacity(self.len());
        for bucket in &mut self.small {
            all.append(bucket);
        }
        for ranges in self.large.values_mut() {
            all.append(ranges);
        }
        self.large.clear();

        all.sort_by_key(|r| r.offset);
        all
    }

    /// Merge adjacent ranges; returns how many merges happened
    pub fn coalesce(&mut self) -> usize {
        let sorted = self.drain_sorted();
        let before = sorted.len();

        let mut merged: Vec<FreeRange> = Vec::with_capacity(before);
        for range in sorted {
            match merged.last_mut() {
                Some(last) if last.end() == range.offset => last.size += range.size,
                _ => merged.push(range),
            }
        }

        let merges = before - merged.len();
        for range in merged {
            self.insert(range);
        }
        merges
    }
}
