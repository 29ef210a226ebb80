// SPDX-License-Identifier: CEPL-1.0
//! Bump bookkeeping for coarse GPU memory blocks.
//!
//! A block is allocated once and carved up front to back. Nothing is ever
//! freed or reused; offsets only move during setup.
use crate::error::AllocError;

/// Which heap a block lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Host-visible and coherent; mapped once for the block lifetime.
    HostVisible,
    DeviceLocal,
}

/// A sub-range handed out by a [`BumpArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub offset: u64,
    pub size: u64,
}

impl Region {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Size/alignment pair, as reported by a resource's memory requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub size: u64,
    pub alignment: u64,
}

#[derive(Debug, Clone)]
pub struct BumpArena {
    name: &'static str,
    capacity: u64,
    offset: u64,
}

/// Rounds `value` up to `alignment` (a power of two, 0 treated as 1).
pub fn align_up(value: u64, alignment: u64) -> Result<u64, AllocError> {
    let alignment = alignment.max(1);
    if !alignment.is_power_of_two() {
        return Err(AllocError::BadAlignment(alignment));
    }
    let mask = alignment - 1;
    value
        .checked_add(mask)
        .map(|v| v & !mask)
        .ok_or(AllocError::BadAlignment(alignment))
}

impl BumpArena {
    pub fn new(name: &'static str, capacity: u64) -> Self {
        BumpArena {
            name,
            capacity,
            offset: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes consumed so far, including alignment padding.
    pub fn used(&self) -> u64 {
        self.offset
    }

    pub fn remaining(&self) -> u64 {
        self.capacity - self.offset
    }

    pub fn sub_allocate(&mut self, size: u64, alignment: u64) -> Result<Region, AllocError> {
        let start = align_up(self.offset, alignment)?;
        let end = start.checked_add(size);
        match end {
            Some(end) if end <= self.capacity => {
                self.offset = end;
                Ok(Region {
                    offset: start,
                    size,
                })
            }
            _ => Err(AllocError::CapacityExceeded {
                block: self.name,
                requested: size,
                offset: start,
                capacity: self.capacity,
            }),
        }
    }

    pub fn allocate(&mut self, req: Requirement) -> Result<Region, AllocError> {
        self.sub_allocate(req.size, req.alignment)
    }
}

/// Smallest capacity that fits `reqs` when bump-allocated in order from 0.
pub fn packed_size(reqs: impl IntoIterator<Item = Requirement>) -> Result<u64, AllocError> {
    let mut end = 0u64;
    for r in reqs {
        end = align_up(end, r.alignment)?
            .checked_add(r.size)
            .ok_or(AllocError::BadAlignment(r.alignment))?;
    }
    Ok(end)
}

#[cfg(test)]
#[path = "arena_tests.rs"]
mod tests;
