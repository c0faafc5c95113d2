// VRAM module - Fixed-pool video memory allocator
//
// GPU-addressable memory is small, non-relocatable and bank-granular.
// This module tracks allocations as (offset, size, refcount) records
// inside fixed-capacity pools. Handles are record ids, never raw
// addresses, so the pool stays the single source of truth for liveness
// and coalescing. There is no compaction: a record's offset never changes
// while its refcount is above zero.

mod pool;

#[cfg(test)]
mod tests;

pub use pool::{Pool, RecordId};

use std::fmt;

/// Size of one texture-capable memory bank in bytes
pub const BANK_SIZE: usize = 128 * 1024;

/// Size of the palette memory bank in bytes
pub const PALETTE_BANK_SIZE: usize = 64 * 1024;

/// Largest pool the hardware can address (all four texture banks)
pub const MAX_POOL_CAPACITY: usize = 4 * BANK_SIZE;

/// Selection of texture-capable memory banks granted to the allocator
///
/// Banks C and D double as display-capture memory in dual-screen mode, so
/// a dual-mode engine must leave them out of the texture selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VramBanks(u8);

impl VramBanks {
    /// No banks
    pub const NONE: VramBanks = VramBanks(0);
    /// Bank A
    pub const A: VramBanks = VramBanks(1 << 0);
    /// Bank B
    pub const B: VramBanks = VramBanks(1 << 1);
    /// Bank C
    pub const C: VramBanks = VramBanks(1 << 2);
    /// Bank D
    pub const D: VramBanks = VramBanks(1 << 3);
    /// Banks A and B (dual-screen default)
    pub const AB: VramBanks = VramBanks(0b0011);
    /// All four banks (single-screen default)
    pub const ABCD: VramBanks = VramBanks(0b1111);

    /// Whether every bank in `other` is part of this selection
    pub fn contains(self, other: VramBanks) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Whether the selection overlaps `other` at all
    pub fn intersects(self, other: VramBanks) -> bool {
        (self.0 & other.0) != 0
    }

    /// Number of banks selected
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Total capacity of the selected banks in bytes
    pub fn capacity(self) -> usize {
        self.count() * BANK_SIZE
    }
}

impl std::ops::BitOr for VramBanks {
    type Output = VramBanks;

    fn bitor(self, rhs: VramBanks) -> VramBanks {
        VramBanks(self.0 | rhs.0)
    }
}

/// Errors reported by the video memory allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VramError {
    /// Requested pool configuration is invalid (zero or over-limit capacity,
    /// bad alignment)
    InvalidConfig(String),

    /// No free gap large enough for the request
    OutOfMemory {
        /// Bytes requested
        requested: usize,
        /// Largest contiguous free gap at the time of the request
        available: usize,
    },

    /// Operation on a record id the pool does not track
    InvalidHandle(RecordId),
}

impl fmt::Display for VramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VramError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            VramError::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of video memory: requested {} bytes, largest free gap {} bytes",
                requested, available
            ),
            VramError::InvalidHandle(id) => write!(f, "invalid record handle: {:?}", id),
        }
    }
}

impl std::error::Error for VramError {}
