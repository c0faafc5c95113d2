// Pool - one fixed-capacity linear address space
//
// Free space is kept as an address-ordered gap list; allocation is
// first-fit. Releasing the last reference to a record merges its range
// into the adjacent gaps so fragmentation stays bounded under the
// many-small-mostly-uniform allocation pattern textures produce.

use super::{VramError, MAX_POOL_CAPACITY};

/// Opaque identity of one allocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(u32);

/// One tracked allocation: a disjoint byte range plus its reference count
#[derive(Debug, Clone)]
struct Record {
    id: RecordId,
    offset: usize,
    size: usize,
    refcount: u32,
}

/// One free gap between records
#[derive(Debug, Clone, Copy)]
struct Gap {
    offset: usize,
    size: usize,
}

/// A fixed-capacity memory pool with reference-counted records
pub struct Pool {
    capacity: usize,
    /// Live records, kept in address order
    records: Vec<Record>,
    /// Free gaps, kept in address order and never adjacent to each other
    gaps: Vec<Gap>,
    /// Backing storage for uploads
    data: Vec<u8>,
    /// Sum of live record sizes
    used: usize,
    next_id: u32,
}

impl Pool {
    /// Create an empty pool of `capacity` bytes
    ///
    /// Fails with `InvalidConfig` if the capacity is zero or exceeds the
    /// hardware limit.
    pub fn new(capacity: usize) -> Result<Self, VramError> {
        if capacity == 0 {
            return Err(VramError::InvalidConfig("pool capacity is zero".into()));
        }
        if capacity > MAX_POOL_CAPACITY {
            return Err(VramError::InvalidConfig(format!(
                "pool capacity {} exceeds hardware limit {}",
                capacity, MAX_POOL_CAPACITY
            )));
        }
        Ok(Self {
            capacity,
            records: Vec::new(),
            gaps: vec![Gap {
                offset: 0,
                size: capacity,
            }],
            data: vec![0; capacity],
            used: 0,
            next_id: 0,
        })
    }

    /// Discard every record and reinitialize to `capacity` empty bytes
    pub fn reset(&mut self, capacity: usize) -> Result<(), VramError> {
        *self = Pool::new(capacity)?;
        Ok(())
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes not covered by any live record
    pub fn free_bytes(&self) -> usize {
        self.capacity - self.used
    }

    /// Bytes covered by live records
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Number of live records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Reference count of a record, if tracked
    pub fn refcount(&self, id: RecordId) -> Option<u32> {
        self.records.iter().find(|r| r.id == id).map(|r| r.refcount)
    }

    /// Byte offset of a record, if tracked
    pub fn offset_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().find(|r| r.id == id).map(|r| r.offset)
    }

    /// Size of a record in bytes, if tracked
    pub fn size_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().find(|r| r.id == id).map(|r| r.size)
    }

    /// Allocate `size` bytes at the lowest free address satisfying `align`
    ///
    /// First-fit over the address-ordered gap list. Alignment padding left
    /// in front of the chosen range stays on the free list. The new record
    /// starts with a reference count of one.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<RecordId, VramError> {
        if size == 0 {
            return Err(VramError::InvalidConfig("allocation size is zero".into()));
        }
        if align == 0 || !align.is_power_of_two() {
            return Err(VramError::InvalidConfig(format!(
                "alignment {} is not a power of two",
                align
            )));
        }

        for i in 0..self.gaps.len() {
            let gap = self.gaps[i];
            let aligned = (gap.offset + align - 1) & !(align - 1);
            let padding = aligned - gap.offset;
            if padding + size > gap.size {
                continue;
            }

            let tail = gap.size - padding - size;
            // Replace the gap with up to two smaller gaps (padding + tail)
            self.gaps.remove(i);
            if tail > 0 {
                self.gaps.insert(
                    i,
                    Gap {
                        offset: aligned + size,
                        size: tail,
                    },
                );
            }
            if padding > 0 {
                self.gaps.insert(i, Gap {
                    offset: gap.offset,
                    size: padding,
                });
            }

            let id = RecordId(self.next_id);
            self.next_id += 1;

            let pos = self
                .records
                .iter()
                .position(|r| r.offset > aligned)
                .unwrap_or(self.records.len());
            self.records.insert(
                pos,
                Record {
                    id,
                    offset: aligned,
                    size,
                    refcount: 1,
                },
            );
            self.used += size;
            return Ok(id);
        }

        Err(VramError::OutOfMemory {
            requested: size,
            available: self.gaps.iter().map(|g| g.size).max().unwrap_or(0),
        })
    }

    /// Add a reference to an existing record
    ///
    /// Returns the same identity: the two handles alias one physical
    /// block, there is no copy.
    pub fn clone_record(&mut self, id: RecordId) -> Result<RecordId, VramError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(VramError::InvalidHandle(id))?;
        record.refcount += 1;
        Ok(id)
    }

    /// Drop a reference to a record
    ///
    /// When the count reaches zero the record is removed and its range is
    /// merged into the neighboring free gaps.
    pub fn release(&mut self, id: RecordId) -> Result<(), VramError> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(VramError::InvalidHandle(id))?;

        self.records[pos].refcount -= 1;
        if self.records[pos].refcount > 0 {
            return Ok(());
        }

        let record = self.records.remove(pos);
        self.used -= record.size;
        self.insert_gap(Gap {
            offset: record.offset,
            size: record.size,
        });
        Ok(())
    }

    /// Copy `data` into a record's backing storage
    ///
    /// Fails with `InvalidHandle` for untracked records and
    /// `InvalidConfig` when `data` is longer than the record.
    pub fn upload(&mut self, id: RecordId, data: &[u8]) -> Result<(), VramError> {
        let record = self
            .records
            .iter()
            .find(|r| r.id == id)
            .ok_or(VramError::InvalidHandle(id))?;
        if data.len() > record.size {
            return Err(VramError::InvalidConfig(format!(
                "upload of {} bytes into a {}-byte record",
                data.len(),
                record.size
            )));
        }
        let offset = record.offset;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Read back a record's bytes
    pub fn read_back(&self, id: RecordId) -> Result<&[u8], VramError> {
        let record = self
            .records
            .iter()
            .find(|r| r.id == id)
            .ok_or(VramError::InvalidHandle(id))?;
        Ok(&self.data[record.offset..record.offset + record.size])
    }

    /// Insert a gap, coalescing with address-adjacent neighbors
    fn insert_gap(&mut self, gap: Gap) {
        let pos = self
            .gaps
            .iter()
            .position(|g| g.offset > gap.offset)
            .unwrap_or(self.gaps.len());
        self.gaps.insert(pos, gap);

        // Merge with the following gap
        if pos + 1 < self.gaps.len()
            && self.gaps[pos].offset + self.gaps[pos].size == self.gaps[pos + 1].offset
        {
            self.gaps[pos].size += self.gaps[pos + 1].size;
            self.gaps.remove(pos + 1);
        }
        // Merge with the preceding gap
        if pos > 0 && self.gaps[pos - 1].offset + self.gaps[pos - 1].size == self.gaps[pos].offset {
            self.gaps[pos - 1].size += self.gaps[pos].size;
            self.gaps.remove(pos);
        }
    }
}
