//! The on-disk file header (i-node) and its multi-level index tree.
//!
//! A header is exactly one sector: two length words followed by
//! `NUM_DIRECT` pointer slots. The level of a header is derived from its
//! byte length alone. At level 0 the slots point at data sectors; at
//! level k > 0 each slot points at a child header sector whose subtree
//! stores up to `MAX_SIZE[k - 1]` bytes. Children fill slots left to
//! right; the first `INVALID_SECTOR` terminates the slot array, and only
//! the rightmost child on each level may be short.
//!
//! The same record serves every level, so fetch, write-back, allocation,
//! and deallocation are each a single recursive code path.

use tracing::trace;

use crate::bitmap::PersistentBitmap;
use crate::block_dev::BlockDevice;
use crate::codec::{get_i32, put_i32};
use crate::config::*;
use crate::error::{FsError, Result};

/// Smallest level whose tree can index `file_size` bytes.
///
/// Callers must reject larger sizes up front; exceeding `MAX_SIZE[3]`
/// here is a corrupted length word or a façade bug.
pub(crate) fn level_of(file_size: usize) -> usize {
    for level in 0..LEVEL_LIMIT {
        if file_size <= MAX_SIZE[level] {
            return level;
        }
    }
    panic!("file size {file_size} exceeds the maximum indexable size");
}

pub struct FileHeader {
    // disk part
    num_bytes: i32,
    num_data_sectors: i32,
    data_sectors: [i32; NUM_DIRECT],

    // in-core part, rebuilt on fetch and never serialized
    children: Vec<FileHeader>,
    mapping: Vec<i32>,
}

impl FileHeader {
    /// A header in the unallocated state.
    pub fn new() -> Self {
        FileHeader {
            num_bytes: INVALID_SECTOR,
            num_data_sectors: INVALID_SECTOR,
            data_sectors: [INVALID_SECTOR; NUM_DIRECT],
            children: Vec::new(),
            mapping: Vec::new(),
        }
    }

    /// Total sectors an allocation of `file_size` bytes will consume:
    /// data sectors plus every interior child header, excluding the root
    /// header itself (its sector is the caller's to provide).
    pub(crate) fn sectors_required(file_size: usize) -> usize {
        let level = level_of(file_size);
        if level == 0 {
            return file_size.div_ceil(SECTOR_SIZE);
        }
        let mut total = 0;
        let mut remaining = file_size;
        while remaining > 0 {
            let chunk = remaining.min(MAX_SIZE[level - 1]);
            total += 1 + Self::sectors_required(chunk);
            remaining -= chunk;
        }
        total
    }

    /// Builds the index tree for a file of `file_size` bytes, taking
    /// sectors from `free_map`.
    ///
    /// The whole demand (including interior headers) is checked before
    /// anything is taken, so a failed call leaves the map and this header
    /// untouched.
    pub fn allocate(&mut self, free_map: &mut PersistentBitmap, file_size: usize) -> Result<()> {
        assert!(
            self.num_bytes == INVALID_SECTOR,
            "header is already allocated"
        );
        if free_map.num_clear() < Self::sectors_required(file_size) {
            return Err(FsError::OutOfSpace);
        }
        trace!(file_size, level = level_of(file_size), "allocating header tree");
        self.allocate_inner(free_map, file_size)
    }

    fn allocate_inner(&mut self, free_map: &mut PersistentBitmap, file_size: usize) -> Result<()> {
        self.num_bytes = file_size as i32;
        self.num_data_sectors = file_size.div_ceil(SECTOR_SIZE) as i32;
        let level = level_of(file_size);
        if level == 0 {
            for slot in 0..self.num_data_sectors as usize {
                let sector = free_map.find_and_set().ok_or(FsError::OutOfSpace)?;
                self.data_sectors[slot] = sector;
                self.mapping.push(sector);
            }
        } else {
            let mut remaining = file_size;
            let mut slot = 0;
            while remaining > 0 {
                let sector = free_map.find_and_set().ok_or(FsError::OutOfSpace)?;
                let chunk = remaining.min(MAX_SIZE[level - 1]);
                let mut child = FileHeader::new();
                child.allocate_inner(free_map, chunk)?;
                self.data_sectors[slot] = sector;
                self.mapping.extend_from_slice(&child.mapping);
                self.children.push(child);
                remaining -= chunk;
                slot += 1;
            }
        }
        Ok(())
    }

    /// Returns every sector in the tree to `free_map`: data sectors at the
    /// leaves, and each child's own header sector at internal nodes. The
    /// header reverts to the unallocated state.
    pub fn deallocate(&mut self, free_map: &mut PersistentBitmap) {
        let level = level_of(self.num_bytes as usize);
        if level == 0 {
            for slot in 0..self.num_data_sectors as usize {
                free_map.clear(self.data_sectors[slot] as usize);
            }
        } else {
            for (slot, child) in self.children.iter_mut().enumerate() {
                child.deallocate(free_map);
                free_map.clear(self.data_sectors[slot] as usize);
            }
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.num_bytes = INVALID_SECTOR;
        self.num_data_sectors = INVALID_SECTOR;
        self.data_sectors = [INVALID_SECTOR; NUM_DIRECT];
        self.children.clear();
        self.mapping.clear();
    }

    /// Reads the header at `sector` and rebuilds the in-core tree and the
    /// logical-to-physical mapping by depth-first traversal.
    pub fn fetch_from<D: BlockDevice>(&mut self, device: &D, sector: usize) -> Result<()> {
        assert!(self.mapping.is_empty(), "header fetched twice");
        let mut buf = [0u8; SECTOR_SIZE];
        device.read_sector(sector, &mut buf)?;
        self.num_bytes = get_i32(&buf, 0);
        self.num_data_sectors = get_i32(&buf, WORD_SIZE);
        for slot in 0..NUM_DIRECT {
            self.data_sectors[slot] = get_i32(&buf, (2 + slot) * WORD_SIZE);
        }

        let level = level_of(self.num_bytes as usize);
        if level == 0 {
            for slot in 0..self.num_data_sectors as usize {
                self.mapping.push(self.data_sectors[slot]);
            }
        } else {
            for slot in 0..NUM_DIRECT {
                if self.data_sectors[slot] == INVALID_SECTOR {
                    break;
                }
                let mut child = FileHeader::new();
                child.fetch_from(device, self.data_sectors[slot] as usize)?;
                self.mapping.extend_from_slice(&child.mapping);
                self.children.push(child);
            }
        }
        Ok(())
    }

    /// Serializes the disk part into `sector`, recursing so every child
    /// header lands in the sector its parent slot names.
    pub fn write_back<D: BlockDevice>(&self, device: &D, sector: usize) -> Result<()> {
        let mut buf = [0u8; SECTOR_SIZE];
        put_i32(&mut buf, 0, self.num_bytes);
        put_i32(&mut buf, WORD_SIZE, self.num_data_sectors);
        for slot in 0..NUM_DIRECT {
            put_i32(&mut buf, (2 + slot) * WORD_SIZE, self.data_sectors[slot]);
        }
        device.write_sector(sector, &buf)?;

        if level_of(self.num_bytes as usize) > 0 {
            for (slot, child) in self.children.iter().enumerate() {
                child.write_back(device, self.data_sectors[slot] as usize)?;
            }
        }
        Ok(())
    }

    /// Physical sector holding the byte at `offset`.
    pub fn byte_to_sector(&self, offset: usize) -> i32 {
        let logical = offset / SECTOR_SIZE;
        assert!(
            logical < self.mapping.len() && self.mapping.len() == self.num_data_sectors as usize,
            "offset {offset} beyond the mapped extent"
        );
        self.mapping[logical]
    }

    /// File length in bytes.
    pub fn file_length(&self) -> usize {
        self.num_bytes as usize
    }

    /// Depth of the index tree (0 = leaf).
    pub fn level(&self) -> usize {
        level_of(self.num_bytes as usize)
    }

    /// Number of data sectors backing the file.
    pub fn data_sector_count(&self) -> usize {
        self.num_data_sectors as usize
    }

    /// Releases the file whose header lives at `sector`: the header
    /// sector itself, then everything its tree reaches.
    pub fn reclaim<D: BlockDevice>(
        device: &D,
        free_map: &mut PersistentBitmap,
        sector: usize,
    ) -> Result<()> {
        free_map.clear(sector);
        let mut header = FileHeader::new();
        header.fetch_from(device, sector)?;
        header.deallocate(free_map);
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}
