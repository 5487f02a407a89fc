//! Directories: fixed tables of named entries, stored as regular files.
//!
//! Every directory file is `NUM_DIR_ENTRIES * DIR_ENTRY_SIZE` bytes and
//! is loaded and written back whole. An entry is keyed by its
//! `(name, is_dir)` pair, so a file and a directory of the same name may
//! coexist.

use std::sync::Arc;

use crate::bitmap::PersistentBitmap;
use crate::block_dev::BlockDevice;
use crate::codec::{get_i32, put_i32};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::header::FileHeader;

#[derive(Debug, Clone, Copy)]
pub struct DirectoryEntry {
    pub in_use: bool,
    pub is_dir: bool,
    pub sector: i32,
    name: [u8; FILE_NAME_MAX_LEN + 1],
}

impl DirectoryEntry {
    const EMPTY: Self = DirectoryEntry {
        in_use: false,
        is_dir: false,
        sector: INVALID_SECTOR,
        name: [0; FILE_NAME_MAX_LEN + 1],
    };

    /// The stored name, without its zero padding.
    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        // names only enter through `Directory::add`, which takes &str
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    fn matches(&self, name: &str, is_dir: bool) -> bool {
        self.in_use && self.is_dir == is_dir && self.name() == name
    }
}

pub struct Directory {
    table: [DirectoryEntry; NUM_DIR_ENTRIES],
}

impl Directory {
    /// An empty directory table.
    pub fn new() -> Self {
        Directory {
            table: [DirectoryEntry::EMPTY; NUM_DIR_ENTRIES],
        }
    }

    /// Loads the table from a directory file.
    pub fn fetch_from<D: BlockDevice>(&mut self, file: &OpenFile<D>) -> Result<()> {
        let mut buf = [0u8; DIRECTORY_FILE_SIZE];
        let read = file.read_at(&mut buf, 0)?;
        if read != DIRECTORY_FILE_SIZE {
            return Err(FsError::Io(format!(
                "directory truncated: {read} of {DIRECTORY_FILE_SIZE} bytes"
            )));
        }
        for (index, entry) in self.table.iter_mut().enumerate() {
            let base = index * DIR_ENTRY_SIZE;
            entry.in_use = buf[base] != 0;
            entry.is_dir = buf[base + 1] != 0;
            entry.sector = get_i32(&buf, base + 2);
            entry.name.copy_from_slice(&buf[base + 2 + WORD_SIZE..base + DIR_ENTRY_SIZE]);
        }
        Ok(())
    }

    /// Writes the whole table back to a directory file.
    pub fn write_back<D: BlockDevice>(&self, file: &OpenFile<D>) -> Result<()> {
        let mut buf = [0u8; DIRECTORY_FILE_SIZE];
        for (index, entry) in self.table.iter().enumerate() {
            let base = index * DIR_ENTRY_SIZE;
            buf[base] = entry.in_use as u8;
            buf[base + 1] = entry.is_dir as u8;
            put_i32(&mut buf, base + 2, entry.sector);
            buf[base + 2 + WORD_SIZE..base + DIR_ENTRY_SIZE].copy_from_slice(&entry.name);
        }
        file.write_at(&buf, 0)?;
        Ok(())
    }

    fn find_index(&self, name: &str, is_dir: bool) -> Option<usize> {
        self.table.iter().position(|entry| entry.matches(name, is_dir))
    }

    /// Header sector of the matching entry, if any.
    pub fn find(&self, name: &str, is_dir: bool) -> Option<i32> {
        self.find_index(name, is_dir).map(|index| self.table[index].sector)
    }

    /// Inserts an entry into the first free slot.
    pub fn add(&mut self, name: &str, sector: i32, is_dir: bool) -> Result<()> {
        if name.is_empty() || name.len() > FILE_NAME_MAX_LEN {
            return Err(FsError::InvalidFileName);
        }
        if self.find_index(name, is_dir).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self
            .table
            .iter()
            .position(|entry| !entry.in_use)
            .ok_or(FsError::DirectoryFull)?;
        let entry = &mut self.table[slot];
        entry.in_use = true;
        entry.is_dir = is_dir;
        entry.sector = sector;
        entry.name = [0; FILE_NAME_MAX_LEN + 1];
        entry.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }

    /// Frees the matching entry. Sector reclamation is the caller's job.
    pub fn remove(&mut self, name: &str, is_dir: bool) -> Result<()> {
        let index = self.find_index(name, is_dir).ok_or(FsError::NotFound)?;
        self.table[index].in_use = false;
        Ok(())
    }

    /// Reclaims every child of this directory — sub-directories
    /// depth-first, then each child's header tree — and frees all
    /// entries. The directory's own sectors are untouched.
    pub fn remove_all<D: BlockDevice>(
        &mut self,
        device: &Arc<D>,
        free_map: &mut PersistentBitmap,
    ) -> Result<()> {
        for index in 0..NUM_DIR_ENTRIES {
            if !self.table[index].in_use {
                continue;
            }
            let sector = self.table[index].sector;
            if self.table[index].is_dir {
                let child_file = OpenFile::new(Arc::clone(device), sector as usize)?;
                let mut child = Directory::new();
                child.fetch_from(&child_file)?;
                child.remove_all(device, free_map)?;
            }
            FileHeader::reclaim(&**device, free_map, sector as usize)?;
            self.table[index].in_use = false;
        }
        Ok(())
    }

    /// In-use entries, in table order.
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.table.iter().filter(|entry| entry.in_use)
    }

    /// One name per line; directories carry a trailing `/`.
    pub fn list(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            out.push_str(entry.name());
            if entry.is_dir {
                out.push('/');
            }
            out.push('\n');
        }
        out
    }

    /// Like `list`, but descends into sub-directories, indenting two
    /// spaces per level.
    pub fn list_recursive<D: BlockDevice>(
        &self,
        device: &Arc<D>,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        for entry in self.entries() {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(entry.name());
            if entry.is_dir {
                out.push('/');
            }
            out.push('\n');
            if entry.is_dir {
                let child_file = OpenFile::new(Arc::clone(device), entry.sector as usize)?;
                let mut child = Directory::new();
                child.fetch_from(&child_file)?;
                child.list_recursive(device, depth + 1, out)?;
            }
        }
        Ok(())
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
