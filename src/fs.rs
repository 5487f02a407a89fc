//! The filesystem façade: formatting, naming, and the open-file table.
//!
//! Every operation materializes the free map from the free-map file,
//! works on in-core copies, and writes the touched structures back before
//! returning; a failure before the write-back phase leaves the disk
//! untouched. The caller serializes all entry points — there is no
//! locking here.

use std::array;
use std::sync::Arc;

use tracing::debug;

use crate::bitmap::PersistentBitmap;
use crate::block_dev::BlockDevice;
use crate::config::*;
use crate::directory::Directory;
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::header::FileHeader;
use crate::path::{resolve, FileKind};

/// Index into the open-file table.
pub type OpenFileId = usize;

pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    free_map_file: OpenFile<D>,
    root_dir_file: OpenFile<D>,
    open_files: [Option<OpenFile<D>>; FILE_OPEN_LIMIT],
}

impl<D: BlockDevice> FileSystem<D> {
    /// Initializes an empty volume and mounts it.
    ///
    /// Sectors 0 and 1 are reserved for the free-map and root-directory
    /// headers; both files' data sectors are allocated here and the two
    /// files stay open for the filesystem's lifetime.
    pub fn format(device: Arc<D>) -> Result<Self> {
        let num_sectors = device.num_sectors();
        debug!(num_sectors, "formatting volume");

        let mut free_map = PersistentBitmap::new(num_sectors);
        free_map.mark(FREE_MAP_SECTOR);
        free_map.mark(DIRECTORY_SECTOR);

        let mut map_header = FileHeader::new();
        map_header.allocate(&mut free_map, num_sectors.div_ceil(8))?;
        let mut dir_header = FileHeader::new();
        dir_header.allocate(&mut free_map, DIRECTORY_FILE_SIZE)?;

        // headers must be on disk before the files can be opened
        map_header.write_back(&*device, FREE_MAP_SECTOR)?;
        dir_header.write_back(&*device, DIRECTORY_SECTOR)?;

        let free_map_file = OpenFile::new(Arc::clone(&device), FREE_MAP_SECTOR)?;
        let root_dir_file = OpenFile::new(Arc::clone(&device), DIRECTORY_SECTOR)?;
        free_map.write_back(&free_map_file)?;
        Directory::new().write_back(&root_dir_file)?;

        Ok(FileSystem {
            device,
            free_map_file,
            root_dir_file,
            open_files: array::from_fn(|_| None),
        })
    }

    /// Mounts a previously formatted volume.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let free_map_file = OpenFile::new(Arc::clone(&device), FREE_MAP_SECTOR)?;
        let root_dir_file = OpenFile::new(Arc::clone(&device), DIRECTORY_SECTOR)?;
        Ok(FileSystem {
            device,
            free_map_file,
            root_dir_file,
            open_files: array::from_fn(|_| None),
        })
    }

    /// Creates a regular file of fixed `size` bytes at `path`.
    pub fn create(&mut self, path: &str, size: usize) -> Result<()> {
        if size > MAX_SIZE_L3 {
            return Err(FsError::FileTooLarge);
        }
        debug!(path, size, "create file");
        self.create_entry(path, FileKind::File, size)
    }

    /// Creates an empty directory at `path`.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        debug!(path, "create directory");
        self.create_entry(path, FileKind::Dir, DIRECTORY_FILE_SIZE)
    }

    fn create_entry(&mut self, path: &str, kind: FileKind, size: usize) -> Result<()> {
        let resolved = resolve(&self.device, &self.root_dir_file, path, kind)?;
        if resolved.exists {
            return Err(FsError::AlreadyExists);
        }
        if resolved.parent_sector == INVALID_SECTOR {
            // an intermediate directory is missing
            return Err(FsError::NotFound);
        }

        let mut free_map = self.fetch_free_map()?;
        let sector = free_map.find_and_set().ok_or(FsError::OutOfSpace)?;

        let parent_file = OpenFile::new(Arc::clone(&self.device), resolved.parent_sector as usize)?;
        let mut parent = Directory::new();
        parent.fetch_from(&parent_file)?;
        parent.add(&resolved.leaf_name, sector, kind == FileKind::Dir)?;

        let mut header = FileHeader::new();
        header.allocate(&mut free_map, size)?;

        // nothing reached the disk until here; now commit everything
        header.write_back(&*self.device, sector as usize)?;
        parent.write_back(&parent_file)?;
        free_map.write_back(&self.free_map_file)?;
        if kind == FileKind::Dir {
            let new_file = OpenFile::new(Arc::clone(&self.device), sector as usize)?;
            Directory::new().write_back(&new_file)?;
        }
        Ok(())
    }

    /// Removes the entry at `path`.
    ///
    /// Non-recursive removal applies to regular files only. Recursive
    /// removal resolves a directory, reclaims everything beneath it, and
    /// leaves the now-empty directory itself linked in its parent; when
    /// `path` is not a directory it falls back to the non-recursive form.
    pub fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        if !recursive {
            return self.remove_file(path);
        }
        let resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::Dir)?;
        if !resolved.exists {
            return self.remove_file(path);
        }
        debug!(path, "recursive remove");

        let mut free_map = self.fetch_free_map()?;
        let dir_file = OpenFile::new(Arc::clone(&self.device), resolved.sector as usize)?;
        let mut dir = Directory::new();
        dir.fetch_from(&dir_file)?;
        dir.remove_all(&self.device, &mut free_map)?;
        dir.write_back(&dir_file)?;
        free_map.write_back(&self.free_map_file)?;
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Result<()> {
        let resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::File)?;
        if !resolved.exists {
            return Err(FsError::NotFound);
        }
        debug!(path, "remove file");

        let mut free_map = self.fetch_free_map()?;
        FileHeader::reclaim(&*self.device, &mut free_map, resolved.sector as usize)?;

        let parent_file = OpenFile::new(Arc::clone(&self.device), resolved.parent_sector as usize)?;
        let mut parent = Directory::new();
        parent.fetch_from(&parent_file)?;
        parent.remove(&resolved.leaf_name, false)?;

        free_map.write_back(&self.free_map_file)?;
        parent.write_back(&parent_file)?;
        Ok(())
    }

    /// Opens `path` and returns a slot in the open-file table. Regular
    /// files take precedence; a directory of the same name is opened when
    /// no file matches.
    pub fn open(&mut self, path: &str) -> Result<OpenFileId> {
        let mut resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::File)?;
        if !resolved.exists {
            resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::Dir)?;
        }
        if !resolved.exists {
            return Err(FsError::NotFound);
        }
        let slot = self
            .open_files
            .iter()
            .position(|entry| entry.is_none())
            .ok_or(FsError::TooManyOpenFiles)?;
        debug!(path, slot, "open");
        self.open_files[slot] = Some(OpenFile::new(Arc::clone(&self.device), resolved.sector as usize)?);
        Ok(slot)
    }

    /// Reads at the handle's cursor, advancing it.
    pub fn read(&mut self, id: OpenFileId, buf: &mut [u8]) -> Result<usize> {
        self.handle_mut(id)?.read(buf)
    }

    /// Writes at the handle's cursor, advancing it.
    pub fn write(&mut self, id: OpenFileId, buf: &[u8]) -> Result<usize> {
        self.handle_mut(id)?.write(buf)
    }

    /// Repositions the handle's cursor.
    pub fn seek(&mut self, id: OpenFileId, pos: usize) -> Result<()> {
        self.handle_mut(id)?.seek(pos);
        Ok(())
    }

    /// Closes a handle, freeing its table slot.
    pub fn close(&mut self, id: OpenFileId) -> Result<()> {
        let slot = self
            .open_files
            .get_mut(id)
            .ok_or(FsError::BadFileId(id))?;
        if slot.is_none() {
            return Err(FsError::BadFileId(id));
        }
        *slot = None;
        Ok(())
    }

    fn handle_mut(&mut self, id: OpenFileId) -> Result<&mut OpenFile<D>> {
        self.open_files
            .get_mut(id)
            .and_then(|slot| slot.as_mut())
            .ok_or(FsError::BadFileId(id))
    }

    /// Human-readable listing of the directory at `path`; recursive
    /// listings indent two spaces per level.
    pub fn list(&self, path: &str, recursive: bool) -> Result<String> {
        let resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::Dir)?;
        if !resolved.exists {
            return Err(FsError::NotFound);
        }
        let dir_file = OpenFile::new(Arc::clone(&self.device), resolved.sector as usize)?;
        let mut dir = Directory::new();
        dir.fetch_from(&dir_file)?;
        if recursive {
            let mut out = String::new();
            dir.list_recursive(&self.device, 0, &mut out)?;
            Ok(out)
        } else {
            Ok(dir.list())
        }
    }

    /// Header summary for the entry at `path`: length, tree level, and
    /// sector usage. Directories take precedence over same-named files.
    pub fn stat(&self, path: &str) -> Result<String> {
        let mut resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::Dir)?;
        if !resolved.exists {
            resolved = resolve(&self.device, &self.root_dir_file, path, FileKind::File)?;
        }
        if !resolved.exists {
            return Err(FsError::NotFound);
        }
        let file = OpenFile::new(Arc::clone(&self.device), resolved.sector as usize)?;
        let header = file.header();
        Ok(format!(
            "{path}: {} bytes, level {}, {} data sectors, header at sector {}",
            header.file_length(),
            header.level(),
            header.data_sector_count(),
            resolved.sector
        ))
    }

    /// Volume-wide report: sector totals and the full tree.
    pub fn dump(&self) -> Result<String> {
        let free_map = self.fetch_free_map()?;
        let total = free_map.num_bits();
        let free = free_map.num_clear();
        let mut out = format!("volume: {total} sectors, {} in use, {free} free\n/\n", total - free);
        let mut root = Directory::new();
        root.fetch_from(&self.root_dir_file)?;
        root.list_recursive(&self.device, 1, &mut out)?;
        Ok(out)
    }

    /// Free-sector count, straight from the free-map file.
    pub fn free_sectors(&self) -> Result<usize> {
        Ok(self.fetch_free_map()?.num_clear())
    }

    /// Byte-for-byte snapshot of the free map.
    pub fn free_map_snapshot(&self) -> Result<Vec<u8>> {
        Ok(self.fetch_free_map()?.as_bytes().to_vec())
    }

    fn fetch_free_map(&self) -> Result<PersistentBitmap> {
        PersistentBitmap::fetch_from(&self.free_map_file, self.device.num_sectors())
    }
}
