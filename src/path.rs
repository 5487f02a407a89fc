//! Absolute-path resolution.
//!
//! Paths are split on `/` with empty segments skipped, so `//a`, `/a`,
//! and `/a/` all name the same entry. Intermediate segments must be
//! directories; the final segment is looked up with the caller's kind.

use std::sync::Arc;

use crate::block_dev::BlockDevice;
use crate::config::{DIRECTORY_SECTOR, INVALID_SECTOR, PATH_NAME_MAX_LEN};
use crate::directory::Directory;
use crate::error::{FsError, Result};
use crate::file::OpenFile;

/// What the final path segment must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
}

/// Outcome of a resolution.
///
/// `parent_sector` is valid only when every intermediate segment
/// resolved; a miss deeper in the path leaves it `INVALID_SECTOR` so
/// creation cannot land in the wrong directory.
#[derive(Debug)]
pub struct Resolved {
    pub exists: bool,
    pub sector: i32,
    pub parent_sector: i32,
    pub leaf_name: String,
}

impl Resolved {
    fn miss(parent_sector: i32, leaf_name: String) -> Self {
        Resolved {
            exists: false,
            sector: INVALID_SECTOR,
            parent_sector,
            leaf_name,
        }
    }
}

/// Walks `path` from the root directory, reporting the leaf's header
/// sector and its parent directory's header sector.
///
/// The caller's `root` handle is only read through; intermediate
/// directories are opened and dropped here.
pub fn resolve<D: BlockDevice>(
    device: &Arc<D>,
    root: &OpenFile<D>,
    path: &str,
    kind: FileKind,
) -> Result<Resolved> {
    if path.len() >= PATH_NAME_MAX_LEN {
        // over-long paths are simply "not found", before any lookup
        return Ok(Resolved::miss(INVALID_SECTOR, String::new()));
    }
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath);
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        // the root itself: a directory with no parent
        return Ok(Resolved {
            exists: kind == FileKind::Dir,
            sector: if kind == FileKind::Dir {
                DIRECTORY_SECTOR as i32
            } else {
                INVALID_SECTOR
            },
            parent_sector: INVALID_SECTOR,
            leaf_name: String::new(),
        });
    }
    let leaf_name = segments[segments.len() - 1].to_string();

    let mut dir = Directory::new();
    dir.fetch_from(root)?;
    let mut parent_sector = DIRECTORY_SECTOR as i32;

    for (index, segment) in segments.iter().enumerate() {
        let last = index + 1 == segments.len();
        let want_dir = !last || kind == FileKind::Dir;
        match dir.find(segment, want_dir) {
            Some(sector) if last => {
                return Ok(Resolved {
                    exists: true,
                    sector,
                    parent_sector,
                    leaf_name,
                });
            }
            Some(sector) => {
                let child = OpenFile::new(Arc::clone(device), sector as usize)?;
                dir.fetch_from(&child)?;
                parent_sector = sector;
            }
            None => {
                // only a leaf-level miss leaves a usable parent
                let parent = if last { parent_sector } else { INVALID_SECTOR };
                return Ok(Resolved::miss(parent, leaf_name));
            }
        }
    }
    unreachable!("the final segment either matched or missed");
}
