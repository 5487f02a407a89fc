//! Volume geometry and limits.
//!
//! Everything here derives from `SECTOR_SIZE` and the on-disk word width;
//! the number of sectors on the volume is not a constant but comes from
//! the device.

/// Unit of device I/O, in bytes. Headers occupy exactly one sector.
pub const SECTOR_SIZE: usize = 128;

/// On-disk integer width: fields are little-endian `i32`.
pub const WORD_SIZE: usize = core::mem::size_of::<i32>();

/// Sentinel for an empty pointer slot; also the "unallocated" file length.
pub const INVALID_SECTOR: i32 = -1;

/// Pointer slots per header sector: the sector minus the two length words.
pub const NUM_DIRECT: usize = (SECTOR_SIZE - 2 * WORD_SIZE) / WORD_SIZE;

/// Depth limit of the header tree.
pub const LEVEL_LIMIT: usize = 4;

// 3840 bytes (30 sectors)
pub const MAX_SIZE_L0: usize = NUM_DIRECT * SECTOR_SIZE;
// 115_200 bytes (900 sectors)
pub const MAX_SIZE_L1: usize = NUM_DIRECT * MAX_SIZE_L0;
// 3_456_000 bytes (27_000 sectors)
pub const MAX_SIZE_L2: usize = NUM_DIRECT * MAX_SIZE_L1;
// 103_680_000 bytes (810_000 sectors); files beyond this are rejected
pub const MAX_SIZE_L3: usize = NUM_DIRECT * MAX_SIZE_L2;

/// Byte capacity of a header tree at each level.
pub const MAX_SIZE: [usize; LEVEL_LIMIT] = [MAX_SIZE_L0, MAX_SIZE_L1, MAX_SIZE_L2, MAX_SIZE_L3];

/// Sector holding the free-map file's header.
pub const FREE_MAP_SECTOR: usize = 0;
/// Sector holding the root directory file's header.
pub const DIRECTORY_SECTOR: usize = 1;

/// Fixed number of entries per directory.
pub const NUM_DIR_ENTRIES: usize = 64;
/// Longest stored file name, in bytes (the name field holds one more, zero-padded).
pub const FILE_NAME_MAX_LEN: usize = 9;
/// Serialized directory entry: in-use byte, is-dir byte, sector word, name field.
pub const DIR_ENTRY_SIZE: usize = 1 + 1 + WORD_SIZE + FILE_NAME_MAX_LEN + 1;
/// Byte size of every directory file.
pub const DIRECTORY_FILE_SIZE: usize = NUM_DIR_ENTRIES * DIR_ENTRY_SIZE;

/// Paths at or beyond this byte length resolve to "not found".
pub const PATH_NAME_MAX_LEN: usize = 256;

/// Capacity of the per-filesystem open-file table.
pub const FILE_OPEN_LIMIT: usize = 20;
