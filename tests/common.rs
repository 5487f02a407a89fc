//! Common utilities for tests
#![allow(unused)]

use std::sync::Mutex;

use sectorfs::{BlockDevice, FsError, SECTOR_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Colored test logging, e.g. log!("formatted {} sectors", n).
macro_rules! log {
    ($($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($($arg)*), crate::common::RESET)
    };
}

/// Surfaces the library's tracing events when a test wants them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// In-memory sector device.
pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
    num_sectors: usize,
}

impl RamDisk {
    /// A zeroed volume of `num_sectors` sectors.
    pub fn new(num_sectors: usize) -> Self {
        RamDisk {
            inner: Mutex::new(vec![0u8; num_sectors * SECTOR_SIZE]),
            num_sectors,
        }
    }
}

impl BlockDevice for RamDisk {
    fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    fn read_sector(&self, sector: usize, buf: &mut [u8]) -> Result<(), FsError> {
        if sector >= self.num_sectors {
            return Err(FsError::InvalidSector(sector));
        }
        let start = sector * SECTOR_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&self, sector: usize, buf: &[u8]) -> Result<(), FsError> {
        if sector >= self.num_sectors {
            return Err(FsError::InvalidSector(sector));
        }
        let start = sector * SECTOR_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + SECTOR_SIZE].copy_from_slice(buf);
        Ok(())
    }
}
