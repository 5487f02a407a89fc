//! Random-access cursor over one file.
//!
//! An `OpenFile` is ephemeral: it fetches its header on construction and
//! holds nothing the disk does not already know. Files never grow, so the
//! header is read-only here and is never written back.

use std::sync::Arc;

use crate::block_dev::BlockDevice;
use crate::config::SECTOR_SIZE;
use crate::error::Result;
use crate::header::FileHeader;

pub struct OpenFile<D: BlockDevice> {
    device: Arc<D>,
    header: FileHeader,
    pos: usize,
}

impl<D: BlockDevice> OpenFile<D> {
    /// Opens the file whose header lives at `sector`; the cursor starts
    /// at offset 0.
    pub fn new(device: Arc<D>, sector: usize) -> Result<Self> {
        let mut header = FileHeader::new();
        header.fetch_from(&*device, sector)?;
        Ok(OpenFile {
            device,
            header,
            pos: 0,
        })
    }

    /// File length in bytes.
    pub fn length(&self) -> usize {
        self.header.file_length()
    }

    /// The file's header, for introspection.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Moves the cursor. Seeking past the end is allowed; subsequent
    /// transfers there move 0 bytes.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Reads from the cursor, advancing it by the number of bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let read = self.read_at(buf, self.pos)?;
        self.pos += read;
        Ok(read)
    }

    /// Writes at the cursor, advancing it by the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = self.write_at(buf, self.pos)?;
        self.pos += written;
        Ok(written)
    }

    /// Reads up to `buf.len()` bytes starting at `pos`, clamped to the
    /// file length. Returns the number of bytes read.
    pub fn read_at(&self, buf: &mut [u8], pos: usize) -> Result<usize> {
        let file_len = self.length();
        if buf.is_empty() || pos >= file_len {
            return Ok(0);
        }
        let count = buf.len().min(file_len - pos);

        let mut sector_buf = [0u8; SECTOR_SIZE];
        let mut copied = 0;
        while copied < count {
            let offset = pos + copied;
            let sector = self.header.byte_to_sector(offset) as usize;
            let start = offset % SECTOR_SIZE;
            let take = (SECTOR_SIZE - start).min(count - copied);
            self.device.read_sector(sector, &mut sector_buf)?;
            buf[copied..copied + take].copy_from_slice(&sector_buf[start..start + take]);
            copied += take;
        }
        Ok(count)
    }

    /// Writes up to `buf.len()` bytes starting at `pos`, clamped to the
    /// file length — files never grow. Returns the number of bytes
    /// written; a write at or past the end writes nothing.
    pub fn write_at(&self, buf: &[u8], pos: usize) -> Result<usize> {
        let file_len = self.length();
        if buf.is_empty() || pos >= file_len {
            return Ok(0);
        }
        let count = buf.len().min(file_len - pos);

        let mut sector_buf = [0u8; SECTOR_SIZE];
        let mut copied = 0;
        while copied < count {
            let offset = pos + copied;
            let sector = self.header.byte_to_sector(offset) as usize;
            let start = offset % SECTOR_SIZE;
            let take = (SECTOR_SIZE - start).min(count - copied);
            if take < SECTOR_SIZE {
                // partial sector: preserve the bytes around the write
                self.device.read_sector(sector, &mut sector_buf)?;
            }
            sector_buf[start..start + take].copy_from_slice(&buf[copied..copied + take]);
            self.device.write_sector(sector, &sector_buf)?;
            copied += take;
        }
        Ok(count)
    }
}
