//! Little-endian word codec for on-disk structures.

use crate::config::WORD_SIZE;

pub(crate) fn get_i32(buf: &[u8], offset: usize) -> i32 {
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(&buf[offset..offset + WORD_SIZE]);
    i32::from_le_bytes(word)
}

pub(crate) fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + WORD_SIZE].copy_from_slice(&value.to_le_bytes());
}
