//! Block headers encoded inside the arena bytes.
//!
//! Each arena segment starts with a header of five little-endian `u64`
//! words:
//!
//! ```text
//! +0   size     payload capacity in bytes (header excluded)
//! +8   flags    bit 0 = free
//! +16  next     offset of the next block in address order, or NIL
//! +24  prev     offset of the previous block in address order, or NIL
//! +32  handle   owning handle, or NIL when free
//! ```
//!
//! Links are byte offsets rather than addresses, so the encoding is
//! position-independent and every access is a bounds-checked slice read.

use cairn_core::Handle;

use crate::config::RAW_HEADER_BYTES;

const NIL: u64 = u64::MAX;
const FLAG_FREE: u64 = 1;

const SIZE_AT: usize = 0;
const FLAGS_AT: usize = 8;
const NEXT_AT: usize = 16;
const PREV_AT: usize = 24;
const HANDLE_AT: usize = 32;

const _: () = assert!(HANDLE_AT + 8 == RAW_HEADER_BYTES);

/// Decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockHeader {
    /// Payload capacity in bytes.
    pub(crate) size: usize,
    pub(crate) is_free: bool,
    /// Offset of the following block, `None` for the last block.
    pub(crate) next: Option<usize>,
    /// Offset of the preceding block, `None` for the first block.
    pub(crate) prev: Option<usize>,
    /// Owning handle; meaningful only while the block is in use.
    pub(crate) handle: Option<Handle>,
}

impl BlockHeader {
    /// A free block with the given size and neighbours.
    pub(crate) fn free(size: usize, prev: Option<usize>, next: Option<usize>) -> Self {
        Self {
            size,
            is_free: true,
            next,
            prev,
            handle: None,
        }
    }

    /// Decode the header stored at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the header would extend past the end of `bytes`.
    pub(crate) fn read(bytes: &[u8], offset: usize) -> Self {
        let flags = read_word(bytes, offset + FLAGS_AT);
        Self {
            size: read_word(bytes, offset + SIZE_AT) as usize,
            is_free: flags & FLAG_FREE != 0,
            next: decode_link(read_word(bytes, offset + NEXT_AT)),
            prev: decode_link(read_word(bytes, offset + PREV_AT)),
            handle: match read_word(bytes, offset + HANDLE_AT) {
                NIL => None,
                raw => Some(Handle(raw as u32)),
            },
        }
    }

    /// Encode this header at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the header would extend past the end of `bytes`.
    pub(crate) fn write(&self, bytes: &mut [u8], offset: usize) {
        let flags = if self.is_free { FLAG_FREE } else { 0 };
        write_word(bytes, offset + SIZE_AT, self.size as u64);
        write_word(bytes, offset + FLAGS_AT, flags);
        write_word(bytes, offset + NEXT_AT, encode_link(self.next));
        write_word(bytes, offset + PREV_AT, encode_link(self.prev));
        write_word(
            bytes,
            offset + HANDLE_AT,
            self.handle.map_or(NIL, |h| u64::from(h.0)),
        );
    }
}

/// Overwrite only the `prev` link of the header at `offset`.
pub(crate) fn set_prev(bytes: &mut [u8], offset: usize, prev: Option<usize>) {
    write_word(bytes, offset + PREV_AT, encode_link(prev));
}

fn decode_link(raw: u64) -> Option<usize> {
    (raw != NIL).then_some(raw as usize)
}

fn encode_link(link: Option<usize>) -> u64 {
    link.map_or(NIL, |o| o as u64)
}

fn read_word(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

fn write_word(bytes: &mut [u8], at: usize, value: u64) {
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
