//! The fixed-length footer appended to every compressed blob.
//!
//! Layout, 26 bytes total:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 2    | deflate close marker, fixed bytes `0x03 0x00` |
//! | 2      | 8    | uncompressed length (big-endian) |
//! | 10     | 8    | compressed length (big-endian) |
//! | 18     | 8    | CRC-32 of the uncompressed data, widened to 8 bytes |
//!
//! The 2-byte marker is a final fixed-Huffman deflate block containing only
//! the end-of-block symbol, so a blob read in isolation stays independently
//! inflatable by skipping just the trailing 24 bytes. When blobs are merged,
//! the full 26 bytes are stripped from every part and a single shared marker
//! is appended at the end (see [`crate::stream::CombineReader`]).

use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use crate::error::{Error, Result};

/// A final deflate block holding nothing but the end-of-block symbol.
pub const CLOSE_MARKER: [u8; 2] = [0x03, 0x00];

/// Total serialized footer length.
pub const FOOTER_LEN: usize = 26;

/// Footer length as seen by an isolated reader, which keeps the close marker
/// in the data so the blob remains inflatable on its own.
pub const ISOLATED_FOOTER_LEN: usize = FOOTER_LEN - CLOSE_MARKER.len();

/// Decoded footer fields.
///
/// The CRC is stored widened to a u64 as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub uncompressed_len: u64,
    pub compressed_len: u64,
    pub crc32: u64,
}

impl Footer {
    /// Decode a footer from its serialized bytes.
    ///
    /// Accepts either the full 26-byte form (the leading close marker is
    /// skipped) or the 24-byte isolated form, distinguished solely by input
    /// length. Any other length fails with [`Error::FooterSize`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let body = match bytes.len() {
            FOOTER_LEN => &bytes[CLOSE_MARKER.len()..],
            ISOLATED_FOOTER_LEN => bytes,
            n => return Err(Error::FooterSize(n)),
        };

        let mut cursor = Cursor::new(body);
        Ok(Self {
            uncompressed_len: cursor.read_u64::<BigEndian>()?,
            compressed_len: cursor.read_u64::<BigEndian>()?,
            crc32: cursor.read_u64::<BigEndian>()?,
        })
    }
}

/// Serialize a footer, close marker included.
pub fn serialize(uncompressed_len: u64, compressed_len: u64, crc32: u64) -> [u8; FOOTER_LEN] {
    let mut buf = [0u8; FOOTER_LEN];
    buf[..2].copy_from_slice(&CLOSE_MARKER);
    BigEndian::write_u64(&mut buf[2..10], uncompressed_len);
    BigEndian::write_u64(&mut buf[10..18], compressed_len);
    BigEndian::write_u64(&mut buf[18..26], crc32);
    buf
}
