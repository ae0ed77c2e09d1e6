//! # parflate
//!
//! Concatenable raw deflate streams for batch data pipelines.
//!
//! Workers compress their slice of a dataset independently into raw
//! (headerless) deflate blobs, each finished with a fixed 26-byte footer
//! recording the uncompressed length, compressed length and CRC-32. Because
//! the compressed bytes are sync-flushed to a byte boundary and the CRCs can
//! be combined algebraically, any number of such blobs can later be stitched
//! into one valid deflate stream — or placed into a ZIP archive as
//! pre-deflated entries — without inflating a single byte.
//!
//! ## Features
//!
//! - Footered raw-deflate blobs via [`DeflateWriter`], readable in isolation
//! - Merging blobs without recompression via [`CombineReader`], including the
//!   combined CRC-32 ([`crc::combine`])
//! - ZIP assembly with per-entry raw or deflate payloads via
//!   [`ModalZipWriter`], ZIP64 included
//! - A [`Codec`] factory for pipelines that plug in their own buffer sizing
//!
//! ## Example
//!
//! ```
//! use std::io::{Cursor, Read};
//! use parflate::{codec, CombineReader};
//!
//! fn main() -> parflate::Result<()> {
//!     // two workers compress their halves independently
//!     let mut first = Vec::new();
//!     codec::compress(Cursor::new(b"ABCD".to_vec()), &mut first)?;
//!     let mut second = Vec::new();
//!     codec::compress(Cursor::new(b"EFGHIJ".to_vec()), &mut second)?;
//!
//!     // merge without inflating, then read the combined stream
//!     let mut combined = CombineReader::new(vec![Cursor::new(first), Cursor::new(second)]);
//!     let mut merged = Vec::new();
//!     combined.read_to_end(&mut merged)?;
//!     combined.close()?;
//!
//!     // totals describe the whole concatenation, ready for a zip entry
//!     let totals = combined.totals()?;
//!     assert_eq!(totals.uncompressed_len, 10);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod crc;
pub mod error;
pub mod footer;
pub mod stream;
pub mod zip;

pub use codec::{Codec, DEFAULT_BUFFER_SIZE, FILE_EXTENSION};
pub use error::{Error, Result};
pub use footer::Footer;
pub use stream::{CombineReader, CombinedTotals, DeflateWriter, FooteredReader};
pub use zip::{EntryMode, ModalZipWriter, ZipEntry};
