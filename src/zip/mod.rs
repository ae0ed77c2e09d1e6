//! ZIP archive assembly.
//!
//! This module writes standard ZIP files (PKZIP APPNOTE 6.3.x compatible,
//! with ZIP64 extensions) to any byte sink, with a twist suited to batch
//! pipelines: each entry's payload can either be deflated on the fly or be
//! raw deflate bytes produced elsewhere and copied verbatim.
//!
//! ## Architecture
//!
//! - [`structures`]: wire constants, the [`ZipEntry`] descriptor and DOS
//!   timestamp helpers
//! - [`writer`]: the [`ModalZipWriter`] state machine
//!
//! ## Layout of the produced archives
//!
//! 1. Per entry: local file header, payload, data descriptor (sizes and CRC
//!    are streamed, never seeked back)
//! 2. Central directory with ZIP64 extra fields where values overflow
//! 3. ZIP64 end record and locator when counts or offsets overflow, then the
//!    classic end record
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - Every entry is stored with the deflate method

mod structures;
mod writer;

pub use structures::{dos_date, dos_time, EntryMode, ZipEntry};
pub use writer::ModalZipWriter;
