//! The unified error type for the crate.

use thiserror::Error;

use crate::footer::{FOOTER_LEN, ISOLATED_FOOTER_LEN};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by parflate streams and writers.
///
/// I/O errors from underlying sources and sinks propagate unchanged; the
/// remaining variants are contract violations that must fail loudly rather
/// than leak zero or stale values into downstream archive metadata.
#[derive(Error, Debug)]
pub enum Error {
    /// A footered reader was constructed with a zero footer length.
    #[error("footer length must be greater than zero")]
    FooterLength,

    /// A footer byte blob had a length that is neither the full nor the
    /// isolated form.
    #[error("footer must be {FOOTER_LEN} or {ISOLATED_FOOTER_LEN} bytes, got {0}")]
    FooterSize(usize),

    /// The stream ended before a complete footer could be captured.
    #[error("expected {expected} footer bytes at end of stream, got {actual}")]
    TruncatedFooter { expected: usize, actual: usize },

    /// The footer was requested before the stream was drained and closed.
    #[error("footer is only available once the stream is read to completion and closed")]
    FooterNotCaptured,

    /// Combined totals were requested while some part was not fully read.
    #[error("combined totals are only available once every part is read to completion")]
    TotalsNotAvailable,

    /// `put_entry` was called while another entry was still open.
    #[error("zip entry is already open; close it before starting another")]
    EntryOpen,

    /// An entry operation was attempted with no entry open.
    #[error("no zip entry is open")]
    NoEntry,

    /// Two entries were added under the same name.
    #[error("duplicate zip entry name: {0}")]
    DuplicateEntry(String),

    /// An entry name exceeds the 16-bit length field of the ZIP format.
    #[error("zip entry name too long: {0} bytes")]
    NameTooLong(usize),

    /// A raw-mode entry reached `close_entry` without caller-supplied
    /// size, compressed size and CRC-32.
    #[error("raw zip entry {0} is missing size, compressed size or crc-32")]
    RawEntryIncomplete(String),

    /// The archive was already finalized.
    #[error("zip archive is already finished")]
    ArchiveFinished,

    /// The deflate engine reported an error.
    #[error("deflate failed: {0}")]
    Deflate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
