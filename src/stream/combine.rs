//! Merging independently compressed parts without inflating them.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::debug;

use crate::crc;
use crate::error::{Error, Result};
use crate::footer::{Footer, CLOSE_MARKER, FOOTER_LEN};
use crate::stream::FooteredReader;

/// Lookahead buffer per part.
const PART_BUFFER_SIZE: usize = 8 * 1024;

/// Aggregate checksum and lengths of a combined stream.
///
/// Equal to what a single-pass compression of the full concatenated input
/// would have reported; `compressed_len` includes the shared 2-byte close
/// marker the combiner appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedTotals {
    pub crc32: u32,
    pub compressed_len: u64,
    pub uncompressed_len: u64,
}

/// Concatenates footer-bearing deflate parts into one inflatable stream.
///
/// Each source must be a raw blob produced by
/// [`DeflateWriter`](super::DeflateWriter), footer included. Reading yields
/// every part's compressed bytes with the 26-byte footer stripped, in order,
/// followed by a single synthetic close marker — a byte-exact, valid raw
/// deflate stream. After the stream is drained, [`close`](Self::close)
/// combines the per-part footers into [`CombinedTotals`] without ever having
/// inflated the data, which is what allows e.g. building a ZIP archive from
/// parts compressed in parallel.
pub struct CombineReader<R: Read> {
    parts: Vec<FooteredReader<R>>,
    index: usize,
    marker_pos: usize,
    totals: Option<CombinedTotals>,
}

impl<R: Read> CombineReader<R> {
    /// Combine raw footer-bearing sources, in order.
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = R>,
    {
        let parts = sources
            .into_iter()
            .map(|source| FooteredReader::assemble(source, PART_BUFFER_SIZE, FOOTER_LEN))
            .collect();
        Self {
            parts,
            index: 0,
            marker_pos: 0,
            totals: None,
        }
    }

    /// Close every part and, if all were fully drained, compute the totals.
    ///
    /// Every part is closed even when an earlier one fails; the first failure
    /// is returned. A part that was not drained to its footer leaves the
    /// totals unset rather than exposing partial results. Idempotent once the
    /// totals are available.
    pub fn close(&mut self) -> Result<()> {
        let mut first_err = None;
        for part in &mut self.parts {
            if let Err(e) = part.close() {
                first_err.get_or_insert(e);
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }
        if self.totals.is_some() {
            return Ok(());
        }

        let mut crc32: Option<u32> = None;
        let mut compressed_len: u64 = 0;
        let mut uncompressed_len: u64 = 0;
        for part in &self.parts {
            let bytes = match part.footer() {
                Ok(bytes) => bytes,
                // not fully read; withhold the aggregates entirely
                Err(_) => return Ok(()),
            };
            let footer = Footer::parse(&bytes)?;
            crc32 = Some(match crc32 {
                None => footer.crc32 as u32,
                Some(running) => crc::combine(
                    running,
                    footer.crc32 as u32,
                    footer.uncompressed_len as i64,
                ),
            });
            compressed_len += footer.compressed_len;
            uncompressed_len += footer.uncompressed_len;
        }

        if let Some(crc32) = crc32 {
            // Each footer reported its part's length without a close marker,
            // but this stream delivered one shared marker at the end.
            compressed_len += CLOSE_MARKER.len() as u64;
            debug!(
                "combined {} parts: {} bytes compressed, {} bytes uncompressed, crc32 {:08x}",
                self.parts.len(),
                compressed_len,
                uncompressed_len,
                crc32
            );
            self.totals = Some(CombinedTotals {
                crc32,
                compressed_len,
                uncompressed_len,
            });
        }
        Ok(())
    }

    /// The combined totals.
    ///
    /// Fails with a state error until every part has been read to completion
    /// and [`close`](Self::close) has run.
    pub fn totals(&self) -> Result<CombinedTotals> {
        self.totals.ok_or(Error::TotalsNotAvailable)
    }

    /// Combined CRC-32 of the uncompressed data across all parts.
    pub fn crc32(&self) -> Result<u32> {
        Ok(self.totals()?.crc32)
    }

    /// Total compressed length, shared close marker included.
    pub fn compressed_len(&self) -> Result<u64> {
        Ok(self.totals()?.compressed_len)
    }

    /// Total uncompressed length across all parts.
    pub fn uncompressed_len(&self) -> Result<u64> {
        Ok(self.totals()?.uncompressed_len)
    }
}

impl CombineReader<BufReader<File>> {
    /// Convenience constructor over blob files on disk, in the given order.
    pub fn open<P, I>(paths: I) -> Result<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        let mut sources = Vec::new();
        for path in paths {
            sources.push(BufReader::new(File::open(path)?));
        }
        Ok(Self::new(sources))
    }
}

impl<R: Read> Read for CombineReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.index < self.parts.len() {
            let n = self.parts[self.index].read(out)?;
            if n > 0 {
                return Ok(n);
            }
            self.index += 1;
        }
        // every part is drained; emit the shared close marker
        let remaining = &CLOSE_MARKER[self.marker_pos..];
        if remaining.is_empty() {
            return Ok(0);
        }
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        self.marker_pos += n;
        Ok(n)
    }
}
