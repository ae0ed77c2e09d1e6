//! The footer-appending raw deflate writer.

use std::io::{self, Write};

use crc32fast::Hasher;
use flate2::{Compress, Compression, FlushCompress, Status};
use log::debug;

use crate::codec::DEFAULT_BUFFER_SIZE;
use crate::error::Result;
use crate::footer;

/// Compresses bytes into a raw deflate stream that can later be concatenated
/// with others, then merged or dropped into a ZIP archive without inflating.
///
/// The writer owns a raw (headerless) deflate engine at best compression and
/// keeps a running CRC-32 of everything written. [`finish`](Self::finish)
/// sync-flushes the engine so the compressed bytes end on a byte boundary and
/// appends the 26-byte footer directly to the sink. The engine's own
/// stream-terminate operation is never used: the closing 2-byte block marker
/// lives in the footer, where a combiner can strip it per part and append a
/// single shared one (see [`super::CombineReader`]).
pub struct DeflateWriter<W: Write> {
    sink: W,
    deflate: Compress,
    crc: Hasher,
    out: Vec<u8>,
    bytes_read: u64,
    bytes_written: u64,
    finished: bool,
}

impl<W: Write> DeflateWriter<W> {
    pub fn new(sink: W) -> Self {
        Self::with_buffer_size(sink, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with an explicit staging buffer size.
    pub fn with_buffer_size(sink: W, buffer_size: usize) -> Self {
        Self {
            sink,
            deflate: Compress::new(Compression::best(), false),
            crc: Hasher::new(),
            out: Vec::with_capacity(buffer_size.max(1024)),
            bytes_read: 0,
            bytes_written: 0,
            finished: false,
        }
    }

    /// Run the engine until `input` is consumed and output has drained.
    fn drive(&mut self, mut input: &[u8], flush: FlushCompress) -> io::Result<()> {
        loop {
            let in_before = self.deflate.total_in();
            self.out.clear();
            let status = self
                .deflate
                .compress_vec(input, &mut self.out, flush)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let consumed = (self.deflate.total_in() - in_before) as usize;
            input = &input[consumed..];
            if !self.out.is_empty() {
                self.sink.write_all(&self.out)?;
            }
            // counters stay valid even after the engine is reset
            self.bytes_read = self.deflate.total_in();
            self.bytes_written = self.deflate.total_out();
            if matches!(status, Status::StreamEnd)
                || (input.is_empty() && self.out.len() < self.out.capacity())
            {
                return Ok(());
            }
        }
    }

    /// Flush pending compressed bytes and append the footer to the sink.
    ///
    /// Leaves the engine reset and reusable; the byte counters and CRC remain
    /// readable afterwards. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.drive(&[], FlushCompress::Sync)?;

        // The footer goes straight to the sink, not through the engine, or
        // the recorded lengths and CRC would include it.
        let crc = self.crc32();
        let bytes = footer::serialize(self.bytes_read, self.bytes_written, u64::from(crc));
        self.sink.write_all(&bytes)?;
        self.sink.flush()?;
        debug!(
            "finished deflate part: {} bytes in, {} bytes out, crc32 {:08x}",
            self.bytes_read, self.bytes_written, crc
        );

        self.deflate.reset();
        self.finished = true;
        Ok(())
    }

    /// CRC-32 of the uncompressed bytes written so far.
    pub fn crc32(&self) -> u32 {
        self.crc.clone().finalize()
    }

    /// Uncompressed bytes consumed, still available after finishing.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Compressed bytes produced (footer excluded), still available after
    /// finishing.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Consume the writer and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Write for DeflateWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "write after finish on deflate writer",
            ));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.crc.update(buf);
        self.drive(buf, FlushCompress::None)?;
        Ok(buf.len())
    }

    /// Sync-flush: compressed output lands on a byte boundary.
    fn flush(&mut self) -> io::Result<()> {
        self.drive(&[], FlushCompress::Sync)?;
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footer::{Footer, FOOTER_LEN, ISOLATED_FOOTER_LEN};
    use crate::stream::FooteredReader;
    use flate2::read::DeflateDecoder;
    use std::io::{Cursor, Read};

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut blob = Vec::new();
        let mut writer = DeflateWriter::new(&mut blob);
        writer.write_all(data).unwrap();
        writer.finish().unwrap();
        blob
    }

    fn inflate_isolated(blob: &[u8]) -> Vec<u8> {
        let footered = FooteredReader::new(Cursor::new(blob), ISOLATED_FOOTER_LEN).unwrap();
        let mut out = Vec::new();
        DeflateDecoder::new(footered).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn footer_records_lengths_and_crc() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let blob = compress(data);

        let footer = Footer::parse(&blob[blob.len() - FOOTER_LEN..]).unwrap();
        assert_eq!(footer.uncompressed_len, data.len() as u64);
        assert_eq!(footer.compressed_len, (blob.len() - FOOTER_LEN) as u64);
        assert_eq!(footer.crc32, u64::from(crc32fast::hash(data)));
    }

    #[test]
    fn blob_is_inflatable_in_isolation() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 7) as u8).collect();
        let blob = compress(&data);
        assert_eq!(inflate_isolated(&blob), data);
    }

    #[test]
    fn empty_input_still_inflates() {
        let blob = compress(b"");
        let footer = Footer::parse(&blob[blob.len() - FOOTER_LEN..]).unwrap();
        assert_eq!(footer.uncompressed_len, 0);
        assert!(footer.compressed_len > 0);
        assert!(inflate_isolated(&blob).is_empty());
    }

    #[test]
    fn counters_survive_finish() {
        let data = vec![42u8; 4096];
        let mut blob = Vec::new();
        let mut writer = DeflateWriter::new(&mut blob);
        writer.write_all(&data).unwrap();
        writer.finish().unwrap();

        assert_eq!(writer.bytes_read(), data.len() as u64);
        assert!(writer.bytes_written() > 0);
        assert_eq!(writer.crc32(), crc32fast::hash(&data));

        // finishing twice is a no-op
        let len = writer.sink.len();
        writer.finish().unwrap();
        assert_eq!(writer.sink.len(), len);
    }

    #[test]
    fn intermediate_flush_keeps_stream_valid() {
        let mut blob = Vec::new();
        let mut writer = DeflateWriter::new(&mut blob);
        writer.write_all(b"first half, ").unwrap();
        writer.flush().unwrap();
        writer.write_all(b"second half").unwrap();
        writer.finish().unwrap();
        assert_eq!(inflate_isolated(&blob), b"first half, second half");
    }

    #[test]
    fn write_after_finish_is_an_error() {
        let mut blob = Vec::new();
        let mut writer = DeflateWriter::new(&mut blob);
        writer.finish().unwrap();
        assert!(writer.write_all(b"late").is_err());
    }
}
