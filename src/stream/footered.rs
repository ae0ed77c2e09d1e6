//! A reader that hides a fixed-length trailing footer from its callers.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Default lookahead buffer size.
const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Wraps a byte source and withholds its trailing `footer_len` bytes.
///
/// Callers read the stream as if the footer did not exist; the reader keeps a
/// lookahead buffer of at least `footer_len` bytes beyond whatever is about to
/// be handed out, so the footer boundary is detected without knowing the total
/// stream length up front and without ever consuming caller-visible bytes.
/// After the stream is drained, [`close`](Self::close) captures the footer and
/// [`footer`](Self::footer) hands out a copy.
///
/// Exact for any mixture of read sizes, from single bytes to full buffers.
pub struct FooteredReader<R: Read> {
    inner: R,
    /// Lookahead window; `buf[start..]` is not yet delivered.
    buf: Vec<u8>,
    start: usize,
    footer_len: usize,
    chunk: usize,
    eof: bool,
    footer: Option<Vec<u8>>,
}

impl<R: Read> FooteredReader<R> {
    /// Wrap `inner`, hiding its trailing `footer_len` bytes.
    ///
    /// Fails with [`Error::FooterLength`] when `footer_len` is zero.
    pub fn new(inner: R, footer_len: usize) -> Result<Self> {
        Self::with_buffer_size(inner, DEFAULT_BUFFER_SIZE, footer_len)
    }

    /// Like [`new`](Self::new) with an explicit lookahead buffer size.
    pub fn with_buffer_size(inner: R, buffer_size: usize, footer_len: usize) -> Result<Self> {
        if footer_len == 0 {
            return Err(Error::FooterLength);
        }
        Ok(Self::assemble(inner, buffer_size, footer_len))
    }

    /// Internal constructor for callers passing a known non-zero length.
    pub(crate) fn assemble(inner: R, buffer_size: usize, footer_len: usize) -> Self {
        let chunk = buffer_size.max(footer_len).max(64);
        Self {
            inner,
            buf: Vec::with_capacity(chunk + footer_len),
            start: 0,
            footer_len,
            chunk,
            eof: false,
            footer: None,
        }
    }

    /// Bytes currently buffered ahead of the caller.
    fn buffered(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Buffered bytes available before the footer boundary, never negative.
    pub fn available(&self) -> usize {
        self.buffered().saturating_sub(self.footer_len)
    }

    /// Top up the lookahead buffer to `want` bytes or end of stream.
    fn fill(&mut self, want: usize) -> io::Result<()> {
        while self.buffered() < want && !self.eof {
            if self.start == self.buf.len() {
                self.buf.clear();
                self.start = 0;
            } else if self.start > self.chunk {
                self.buf.drain(..self.start);
                self.start = 0;
            }
            let old_len = self.buf.len();
            self.buf.resize(old_len + self.chunk, 0);
            let n = self.inner.read(&mut self.buf[old_len..])?;
            self.buf.truncate(old_len + n);
            if n == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }

    /// Capture the footer if the stream has been fully drained.
    ///
    /// Only when zero non-footer bytes remain does this consume exactly
    /// `footer_len` trailing bytes; if fewer remain at that point the stream
    /// was truncated and this fails. Closing before the stream is drained
    /// succeeds but leaves the footer uncaptured. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.footer.is_some() {
            return Ok(());
        }
        self.fill(self.footer_len + 1)?;
        let buffered = self.buffered();
        if buffered > self.footer_len {
            // not drained; the caller gave up early
            return Ok(());
        }
        if buffered < self.footer_len {
            return Err(Error::TruncatedFooter {
                expected: self.footer_len,
                actual: buffered,
            });
        }
        self.footer = Some(self.buf[self.start..self.start + self.footer_len].to_vec());
        self.start += self.footer_len;
        Ok(())
    }

    /// A copy of the captured footer bytes.
    ///
    /// Fails with [`Error::FooterNotCaptured`] unless the stream was read to
    /// completion and [`close`](Self::close) has run.
    pub fn footer(&self) -> Result<Vec<u8>> {
        self.footer.clone().ok_or(Error::FooterNotCaptured)
    }
}

impl<R: Read> Read for FooteredReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        // look ahead footer_len bytes past what this call could return
        self.fill(out.len() + self.footer_len)?;
        let available = self.available();
        if available == 0 {
            return Ok(0);
        }
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FOOTER: [u8; 4] = [9, 9, 9, 9];

    fn sample() -> Vec<u8> {
        let mut data = b"0123456789".to_vec();
        data.extend_from_slice(&FOOTER);
        data
    }

    #[test]
    fn zero_footer_length_is_rejected() {
        assert!(matches!(
            FooteredReader::new(Cursor::new(vec![1u8]), 0),
            Err(Error::FooterLength)
        ));
    }

    #[test]
    fn hides_footer_for_any_chunk_size() {
        let data = sample();
        for chunk in 1..=data.len() {
            let mut reader = FooteredReader::new(Cursor::new(data.clone()), FOOTER.len()).unwrap();
            let mut content = Vec::new();
            let mut piece = vec![0u8; chunk];
            loop {
                let n = reader.read(&mut piece).unwrap();
                if n == 0 {
                    break;
                }
                content.extend_from_slice(&piece[..n]);
            }
            assert_eq!(content, b"0123456789", "chunk size {chunk}");
            reader.close().unwrap();
            assert_eq!(reader.footer().unwrap(), FOOTER);
        }
    }

    #[test]
    fn works_with_tiny_lookahead_buffer() {
        let data = sample();
        let mut reader =
            FooteredReader::with_buffer_size(Cursor::new(data), 1, FOOTER.len()).unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"0123456789");
        reader.close().unwrap();
        assert_eq!(reader.footer().unwrap(), FOOTER);
    }

    #[test]
    fn footer_before_drain_is_a_state_error() {
        let mut reader = FooteredReader::new(Cursor::new(sample()), FOOTER.len()).unwrap();
        assert!(matches!(reader.footer(), Err(Error::FooterNotCaptured)));

        // closing without draining keeps the footer unavailable
        reader.close().unwrap();
        assert!(matches!(reader.footer(), Err(Error::FooterNotCaptured)));
    }

    #[test]
    fn short_stream_fails_on_close() {
        // stream shorter than the footer itself
        let mut reader = FooteredReader::new(Cursor::new(vec![1u8, 2]), FOOTER.len()).unwrap();
        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).unwrap();
        assert!(sink.is_empty());
        assert!(matches!(
            reader.close(),
            Err(Error::TruncatedFooter {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn available_never_counts_footer_bytes() {
        let mut reader = FooteredReader::new(Cursor::new(sample()), FOOTER.len()).unwrap();
        assert_eq!(reader.available(), 0);
        let mut byte = [0u8; 1];
        reader.read(&mut byte).unwrap();
        assert!(reader.available() <= 9);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn footer_is_a_defensive_copy() {
        let mut reader = FooteredReader::new(Cursor::new(sample()), FOOTER.len()).unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).unwrap();
        reader.close().unwrap();
        let mut copy = reader.footer().unwrap();
        copy[0] = 0;
        assert_eq!(reader.footer().unwrap(), FOOTER);
    }
}
