//! Factory and one-call helpers for the blob format.
//!
//! The surrounding pipeline registers a [`Codec`] under a short extension and
//! hands it a buffer size from its own configuration; the codec then produces
//! compressing writers and isolated-read inflating readers. The free functions
//! cover the common whole-stream cases.

use std::io::{self, Read, Write};

use flate2::read::DeflateDecoder;
use log::warn;

use crate::error::Result;
use crate::footer::ISOLATED_FOOTER_LEN;
use crate::stream::{CombineReader, DeflateWriter, FooteredReader};

/// Extension conventionally given to standalone blob files.
pub const FILE_EXTENSION: &str = ".d2";

/// Buffer size used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 102_768;

/// Stream factory with a configurable extension and buffer size.
#[derive(Debug, Clone)]
pub struct Codec {
    extension: String,
    buffer_size: usize,
}

impl Codec {
    pub fn new() -> Self {
        Self {
            extension: FILE_EXTENSION.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// A codec with an explicit buffer size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            ..Self::new()
        }
    }

    /// Build a codec from an optional configuration value.
    ///
    /// An absent or unparsable value falls back to
    /// [`DEFAULT_BUFFER_SIZE`]; a bad value is logged, never fatal.
    pub fn from_config(buffer_size: Option<&str>) -> Self {
        let buffer_size = match buffer_size {
            None => DEFAULT_BUFFER_SIZE,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!("invalid buffer size {raw:?}, using default {DEFAULT_BUFFER_SIZE}");
                    DEFAULT_BUFFER_SIZE
                }
            },
        };
        Self::with_buffer_size(buffer_size)
    }

    /// Override the registered file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// A compressing writer over `sink`.
    pub fn encoder<W: Write>(&self, sink: W) -> DeflateWriter<W> {
        DeflateWriter::with_buffer_size(sink, self.buffer_size)
    }

    /// An inflating reader over a single raw blob.
    ///
    /// Prepared for an isolated read: only the trailing 24 bytes are hidden,
    /// keeping the close marker so the blob inflates on its own. Not suitable
    /// for merging; use [`CombineReader`] for that.
    pub fn decoder<R: Read>(&self, source: R) -> DeflateDecoder<FooteredReader<R>> {
        let footered = FooteredReader::assemble(source, self.buffer_size, ISOLATED_FOOTER_LEN);
        DeflateDecoder::new(footered)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress all of `from` onto `to` as one footered blob.
///
/// Returns the number of uncompressed bytes consumed.
pub fn compress<R: Read, W: Write>(mut from: R, to: W) -> Result<u64> {
    let mut writer = DeflateWriter::new(to);
    let copied = io::copy(&mut from, &mut writer)?;
    writer.finish()?;
    Ok(copied)
}

/// Inflate a single raw blob from `from` onto `to`.
///
/// Returns the number of uncompressed bytes produced.
pub fn decompress<R: Read, W: Write>(from: R, mut to: W) -> Result<u64> {
    let mut reader = Codec::new().decoder(from);
    let copied = io::copy(&mut reader, &mut to)?;
    to.flush()?;
    Ok(copied)
}

/// Merge many raw blobs and inflate the combined stream onto `to`.
///
/// Returns the number of uncompressed bytes produced.
pub fn decompress_parts<R, W, I>(parts: I, mut to: W) -> Result<u64>
where
    R: Read,
    W: Write,
    I: IntoIterator<Item = R>,
{
    let mut combined = CombineReader::new(parts);
    let copied = {
        let mut inflater = DeflateDecoder::new(&mut combined);
        io::copy(&mut inflater, &mut to)?
    };
    // validates that every part carried an intact footer
    combined.close()?;
    to.flush()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn config_parsing_falls_back_on_garbage() {
        assert_eq!(Codec::from_config(None).buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(Codec::from_config(Some("4096")).buffer_size(), 4096);
        assert_eq!(Codec::from_config(Some(" 512 ")).buffer_size(), 512);
        assert_eq!(
            Codec::from_config(Some("not a number")).buffer_size(),
            DEFAULT_BUFFER_SIZE
        );
        assert_eq!(
            Codec::from_config(Some("0")).buffer_size(),
            DEFAULT_BUFFER_SIZE
        );
        assert_eq!(
            Codec::from_config(Some("-1")).buffer_size(),
            DEFAULT_BUFFER_SIZE
        );
    }

    #[test]
    fn extension_is_configurable() {
        let codec = Codec::new().with_extension(".part");
        assert_eq!(codec.extension(), ".part");
        assert_eq!(Codec::new().extension(), FILE_EXTENSION);
    }

    #[test]
    fn compress_then_decompress_round_trips() {
        let data: Vec<u8> = (0..40_000u32).map(|i| (i * 31 % 256) as u8).collect();

        let mut blob = Vec::new();
        let consumed = compress(Cursor::new(&data), &mut blob).unwrap();
        assert_eq!(consumed, data.len() as u64);

        let mut restored = Vec::new();
        let produced = decompress(Cursor::new(&blob), &mut restored).unwrap();
        assert_eq!(produced, data.len() as u64);
        assert_eq!(restored, data);
    }

    #[test]
    fn decompress_parts_merges_in_order() {
        let halves: [&[u8]; 2] = [b"ABCD", b"EFGHIJ"];
        let mut blobs = Vec::new();
        for half in halves {
            let mut blob = Vec::new();
            compress(Cursor::new(half), &mut blob).unwrap();
            blobs.push(blob);
        }

        let mut restored = Vec::new();
        decompress_parts(blobs.into_iter().map(Cursor::new), &mut restored).unwrap();
        assert_eq!(restored, b"ABCDEFGHIJ");
    }

    #[test]
    fn codec_encoder_decoder_pair_round_trips() {
        let codec = Codec::with_buffer_size(256);
        let mut blob = Vec::new();
        let mut encoder = codec.encoder(&mut blob);
        encoder.write_all(b"codec round trip").unwrap();
        encoder.finish().unwrap();

        let mut restored = Vec::new();
        codec
            .decoder(Cursor::new(&blob))
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, b"codec round trip");
    }
}
