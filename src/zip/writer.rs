//! Streaming ZIP archive writer with per-entry raw or deflate payloads.

use std::collections::HashSet;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher;
use flate2::{Compress, Compression, FlushCompress, Status};
use log::{debug, warn};

use crate::error::{Error, Result};

use super::structures::*;

/// Staging buffer for the per-entry deflate engine.
const DEFLATE_BUFFER_SIZE: usize = 32 * 1024;

/// A ZIP writer that chooses, per entry, between deflating supplied bytes and
/// copying pre-deflated bytes verbatim.
///
/// The raw mode is what allows assembling an archive from payloads compressed
/// elsewhere — e.g. parts merged by a
/// [`CombineReader`](crate::stream::CombineReader) — without inflating and
/// re-deflating them; the caller declares the sizes and CRC and the writer
/// trusts them.
///
/// Entries follow a strict cycle: [`put_entry`](Self::put_entry), payload
/// bytes through [`Write`], [`close_entry`](Self::close_entry); then
/// [`close`](Self::close) once to emit the central directory and end records.
/// Every header field that can overflow 32 bits gets ZIP64 treatment: the
/// data descriptor switches to 8-byte sizes, central directory records grow a
/// ZIP64 extra field, and the end records gain the ZIP64 variants when the
/// entry count or directory offsets overflow.
///
/// The sink only needs [`Write`]; nothing is ever seeked, so sizes and CRCs
/// travel in data descriptors after each payload.
pub struct ModalZipWriter<W: Write> {
    sink: W,
    /// Bytes written to the sink so far; doubles as the next header offset.
    offset: u64,
    records: Vec<CentralRecord>,
    names: HashSet<String>,
    deflate: Compress,
    out: Vec<u8>,
    current: Option<OpenEntry>,
    finished: bool,
}

/// Finished-entry metadata destined for the central directory.
struct CentralRecord {
    name: String,
    size: u64,
    compressed_size: u64,
    crc32: u32,
    time: u16,
    date: u16,
    offset: u64,
}

/// State of the entry currently receiving payload bytes.
struct OpenEntry {
    entry: ZipEntry,
    mode: EntryMode,
    crc: Hasher,
    bytes_in: u64,
    bytes_out: u64,
    header_offset: u64,
}

impl<W: Write> ModalZipWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            offset: 0,
            records: Vec::new(),
            names: HashSet::new(),
            deflate: Compress::new(Compression::best(), false),
            out: Vec::with_capacity(DEFLATE_BUFFER_SIZE),
            current: None,
            finished: false,
        }
    }

    /// Begin a new entry.
    ///
    /// Writes the local file header (sizes deferred to the data descriptor)
    /// and arms the payload path for `mode`. Fails if the archive is
    /// finished, another entry is still open, or the name is a duplicate.
    pub fn put_entry(&mut self, entry: ZipEntry, mode: EntryMode) -> Result<()> {
        if self.finished {
            return Err(Error::ArchiveFinished);
        }
        if self.current.is_some() {
            return Err(Error::EntryOpen);
        }
        if entry.name.len() > u16::MAX as usize {
            return Err(Error::NameTooLong(entry.name.len()));
        }
        if !self.names.insert(entry.name.clone()) {
            return Err(Error::DuplicateEntry(entry.name.clone()));
        }

        let header_offset = self.offset;
        self.write_local_header(&entry)?;
        if mode == EntryMode::Deflate {
            self.deflate.reset();
        }
        self.current = Some(OpenEntry {
            entry,
            mode,
            crc: Hasher::new(),
            bytes_in: 0,
            bytes_out: 0,
            header_offset,
        });
        Ok(())
    }

    /// The entry currently open, for filling in raw-mode sizes and CRC after
    /// the payload has been copied.
    pub fn entry_mut(&mut self) -> Result<&mut ZipEntry> {
        match &mut self.current {
            Some(open) => Ok(&mut open.entry),
            None => Err(Error::NoEntry),
        }
    }

    /// Finish the open entry and write its data descriptor.
    ///
    /// Deflate-mode entries terminate their deflate stream and commit the
    /// internally computed sizes and CRC. Raw-mode entries commit the
    /// caller-declared values; missing ones are a state error (the entry
    /// stays open so they can still be supplied via
    /// [`entry_mut`](Self::entry_mut)). A declared compressed size that
    /// disagrees with the bytes actually copied is the caller's mistake and
    /// is only logged.
    pub fn close_entry(&mut self) -> Result<()> {
        let mode = match &self.current {
            Some(open) => open.mode,
            None => return Err(Error::NoEntry),
        };

        if mode == EntryMode::Raw {
            let Some(open) = self.current.as_ref() else {
                return Err(Error::NoEntry);
            };
            if open.entry.size.is_none()
                || open.entry.compressed_size.is_none()
                || open.entry.crc32.is_none()
            {
                return Err(Error::RawEntryIncomplete(open.entry.name.clone()));
            }
        } else {
            // each entry is its own complete deflate stream
            loop {
                let status = self.drive_deflate(&[], FlushCompress::Finish)?;
                if matches!(status, Status::StreamEnd) {
                    break;
                }
            }
        }

        let Some(open) = self.current.take() else {
            return Err(Error::NoEntry);
        };
        let (size, compressed_size, crc32) = match open.mode {
            EntryMode::Deflate => (open.bytes_in, open.bytes_out, open.crc.finalize()),
            EntryMode::Raw => {
                // checked above
                let size = open.entry.size.unwrap_or(0);
                let compressed_size = open.entry.compressed_size.unwrap_or(0);
                let crc32 = open.entry.crc32.unwrap_or(0);
                if compressed_size != open.bytes_out {
                    warn!(
                        "raw entry {}: declared compressed size {} but {} bytes were copied",
                        open.entry.name, compressed_size, open.bytes_out
                    );
                }
                (size, compressed_size, crc32)
            }
        };

        self.write_data_descriptor(crc32, compressed_size, size)?;
        debug!(
            "closed zip entry {}: {} -> {} bytes, crc32 {:08x}",
            open.entry.name, size, compressed_size, crc32
        );
        self.records.push(CentralRecord {
            name: open.entry.name,
            size,
            compressed_size,
            crc32,
            time: open.entry.last_mod_time,
            date: open.entry.last_mod_date,
            offset: open.header_offset,
        });
        Ok(())
    }

    /// Finalize the archive: central directory, ZIP64 records when needed,
    /// end record. Closes a still-open entry first. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.current.is_some() {
            self.close_entry()?;
        }

        let cd_offset = self.offset;
        let records = std::mem::take(&mut self.records);
        for record in &records {
            self.write_central_header(record)?;
        }
        let cd_size = self.offset - cd_offset;
        let count = records.len() as u64;

        if count >= ZIP64_MAGIC_COUNT || cd_size >= ZIP64_MAGIC || cd_offset >= ZIP64_MAGIC {
            self.write_zip64_end(count, cd_size, cd_offset)?;
        }
        self.write_end(count, cd_size, cd_offset)?;
        self.sink.flush()?;
        self.finished = true;
        debug!(
            "zip archive finished: {} entries, central directory {} bytes at offset {}",
            count, cd_size, cd_offset
        );
        Ok(())
    }

    /// Consume the writer and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Run the entry deflate engine, accounting payload bytes to the open
    /// entry.
    fn drive_deflate(&mut self, mut input: &[u8], flush: FlushCompress) -> io::Result<Status> {
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
                self.offset += self.out.len() as u64;
                if let Some(open) = self.current.as_mut() {
                    open.bytes_out += self.out.len() as u64;
                }
            }
            if matches!(status, Status::StreamEnd)
                || (input.is_empty() && self.out.len() < self.out.capacity())
            {
                return Ok(status);
            }
        }
    }

    fn write_local_header(&mut self, entry: &ZipEntry) -> io::Result<()> {
        let name = entry.name.as_bytes();
        let mut header = Vec::with_capacity(LFH_SIZE + name.len());
        header.write_all(LFH_SIGNATURE)?;
        header.write_u16::<LittleEndian>(VERSION_DEFLATED)?;
        header.write_u16::<LittleEndian>(FLAG_DATA_DESCRIPTOR | FLAG_UTF8)?;
        header.write_u16::<LittleEndian>(METHOD_DEFLATED)?;
        header.write_u16::<LittleEndian>(entry.last_mod_time)?;
        header.write_u16::<LittleEndian>(entry.last_mod_date)?;
        header.write_u32::<LittleEndian>(0)?; // crc: in the data descriptor
        header.write_u32::<LittleEndian>(0)?; // compressed size: likewise
        header.write_u32::<LittleEndian>(0)?; // uncompressed size: likewise
        header.write_u16::<LittleEndian>(name.len() as u16)?;
        header.write_u16::<LittleEndian>(0)?; // extra field length
        header.write_all(name)?;
        self.emit(&header)
    }

    fn write_data_descriptor(&mut self, crc32: u32, compressed_size: u64, size: u64) -> io::Result<()> {
        let mut desc = Vec::with_capacity(24);
        desc.write_all(DATA_DESCRIPTOR_SIGNATURE)?;
        desc.write_u32::<LittleEndian>(crc32)?;
        if compressed_size >= ZIP64_MAGIC || size >= ZIP64_MAGIC {
            desc.write_u64::<LittleEndian>(compressed_size)?;
            desc.write_u64::<LittleEndian>(size)?;
        } else {
            desc.write_u32::<LittleEndian>(compressed_size as u32)?;
            desc.write_u32::<LittleEndian>(size as u32)?;
        }
        self.emit(&desc)
    }

    fn write_central_header(&mut self, record: &CentralRecord) -> io::Result<()> {
        let name = record.name.as_bytes();
        let extra = zip64_extra(record.size, record.compressed_size, record.offset);
        let version_needed = if extra.is_empty() {
            VERSION_DEFLATED
        } else {
            VERSION_ZIP64
        };

        let mut header = Vec::with_capacity(CDFH_SIZE + name.len() + extra.len());
        header.write_all(CDFH_SIGNATURE)?;
        header.write_u16::<LittleEndian>(VERSION_ZIP64)?; // version made by
        header.write_u16::<LittleEndian>(version_needed)?;
        header.write_u16::<LittleEndian>(FLAG_DATA_DESCRIPTOR | FLAG_UTF8)?;
        header.write_u16::<LittleEndian>(METHOD_DEFLATED)?;
        header.write_u16::<LittleEndian>(record.time)?;
        header.write_u16::<LittleEndian>(record.date)?;
        header.write_u32::<LittleEndian>(record.crc32)?;
        header.write_u32::<LittleEndian>(clamp32(record.compressed_size))?;
        header.write_u32::<LittleEndian>(clamp32(record.size))?;
        header.write_u16::<LittleEndian>(name.len() as u16)?;
        header.write_u16::<LittleEndian>(extra.len() as u16)?;
        header.write_u16::<LittleEndian>(0)?; // comment length
        header.write_u16::<LittleEndian>(0)?; // disk number start
        header.write_u16::<LittleEndian>(0)?; // internal attributes
        header.write_u32::<LittleEndian>(0)?; // external attributes
        header.write_u32::<LittleEndian>(clamp32(record.offset))?;
        header.write_all(name)?;
        header.write_all(&extra)?;
        self.emit(&header)
    }

    fn write_zip64_end(&mut self, count: u64, cd_size: u64, cd_offset: u64) -> io::Result<()> {
        let zip64_offset = self.offset;
        let mut rec = Vec::with_capacity(ZIP64_EOCD_SIZE + ZIP64_LOCATOR_SIZE);
        rec.write_all(ZIP64_EOCD_SIGNATURE)?;
        rec.write_u64::<LittleEndian>((ZIP64_EOCD_SIZE - 12) as u64)?; // remaining record size
        rec.write_u16::<LittleEndian>(VERSION_ZIP64)?; // version made by
        rec.write_u16::<LittleEndian>(VERSION_ZIP64)?; // version needed
        rec.write_u32::<LittleEndian>(0)?; // this disk
        rec.write_u32::<LittleEndian>(0)?; // disk with central directory
        rec.write_u64::<LittleEndian>(count)?; // entries on this disk
        rec.write_u64::<LittleEndian>(count)?; // entries total
        rec.write_u64::<LittleEndian>(cd_size)?;
        rec.write_u64::<LittleEndian>(cd_offset)?;

        rec.write_all(ZIP64_LOCATOR_SIGNATURE)?;
        rec.write_u32::<LittleEndian>(0)?; // disk with the ZIP64 end record
        rec.write_u64::<LittleEndian>(zip64_offset)?;
        rec.write_u32::<LittleEndian>(1)?; // total disks
        self.emit(&rec)
    }

    fn write_end(&mut self, count: u64, cd_size: u64, cd_offset: u64) -> io::Result<()> {
        let count16 = count.min(ZIP64_MAGIC_COUNT) as u16;
        let mut rec = Vec::with_capacity(EOCD_SIZE);
        rec.write_all(EOCD_SIGNATURE)?;
        rec.write_u16::<LittleEndian>(0)?; // this disk
        rec.write_u16::<LittleEndian>(0)?; // disk with central directory
        rec.write_u16::<LittleEndian>(count16)?;
        rec.write_u16::<LittleEndian>(count16)?;
        rec.write_u32::<LittleEndian>(clamp32(cd_size))?;
        rec.write_u32::<LittleEndian>(clamp32(cd_offset))?;
        rec.write_u16::<LittleEndian>(0)?; // comment length
        self.emit(&rec)
    }
}

impl<W: Write> Write for ModalZipWriter<W> {
    /// Payload bytes for the open entry: deflated or copied verbatim
    /// depending on the entry's mode.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mode = match &self.current {
            Some(open) => open.mode,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "no open zip entry to write to",
                ))
            }
        };
        if buf.is_empty() {
            return Ok(0);
        }
        match mode {
            EntryMode::Raw => {
                self.sink.write_all(buf)?;
                self.offset += buf.len() as u64;
                if let Some(open) = self.current.as_mut() {
                    open.bytes_out += buf.len() as u64;
                }
            }
            EntryMode::Deflate => {
                if let Some(open) = self.current.as_mut() {
                    open.crc.update(buf);
                    open.bytes_in += buf.len() as u64;
                }
                self.drive_deflate(buf, FlushCompress::None)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
