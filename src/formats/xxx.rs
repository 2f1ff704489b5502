//! XXX - PS3 game archive holding a name table and compressed payloads.
//!
//! Nothing about this container is documented. The layout below is what has
//! been recovered so far; fields marked `?` are known to exist but are not
//! understood.
//!
//! ## Layout
//! ```text
//! [0x00] PackageTag  9E 2A 83 C1   (u32 BE)
//! [0x04] ?                         (4 bytes)
//! [0x08] HeaderSize                (u32 BE) - header blob / data blob split
//! [0x0C] ?                         (8 bytes)
//! [0x14] NameCount                 (u32 BE)
//! [0x18] NameTable                 (NameCount records)
//! [next] ImportCount               (u32 BE)
//! [...]  ?                         compressed payload blocks somewhere after
//! ```
//!
//! ## Name Record
//! ```text
//! [0x00] Length  (u32, BE - or LE, see below)
//! [0x04] Text    (Length bytes, ASCII, NUL padded)
//! [...]  Flags   (4 bytes, opaque)
//! ```
//!
//! ## Length byte order
//! Most records store their length big-endian, but some samples contain
//! records whose length only makes sense little-endian. There is no flag
//! known to select between the two. The reader applies a plausibility
//! heuristic instead: the big-endian reading is used unless a
//! [`LengthHeuristic`] rejects it, in which case the *same* four bytes are
//! reinterpreted little-endian. The field is consumed exactly once either
//! way. The default heuristic ([`MaxLength`]) rejects anything above 1000
//! bytes; it would misfire on a genuine name of 1000+ bytes.
//!
//! The resolved byte order is kept on every record ([`NameLength`]) so that
//! a different discriminant can be tested against real files later.

use std::io::{Read, Seek, SeekFrom, Take};
use std::ops::Index;
use std::{fmt, str};

use log::{debug, trace, warn};

use crate::formats::fsb::{BankMarker, find_bank_markers};
use crate::utils::{be_u32, bytesa, bytesv, remaining, stream_len, tail};
use crate::{Error, Result};

/// Big-endian value of the four bytes at offset 0.
pub const PACKAGE_TAG: u32 = 0x9E2A_83C1;
/// Offset of the header-size field.
pub const HEADER_SIZE_OFFSET: u64 = 0x08;
/// Offset of the name count.
pub const NAME_COUNT_OFFSET: u64 = 0x14;
/// Offset of the first name record.
pub const NAME_TABLE_OFFSET: u64 = 0x18;
/// Default upper bound for a believable big-endian name length.
pub const DEFAULT_MAX_NAME_LEN: u32 = 1000;

/// Decides whether a big-endian length reading is believable.
///
/// Implemented by [`MaxLength`] and by any `Fn(u32) -> bool`.
pub trait LengthHeuristic {
    fn is_plausible(&self, len: u32) -> bool;
}

/// Accept big-endian lengths up to and including the wrapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxLength(pub u32);

impl Default for MaxLength {
    fn default() -> Self {
        MaxLength(DEFAULT_MAX_NAME_LEN)
    }
}

impl LengthHeuristic for MaxLength {
    fn is_plausible(&self, len: u32) -> bool {
        len <= self.0
    }
}

impl<F: Fn(u32) -> bool> LengthHeuristic for F {
    fn is_plausible(&self, len: u32) -> bool {
        self(len)
    }
}

/// A name length together with the byte order it was decoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameLength {
    BigEndian(u32),
    LittleEndian(u32),
}

impl NameLength {
    /// Interpret a raw length field, falling back to little-endian when the
    /// big-endian reading is rejected by `heuristic`.
    pub fn resolve<H: LengthHeuristic + ?Sized>(raw: [u8; 4], heuristic: &H) -> Self {
        let be = u32::from_be_bytes(raw);
        if heuristic.is_plausible(be) {
            NameLength::BigEndian(be)
        } else {
            NameLength::LittleEndian(u32::from_le_bytes(raw))
        }
    }

    /// The decoded length.
    pub fn value(self) -> u32 {
        match self {
            NameLength::BigEndian(v) | NameLength::LittleEndian(v) => v,
        }
    }

    /// Whether the little-endian fallback was taken.
    pub fn is_fallback(self) -> bool {
        matches!(self, NameLength::LittleEndian(_))
    }

    /// The field's bytes as they appear in the file.
    pub fn to_raw(self) -> [u8; 4] {
        match self {
            NameLength::BigEndian(v) => v.to_be_bytes(),
            NameLength::LittleEndian(v) => v.to_le_bytes(),
        }
    }
}

/// One entry of the name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    /// Absolute offset of the record's length field.
    pub offset: u64,
    pub length: NameLength,
    /// Name text with trailing NULs removed.
    pub text: String,
    /// Four bytes of unknown meaning following the text.
    pub flags: [u8; 4],
}

impl NameRecord {
    fn read<R, H>(r: &mut R, heuristic: &H) -> Result<Self>
    where
        R: Read + Seek,
        H: LengthHeuristic + ?Sized,
    {
        let offset = r.stream_position()?;
        let raw = bytesa::<4>(r)?;
        let length = NameLength::resolve(raw, heuristic);
        if length.is_fallback() {
            warn!(
                "name length at {offset:#x}: big-endian {} rejected, using little-endian {}",
                u32::from_be_bytes(raw),
                length.value()
            );
        }

        let text_offset = offset + 4;
        let bytes = bytesv(r, length.value() as usize)?;
        if !bytes.is_ascii() {
            return Err(Error::InvalidText {
                offset: text_offset,
                record: None,
            });
        }
        let text = str::from_utf8(&bytes)
            .map_err(|_| Error::InvalidText {
                offset: text_offset,
                record: None,
            })?
            .trim_end_matches('\0')
            .to_owned();

        let flags = bytesa::<4>(r)?;

        Ok(Self {
            offset,
            length,
            text,
            flags,
        })
    }

    /// Flags rendered as lowercase hex, in file order.
    pub fn flags_hex(&self) -> String {
        hex::encode(self.flags)
    }

    /// Bytes this record occupies in the table.
    pub fn encoded_len(&self) -> u64 {
        4 + u64::from(self.length.value()) + 4
    }
}

/// Result of walking the name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTableScan {
    /// Records in table order.
    pub records: Vec<NameRecord>,
    /// Offset immediately after the last record's flags.
    pub next_offset: u64,
    /// Big-endian `u32` found at `next_offset`; [`None`] if fewer than four
    /// bytes remain there.
    pub import_count: Option<u32>,
}

impl NameTableScan {
    /// Iterate over the name strings.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.text.as_str())
    }

    /// Find a record by name. Returns [`None`] if not found.
    pub fn get_by_name(&self, name: &str) -> Option<&NameRecord> {
        self.records.iter().find(|r| r.text == name)
    }

    /// Number of records decoded through the little-endian fallback.
    pub fn fallback_count(&self) -> usize {
        self.records.iter().filter(|r| r.length.is_fallback()).count()
    }
}

impl Index<&str> for NameTableScan {
    type Output = NameRecord;

    /// Index by name.
    ///
    /// # Panics
    /// Panics if the name does not exist in the table.
    fn index(&self, index: &str) -> &Self::Output {
        self.get_by_name(index)
            .unwrap_or_else(|| panic!("no name '{index}' in table"))
    }
}

/// A failed name-table walk.
///
/// The records decoded before the failure are still valid and are handed
/// back in `parsed`.
#[derive(Debug)]
pub struct NameTableError {
    pub parsed: Vec<NameRecord>,
    pub error: Error,
}

impl fmt::Display for NameTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name table walk stopped after {} records: {}",
            self.parsed.len(),
            self.error
        )
    }
}

impl std::error::Error for NameTableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<NameTableError> for Error {
    fn from(e: NameTableError) -> Self {
        e.error
    }
}

/// Walk the name table with the default [`MaxLength`] heuristic.
pub fn read_name_table<R: Read + Seek>(
    r: &mut R,
) -> std::result::Result<NameTableScan, NameTableError> {
    read_name_table_with(r, &MaxLength::default())
}

/// Walk the name table, deciding each length's byte order with `heuristic`.
///
/// Seeks to [`NAME_COUNT_OFFSET`] first; the reader's prior position does
/// not matter.
pub fn read_name_table_with<R, H>(
    r: &mut R,
    heuristic: &H,
) -> std::result::Result<NameTableScan, NameTableError>
where
    R: Read + Seek,
    H: LengthHeuristic + ?Sized,
{
    let mut records = Vec::new();
    match walk_table(r, heuristic, &mut records) {
        Ok((next_offset, import_count)) => Ok(NameTableScan {
            records,
            next_offset,
            import_count,
        }),
        Err(error) => Err(NameTableError {
            parsed: records,
            error,
        }),
    }
}

fn walk_table<R, H>(
    r: &mut R,
    heuristic: &H,
    records: &mut Vec<NameRecord>,
) -> Result<(u64, Option<u32>)>
where
    R: Read + Seek,
    H: LengthHeuristic + ?Sized,
{
    r.seek(SeekFrom::Start(NAME_COUNT_OFFSET))?;
    let count = be_u32(r)?;
    debug_assert_eq!(r.stream_position()?, NAME_TABLE_OFFSET);
    debug!("name table: {count} records at {NAME_TABLE_OFFSET:#x}");

    // Every record is at least 8 bytes; don't trust `count` for the
    // allocation.
    let room = remaining(r)? / 8;
    records.reserve(u64::from(count).min(room) as usize);

    for index in 0..count {
        let record = NameRecord::read(r, heuristic).map_err(|e| e.at_record(index))?;
        trace!(
            "name {index} at {:#x}: {:?} (flags {})",
            record.offset,
            record.text,
            record.flags_hex()
        );
        records.push(record);
    }

    let next_offset = r.stream_position()?;
    let import_count = if remaining(r)? >= 4 {
        Some(be_u32(r)?)
    } else {
        None
    };
    debug!("name table ends at {next_offset:#x}, import count {import_count:?}");
    Ok((next_offset, import_count))
}

/// Fixed-position header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XxxHeader {
    /// Value at offset 0; [`PACKAGE_TAG`] in every known sample.
    pub tag: u32,
    /// Size of the leading header blob. Payload data follows it.
    pub header_size: u32,
    pub name_count: u32,
}

impl XxxHeader {
    /// Read the fixed header fields from `r`.
    ///
    /// A wrong tag is logged, not rejected: files with a mangled tag still
    /// tend to have a readable name table.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        r.seek(SeekFrom::Start(0))?;
        let tag = be_u32(r)?;
        r.seek(SeekFrom::Start(HEADER_SIZE_OFFSET))?;
        let header_size = be_u32(r)?;
        r.seek(SeekFrom::Start(NAME_COUNT_OFFSET))?;
        let name_count = be_u32(r)?;

        if tag != PACKAGE_TAG {
            warn!("unexpected package tag {tag:#010x} (expected {PACKAGE_TAG:#010x})");
        }
        Ok(Self {
            tag,
            header_size,
            name_count,
        })
    }

    /// Whether offset 0 holds the expected package tag.
    pub fn has_package_tag(&self) -> bool {
        self.tag == PACKAGE_TAG
    }
}

/// Streaming reader wrapper around an `.XXX` archive.
///
/// Owns the underlying reader and provides bounded access to the header and
/// data blobs via [`Take<&mut R>`].
pub struct XxxReader<R> {
    inner: R,
    len: u64,
    /// Fixed header fields.
    pub header: XxxHeader,
    /// Decoded name table.
    pub names: NameTableScan,
}

impl<R: Read + Seek> XxxReader<R> {
    /// Parse header and name table with the default heuristic and wrap the
    /// provided reader.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_heuristic(reader, &MaxLength::default())
    }

    /// Parse header and name table using `heuristic` for length byte order.
    pub fn with_heuristic<H: LengthHeuristic + ?Sized>(mut reader: R, heuristic: &H) -> Result<Self> {
        let header = XxxHeader::parse(&mut reader)?;
        let names = read_name_table_with(&mut reader, heuristic)?;
        let len = stream_len(&mut reader)?;
        Ok(Self {
            inner: reader,
            len,
            header,
            names,
        })
    }

    /// Total container length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the container is empty. Always false for a parsed archive.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The header blob: bytes `0..header_size`.
    ///
    /// Returns [`Error::InvalidRange`] if the declared size exceeds the file.
    pub fn header_region(&mut self) -> Result<Take<&mut R>> {
        let size = self.declared_header_size()?;
        self.inner.seek(SeekFrom::Start(0))?;
        Ok(self.inner.by_ref().take(size))
    }

    /// The data blob: bytes `header_size..len`.
    pub fn data_region(&mut self) -> Result<Take<&mut R>> {
        let size = self.declared_header_size()?;
        self.inner.seek(SeekFrom::Start(size))?;
        Ok(self.inner.by_ref().take(self.len - size))
    }

    /// Scan the raw (still compressed) container for bank markers.
    ///
    /// Marker offsets are absolute. Uncompressed banks show up here directly;
    /// compressed ones only after probing with [`crate::formats::payload`].
    pub fn raw_bank_markers(&mut self) -> Result<Vec<BankMarker>> {
        let bytes = tail(&mut self.inner, 0)?;
        Ok(find_bank_markers(&bytes))
    }

    /// Borrow the underlying reader, e.g. to probe payload offsets.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn declared_header_size(&self) -> Result<u64> {
        let size = u64::from(self.header.header_size);
        if size > self.len {
            return Err(Error::InvalidRange);
        }
        Ok(size)
    }
}
