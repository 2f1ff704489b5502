//! Low-level cursor primitives shared by both parse stages.
//!
//! Each function reads exactly the bytes it promises or fails. A short read
//! surfaces as [`Error::TruncatedInput`] carrying the offset the field started
//! at, not as a bare I/O error, so callers can see where a layout guess ran
//! off the end of the container.

use std::io::{self, Read, Seek, SeekFrom};

use crate::{Error, Result};

fn short_read(e: io::Error, offset: u64) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::TruncatedInput {
            offset,
            record: None,
        }
    } else {
        Error::Io(e)
    }
}

/// Total length of the stream. The cursor position is preserved.
pub(crate) fn stream_len<R: Seek>(r: &mut R) -> Result<u64> {
    let pos = r.stream_position()?;
    let len = r.seek(SeekFrom::End(0))?;
    if pos != len {
        r.seek(SeekFrom::Start(pos))?;
    }
    Ok(len)
}

/// Bytes between the cursor and the end of the stream.
pub(crate) fn remaining<R: Seek>(r: &mut R) -> Result<u64> {
    let pos = r.stream_position()?;
    Ok(stream_len(r)?.saturating_sub(pos))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut (impl Read + Seek)) -> Result<[u8; N]> {
    let offset = r.stream_position()?;
    let mut b = [0u8; N];
    r.read_exact(&mut b).map_err(|e| short_read(e, offset))?;
    Ok(b)
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read + Seek>(r: &mut R) -> Result<u32> {
    bytesa::<4>(r).map(u32::from_be_bytes)
}

/// Read exactly `len` bytes into a `Vec`.
///
/// The length is checked against the bytes left in the stream before
/// anything is allocated, so a misread length field fails fast instead of
/// requesting gigabytes.
pub(crate) fn bytesv<R: Read + Seek>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let offset = r.stream_position()?;
    if len as u64 > remaining(r)? {
        return Err(Error::TruncatedInput {
            offset,
            record: None,
        });
    }
    let mut b = vec![0u8; len];
    r.read_exact(&mut b).map_err(|e| short_read(e, offset))?;
    Ok(b)
}

/// Read everything from `offset` through the end of the stream.
pub(crate) fn tail<R: Read + Seek>(r: &mut R, offset: u64) -> Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut b = Vec::new();
    r.read_to_end(&mut b)?;
    Ok(b)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn be_u32_reads_network_order() {
        let mut c = Cursor::new(vec![0x00, 0x00, 0x27, 0x10]);
        assert_eq!(be_u32(&mut c).unwrap(), 10_000);
        assert_eq!(c.position(), 4);
    }

    #[test]
    fn short_field_reports_its_start_offset() {
        let mut c = Cursor::new(vec![1, 2, 3, 4, 5, 6]);
        c.set_position(4);
        assert!(matches!(
            be_u32(&mut c),
            Err(Error::TruncatedInput {
                offset: 4,
                record: None
            })
        ));
    }

    #[test]
    fn oversized_vec_is_refused_without_reading() {
        let mut c = Cursor::new(vec![0u8; 16]);
        c.set_position(8);
        assert!(matches!(
            bytesv(&mut c, 0x1027_0000),
            Err(Error::TruncatedInput { offset: 8, .. })
        ));
        assert_eq!(c.position(), 8);
        assert_eq!(bytesv(&mut c, 8).unwrap().len(), 8);
    }

    #[test]
    fn stream_len_keeps_position() {
        let mut c = Cursor::new(vec![0u8; 10]);
        c.set_position(3);
        assert_eq!(stream_len(&mut c).unwrap(), 10);
        assert_eq!(remaining(&mut c).unwrap(), 7);
        assert_eq!(c.position(), 3);
    }

    #[test]
    fn tail_past_end_is_empty() {
        let mut c = Cursor::new(vec![9u8; 4]);
        assert_eq!(tail(&mut c, 2).unwrap(), vec![9, 9]);
        assert!(tail(&mut c, 100).unwrap().is_empty());
    }
}
