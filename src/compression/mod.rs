//! Decompression helpers for payload probing.
//!
//! The codec wrappers are gated behind the `compression` Cargo feature
//! (enabled by default). [`Codec`] and its signature sniffing are always
//! available, since recognising where a stream *might* start needs no codec.
//!
//! ## Submodules
//!
//! | Module | Algorithm | Typical use in xxxkit |
//! |--------|-----------|-----------------------|
//! | [`zlib`] | zlib / deflate | `.XXX` payload blocks |
//! | [`zstd`] | Zstandard | Secondary scan target for repacked archives |
//!
//! Both wrappers take a hard cap on decompressed output and return the
//! number of input bytes the stream actually occupied, so a successful probe
//! also tells the caller where the compressed block ends.

use std::fmt;

#[cfg(feature = "compression")]
pub mod zlib;

#[cfg(feature = "compression")]
pub mod zstd;

/// Zstandard frame magic (`0xFD2FB528` little-endian).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Stream formats the payload probe knows how to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// RFC 1950 zlib wrapper around a deflate stream.
    Zlib,
    /// Zstandard frame.
    Zstd,
}

impl Codec {
    /// Identify a compressed-stream header at the start of `bytes`.
    ///
    /// This is a plausibility check only. A zlib header is two bytes with a
    /// 1-in-31 checksum, so random data matches it now and then; the caller
    /// confirms by decompressing.
    pub fn sniff(bytes: &[u8]) -> Option<Codec> {
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Some(Codec::Zstd);
        }
        match bytes {
            [cmf, flg, ..] if is_zlib_header(*cmf, *flg) => Some(Codec::Zlib),
            _ => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Zlib => write!(f, "zlib"),
            Codec::Zstd => write!(f, "zstd"),
        }
    }
}

/// Deflate method, window of at most 32 KiB, valid FCHECK, no preset
/// dictionary.
fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8
        && cmf >> 4 <= 7
        && flg & 0x20 == 0
        && ((u16::from(cmf) << 8) | u16::from(flg)) % 31 == 0
}

/// Decompress one stream of `codec` from the start of `data`.
///
/// Returns the decompressed bytes and the number of input bytes consumed.
/// Trailing bytes after the end of the stream are ignored.
#[cfg(feature = "compression")]
pub fn decompress_limited(
    codec: Codec,
    data: &[u8],
    max_out: usize,
) -> crate::Result<(Vec<u8>, usize)> {
    match codec {
        Codec::Zlib => zlib::decompress_zlib_limited(data, max_out),
        Codec::Zstd => self::zstd::decompress_zstd_limited(data, max_out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_zlib_levels() {
        for flg in [0x01, 0x5E, 0x9C, 0xDA] {
            assert_eq!(Codec::sniff(&[0x78, flg, 0x00]), Some(Codec::Zlib));
        }
    }

    #[test]
    fn rejects_bad_zlib_headers() {
        // wrong FCHECK
        assert_eq!(Codec::sniff(&[0x78, 0x9D]), None);
        // method 15
        assert_eq!(Codec::sniff(&[0x7F, 0x00]), None);
        // preset dictionary bit set (0x78BB % 31 == 0)
        assert_eq!(Codec::sniff(&[0x78, 0xBB]), None);
        assert_eq!(Codec::sniff(&[0x78]), None);
    }

    #[test]
    fn sniffs_zstd_magic() {
        assert_eq!(
            Codec::sniff(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]),
            Some(Codec::Zstd)
        );
        assert_eq!(Codec::sniff(&[0x28, 0xB5, 0x2F]), None);
    }
}
