//! Zstandard decompression (requires the `compression` feature).
//!
//! Stock `.XXX` archives only carry zlib blocks, but community-repacked
//! archives have been seen with Zstd frames in the same positions. The
//! payload scanner recognises the frame magic and hands candidates here.
//!
//! Only the first frame at the given position is decoded. The frame's
//! compressed size is read from its header up front so a successful probe
//! reports exactly where the block ends.

#![cfg(feature = "compression")]

use std::io::Read;

use crate::compression::Codec;
use crate::{Error, Result};

fn corrupt(detail: impl Into<String>) -> Error {
    Error::CorruptStream {
        codec: Codec::Zstd,
        detail: detail.into(),
    }
}

/// Decompress a complete Zstandard-compressed buffer.
///
/// Returns [`Error::CorruptStream`] on any decompression failure.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| corrupt(e.to_string()))
}

/// Decompress the single Zstd frame at the start of `data`, producing at
/// most `max_out` bytes.
///
/// Returns the decompressed bytes and the compressed size of the frame.
pub fn decompress_zstd_limited(data: &[u8], max_out: usize) -> Result<(Vec<u8>, usize)> {
    let frame_len = zstd::zstd_safe::find_frame_compressed_size(data)
        .map_err(|code| corrupt(zstd::zstd_safe::get_error_name(code)))?;

    let decoder = zstd::stream::read::Decoder::with_buffer(&data[..frame_len])
        .map_err(|e| corrupt(e.to_string()))?
        .single_frame();

    let mut out = Vec::new();
    decoder
        .take((max_out as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| corrupt(e.to_string()))?;

    if out.len() > max_out {
        return Err(corrupt(format!("output exceeds {max_out} bytes")));
    }
    Ok((out, frame_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_one_frame_and_ignores_trailing_bytes() {
        let plain = b"FSB5 inside a zstd frame".repeat(20);
        let packed = zstd::encode_all(&plain[..], 3).unwrap();

        let mut input = packed.clone();
        input.extend_from_slice(&[0xEE; 32]);

        let (out, consumed) = decompress_zstd_limited(&input, usize::MAX).unwrap();
        assert_eq!(out, plain);
        assert_eq!(consumed, packed.len());
        assert_eq!(decompress_zstd(&packed).unwrap(), plain);
    }

    #[test]
    fn garbage_is_corrupt_stream() {
        let err = decompress_zstd_limited(&[0x28, 0xB5, 0x2F, 0xFD, 0xFF, 0xFF], 1024).unwrap_err();
        assert!(matches!(err, Error::CorruptStream { codec: Codec::Zstd, .. }));
        assert!(decompress_zstd(b"not zstd").is_err());
    }

    #[test]
    fn output_cap_is_enforced() {
        let packed = zstd::encode_all(&[0u8; 64 * 1024][..], 1).unwrap();
        assert!(decompress_zstd_limited(&packed, 100).is_err());
    }
}
