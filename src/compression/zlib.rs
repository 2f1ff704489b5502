//! zlib decompression (requires the `compression` feature).
//!
//! `.XXX` payload blocks are plain RFC 1950 streams: a two-byte header, raw
//! deflate data, and an Adler-32 trailer. Nothing in the container records
//! where a block starts or how long it is, so the decoder here is driven
//! through [`flate2::Decompress`] directly rather than a `Read` adapter: it
//! must tell a stream that reached its end marker apart from one that merely
//! ran out of input, and it must report how many input bytes were consumed.

#![cfg(feature = "compression")]

use flate2::{Decompress, FlushDecompress, Status};

use crate::compression::Codec;
use crate::{Error, Result};

const INFLATE_BUF_SIZE: usize = 64 * 1024;

fn corrupt(detail: impl Into<String>) -> Error {
    Error::CorruptStream {
        codec: Codec::Zlib,
        detail: detail.into(),
    }
}

/// Decompress a complete zlib stream.
///
/// Returns [`Error::CorruptStream`] on any decompression failure, including a
/// stream that ends before its end-of-stream marker.
pub fn decompress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    decompress_zlib_limited(data, usize::MAX).map(|(out, _)| out)
}

/// Decompress the zlib stream at the start of `data`, producing at most
/// `max_out` bytes.
///
/// Returns the decompressed bytes and the number of input bytes the stream
/// occupied. Anything after the Adler-32 trailer is left untouched.
pub fn decompress_zlib_limited(data: &[u8], max_out: usize) -> Result<(Vec<u8>, usize)> {
    let mut de = Decompress::new(true);
    let mut buf = vec![0u8; INFLATE_BUF_SIZE];
    let mut out = Vec::new();
    let mut in_pos = 0usize;

    loop {
        let before_in = de.total_in();
        let before_out = de.total_out();

        let status = de
            .decompress(&data[in_pos..], &mut buf, FlushDecompress::None)
            .map_err(|e| corrupt(e.to_string()))?;

        let consumed = (de.total_in() - before_in) as usize;
        let produced = (de.total_out() - before_out) as usize;
        in_pos += consumed;

        if produced != 0 {
            if out.len() + produced > max_out {
                return Err(corrupt(format!("output exceeds {max_out} bytes")));
            }
            out.extend_from_slice(&buf[..produced]);
        }

        match status {
            Status::StreamEnd => return Ok((out, in_pos)),
            Status::Ok | Status::BufError => {
                if consumed == 0 && produced == 0 {
                    if in_pos >= data.len() {
                        return Err(corrupt("unexpected end of stream"));
                    }
                    return Err(corrupt("inflate stalled"));
                }
            }
        }
    }
}
