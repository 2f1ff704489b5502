//! Payload probing - find and decompress the compressed blocks of an `.XXX`.
//!
//! No header field discovered so far declares where the payload section
//! starts. Two entry points cover the two ways of looking for it:
//!
//! * [`try_decompress_from`] takes a candidate offset (for example one
//!   observed in a hex editor) and decompresses everything from there to the
//!   end of the file as a single stream.
//! * [`locate_payload`] generates candidates itself. [`CandidateOffsets`]
//!   walks a buffer and yields every position that starts with a plausible
//!   stream header; the locator probes them in order and stops at the first
//!   one that decompresses.
//!
//! A successful probe reports the decompressed bytes, the number of input
//! bytes the stream occupied, and every `FSB` audio-bank marker found in the
//! output. A failed probe is an [`Error::Decode`] carrying the attempted
//! offset; it never aborts a scan.

#![cfg(feature = "compression")]

use std::io::{Read, Seek};

use log::{debug, trace};

use crate::compression::{Codec, decompress_limited};
use crate::formats::fsb::{BankMarker, find_bank_markers};
use crate::utils::tail;
use crate::{Error, Result};

/// Default cap on decompressed output for a single probe (256 MiB).
pub const DEFAULT_MAX_OUTPUT: usize = 256 * 1024 * 1024;

/// Knobs for payload probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Codecs to recognise while scanning.
    pub codecs: Vec<Codec>,
    /// Absolute offset the scan starts at. Pass the name table's
    /// `next_offset` to skip the part of the file already accounted for.
    pub start: u64,
    /// Stop after this many failed candidates. [`None`] scans to the end.
    pub max_attempts: Option<usize>,
    /// Hard cap on decompressed bytes per probe.
    pub max_output: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            codecs: vec![Codec::Zlib, Codec::Zstd],
            start: 0,
            max_attempts: None,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

/// A region that decompressed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressedPayload {
    /// Absolute offset the stream started at.
    pub offset: u64,
    pub codec: Codec,
    /// Input bytes occupied by the stream, trailer included.
    pub compressed_len: usize,
    pub data: Vec<u8>,
    /// Audio-bank markers, offsets relative to `data`.
    pub markers: Vec<BankMarker>,
}

impl DecompressedPayload {
    /// Decompressed length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the output contains at least one `FSB` marker.
    pub fn has_bank_marker(&self) -> bool {
        !self.markers.is_empty()
    }

    /// Absolute offset just past the compressed stream; the next block, if
    /// any, starts at or after it.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.compressed_len as u64
    }
}

/// Decompress everything from `offset` to end of file as one zlib stream.
pub fn try_decompress_from<R: Read + Seek>(r: &mut R, offset: u64) -> Result<DecompressedPayload> {
    try_decompress_with(r, offset, Codec::Zlib, DEFAULT_MAX_OUTPUT)
}

/// Decompress everything from `offset` to end of file as one `codec` stream.
///
/// Codec failures come back as [`Error::Decode`] with `offset` attached;
/// I/O failures while reading the region are returned as they are.
pub fn try_decompress_with<R: Read + Seek>(
    r: &mut R,
    offset: u64,
    codec: Codec,
    max_output: usize,
) -> Result<DecompressedPayload> {
    let region = tail(r, offset)?;
    probe(&region, offset, codec, max_output)
}

fn probe(region: &[u8], offset: u64, codec: Codec, max_output: usize) -> Result<DecompressedPayload> {
    let (data, compressed_len) =
        decompress_limited(codec, region, max_output).map_err(|e| e.at_offset(offset))?;
    let markers = find_bank_markers(&data);
    debug!(
        "{codec} stream at {offset:#x}: {compressed_len} -> {} bytes, {} bank markers",
        data.len(),
        markers.len()
    );
    Ok(DecompressedPayload {
        offset,
        codec,
        compressed_len,
        data,
        markers,
    })
}

/// A position that looks like the start of a compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute offset.
    pub offset: u64,
    pub codec: Codec,
}

/// Lazy producer of [`Candidate`]s over a byte buffer.
///
/// `base` is the absolute offset of `data[0]`, so yielded offsets can be
/// used against the original file directly.
#[derive(Debug, Clone)]
pub struct CandidateOffsets<'a> {
    data: &'a [u8],
    base: u64,
    pos: usize,
    codecs: &'a [Codec],
}

impl<'a> CandidateOffsets<'a> {
    pub fn new(data: &'a [u8], base: u64, codecs: &'a [Codec]) -> Self {
        Self {
            data,
            base,
            pos: 0,
            codecs,
        }
    }
}

impl Iterator for CandidateOffsets<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while self.pos < self.data.len() {
            let pos = self.pos;
            self.pos += 1;
            if let Some(codec) = Codec::sniff(&self.data[pos..])
                && self.codecs.contains(&codec)
            {
                return Some(Candidate {
                    offset: self.base + pos as u64,
                    codec,
                });
            }
        }
        None
    }
}

/// Outcome of a candidate scan.
#[derive(Debug)]
pub struct Scan {
    /// First candidate that decompressed, if any.
    pub found: Option<DecompressedPayload>,
    /// Decode errors for the candidates tried before it, in scan order.
    pub rejected: Vec<Error>,
}

/// Probe candidates in `data` (whose first byte sits at absolute `base`)
/// until one decompresses or the candidates or attempt budget run out.
pub fn locate_in(data: &[u8], base: u64, config: &ProbeConfig) -> Scan {
    let mut rejected = Vec::new();
    for candidate in CandidateOffsets::new(data, base, &config.codecs) {
        if config.max_attempts.is_some_and(|max| rejected.len() >= max) {
            debug!("giving up after {} candidates", rejected.len());
            break;
        }
        trace!("probing {} candidate at {:#x}", candidate.codec, candidate.offset);
        let region = &data[(candidate.offset - base) as usize..];
        match probe(region, candidate.offset, candidate.codec, config.max_output) {
            Ok(payload) => {
                return Scan {
                    found: Some(payload),
                    rejected,
                };
            }
            Err(e) => rejected.push(e),
        }
    }
    Scan {
        found: None,
        rejected,
    }
}

/// Read `r` from `config.start` to end of file and scan it for a payload.
pub fn locate_payload<R: Read + Seek>(r: &mut R, config: &ProbeConfig) -> Result<Scan> {
    let region = tail(r, config.start)?;
    Ok(locate_in(&region, config.start, config))
}

/// Probe repeatedly from `config.start`, collecting every payload that
/// decompresses. Each scan resumes just past the previous stream.
pub fn locate_all(data: &[u8], base: u64, config: &ProbeConfig) -> Vec<DecompressedPayload> {
    let mut found = Vec::new();
    let mut cursor = config.start.max(base);
    while let Some(rest) = data.get((cursor - base) as usize..) {
        match locate_in(rest, cursor, config).found {
            Some(payload) => {
                cursor = payload.end_offset();
                found.push(payload);
            }
            None => break,
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::best());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn bank_blob() -> Vec<u8> {
        let mut plain = b"FSB5".to_vec();
        plain.extend(std::iter::repeat_n(0u8, 512));
        plain
    }

    #[test]
    fn fsb_payload_at_given_offset() {
        let mut file = vec![0x11u8; 0x40];
        file.extend(zlib(&bank_blob()));

        let payload = try_decompress_from(&mut Cursor::new(file), 0x40).unwrap();
        assert_eq!(payload.offset, 0x40);
        assert_eq!(payload.len(), 516);
        assert!(payload.has_bank_marker());
        assert_eq!(payload.markers[0].offset, 0);
        assert_eq!(payload.markers[0].version, Some(5));
    }

    #[test]
    fn wrong_offset_is_decode_error_with_offset() {
        let mut file = vec![0x11u8; 0x40];
        file.extend(zlib(&bank_blob()));

        let err = try_decompress_from(&mut Cursor::new(file), 0x3F).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                offset: 0x3F,
                codec: Codec::Zlib,
                ..
            }
        ));
    }

    #[test]
    fn random_bytes_never_panic() {
        let mut rng = StdRng::seed_from_u64(0x5f15);
        for _ in 0..64 {
            let len = rng.gen_range(0..2048);
            let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
            let err = try_decompress_from(&mut Cursor::new(bytes), 0).unwrap_err();
            assert!(err.is_decode(), "{err}");
        }
    }

    #[test]
    fn offset_past_end_is_decode_error() {
        let err = try_decompress_from(&mut Cursor::new(vec![0u8; 8]), 100).unwrap_err();
        assert!(matches!(err, Error::Decode { offset: 100, .. }));
    }

    #[test]
    fn plain_payload_without_marker() {
        let file = zlib(b"just some uncompressed-looking text");
        let payload = try_decompress_from(&mut Cursor::new(file.clone()), 0).unwrap();
        assert!(!payload.has_bank_marker());
        assert_eq!(payload.compressed_len, file.len());
        assert_eq!(payload.end_offset(), file.len() as u64);
    }

    #[test]
    fn candidates_are_absolute_and_filtered_by_codec() {
        let data = [0x00, 0x78, 0x9C, 0x28, 0xB5, 0x2F, 0xFD, 0x78];
        let all: Vec<_> = CandidateOffsets::new(&data, 0x100, &[Codec::Zlib, Codec::Zstd]).collect();
        assert_eq!(
            all,
            vec![
                Candidate {
                    offset: 0x101,
                    codec: Codec::Zlib
                },
                Candidate {
                    offset: 0x103,
                    codec: Codec::Zstd
                },
            ]
        );
        let zstd_only: Vec<_> = CandidateOffsets::new(&data, 0, &[Codec::Zstd]).collect();
        assert_eq!(zstd_only.len(), 1);
        assert_eq!(zstd_only[0].offset, 3);
    }

    #[test]
    fn locates_stream_behind_decoy_headers() {
        // 78 9C decoys that don't decompress, then the real stream
        let mut file = vec![0u8; 0x20];
        file.extend_from_slice(&[0x78, 0x9C, 0xFF, 0xFF, 0x78, 0xDA, 0x00]);
        let stream_at = file.len() as u64;
        file.extend(zlib(&bank_blob()));
        file.extend_from_slice(&[0xAA; 16]);

        let config = ProbeConfig {
            start: 0x10,
            ..ProbeConfig::default()
        };
        let scan = locate_payload(&mut Cursor::new(file), &config).unwrap();
        let payload = scan.found.expect("stream not found");
        assert_eq!(payload.offset, stream_at);
        assert!(payload.has_bank_marker());
        assert!(scan.rejected.len() >= 2);
        assert!(scan.rejected.iter().all(Error::is_decode));
    }

    #[test]
    fn attempt_budget_stops_scan() {
        let mut file = vec![0x78, 0x9C, 0xFF, 0x78, 0x9C, 0xFF];
        file.extend(zlib(b"late"));
        let config = ProbeConfig {
            max_attempts: Some(1),
            ..ProbeConfig::default()
        };
        let scan = locate_in(&file, 0, &config);
        assert!(scan.found.is_none());
        assert_eq!(scan.rejected.len(), 1);
    }

    #[test]
    fn zstd_payload_is_found() {
        let mut file = vec![0x42u8; 9];
        file.extend(zstd::encode_all(&bank_blob()[..], 3).unwrap());
        let config = ProbeConfig {
            codecs: vec![Codec::Zstd],
            ..ProbeConfig::default()
        };
        let scan = locate_in(&file, 0, &config);
        let payload = scan.found.unwrap();
        assert_eq!(payload.codec, Codec::Zstd);
        assert_eq!(payload.offset, 9);
        assert_eq!(payload.data, bank_blob());
    }

    #[test]
    fn locate_all_walks_consecutive_blocks() {
        let mut file = vec![0u8; 4];
        file.extend(zlib(b"first block FSB4"));
        file.extend(zlib(b"second block"));
        let blocks = locate_all(&file, 0, &ProbeConfig::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].offset, 4);
        assert!(blocks[0].has_bank_marker());
        assert_eq!(blocks[1].offset, blocks[0].end_offset());
        assert_eq!(blocks[1].data, b"second block");
    }
}
