//! FSB (FMOD sound bank) signature detection.
//!
//! Audio banks travel inside `.XXX` payloads as opaque blobs. This module
//! only answers "is there something here that looks like a bank, and
//! where": the literal `FSB`, optionally followed by an ASCII version digit
//! (`FSB4`, `FSB5`). The bank's own headers are not decoded.

/// The three-byte audio-bank marker.
pub const BANK_MAGIC: &[u8; 3] = b"FSB";

/// One occurrence of [`BANK_MAGIC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankMarker {
    /// Byte offset of the `F` within the scanned buffer.
    pub offset: usize,
    /// Numeric version when the marker is followed by an ASCII digit.
    pub version: Option<u8>,
}

/// Whether `data` contains the bank marker anywhere.
pub fn contains_bank(data: &[u8]) -> bool {
    data.windows(BANK_MAGIC.len()).any(|w| w == BANK_MAGIC)
}

/// Whether `data` itself starts like a versioned bank (`FSB` + digit).
pub fn looks_like_bank(data: &[u8]) -> bool {
    data.starts_with(BANK_MAGIC) && data.get(3).is_some_and(u8::is_ascii_digit)
}

/// Every bank marker in `data`, in ascending offset order.
///
/// Overlapping hits are impossible for this magic, and markers inside a
/// bank's own name table are reported like any other.
pub fn find_bank_markers(data: &[u8]) -> Vec<BankMarker> {
    data.windows(BANK_MAGIC.len())
        .enumerate()
        .filter(|(_, w)| *w == BANK_MAGIC)
        .map(|(offset, _)| BankMarker {
            offset,
            version: data
                .get(offset + BANK_MAGIC.len())
                .filter(|b| b.is_ascii_digit())
                .map(|b| b - b'0'),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_versioned_and_bare_markers() {
        let data = b"..FSB5....FSB4xx FSBz";
        let markers = find_bank_markers(data);
        assert_eq!(
            markers,
            vec![
                BankMarker {
                    offset: 2,
                    version: Some(5)
                },
                BankMarker {
                    offset: 10,
                    version: Some(4)
                },
                BankMarker {
                    offset: 17,
                    version: None
                },
            ]
        );
    }

    #[test]
    fn marker_at_the_very_end_counts() {
        assert!(contains_bank(b"xxFSB"));
        assert_eq!(
            find_bank_markers(b"xxFSB"),
            vec![BankMarker {
                offset: 2,
                version: None
            }]
        );
    }

    #[test]
    fn short_and_empty_inputs() {
        assert!(!contains_bank(b""));
        assert!(!contains_bank(b"FS"));
        assert!(find_bank_markers(b"FS").is_empty());
    }

    #[test]
    fn bank_prefix_check() {
        assert!(looks_like_bank(b"FSB4\x01\x00"));
        assert!(!looks_like_bank(b"FSB"));
        assert!(!looks_like_bank(b"xFSB5"));
    }
}
