//! Library-wide error and result types.

use std::fmt;
use std::io;

use crate::compression::Codec;

/// Result alias used throughout xxxkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every variant that points into the container carries the absolute byte
/// offset involved, since the point of most failures is to tell the caller
/// where a structural guess stopped holding.
#[derive(Debug)]
pub enum Error {
    /// Fewer bytes remain than a field declares. `offset` is where the field
    /// starts; `record` is the name-table index being read, if any.
    TruncatedInput { offset: u64, record: Option<u32> },
    /// Name bytes are not ASCII.
    InvalidText { offset: u64, record: Option<u32> },
    /// A candidate region could not be decompressed.
    Decode {
        offset: u64,
        codec: Codec,
        detail: String,
    },
    /// A codec rejected its input. Raised by the raw wrappers in
    /// [`crate::compression`]; the payload probe turns it into [`Error::Decode`].
    CorruptStream { codec: Codec, detail: String },
    /// An offset or size field would read outside the valid region.
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl Error {
    /// Attach a name-table record index to a truncation or text error.
    pub(crate) fn at_record(self, index: u32) -> Self {
        match self {
            Error::TruncatedInput { offset, .. } => Error::TruncatedInput {
                offset,
                record: Some(index),
            },
            Error::InvalidText { offset, .. } => Error::InvalidText {
                offset,
                record: Some(index),
            },
            other => other,
        }
    }

    /// Attach the attempted candidate offset to a codec failure.
    pub(crate) fn at_offset(self, offset: u64) -> Self {
        match self {
            Error::CorruptStream { codec, detail } => Error::Decode {
                offset,
                codec,
                detail,
            },
            other => other,
        }
    }

    /// Whether this is a decompression failure, which callers are expected to
    /// survive by trying another offset.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::CorruptStream { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TruncatedInput {
                offset,
                record: Some(i),
            } => write!(f, "truncated input at {offset:#x} (name record {i})"),
            Error::TruncatedInput { offset, record: None } => {
                write!(f, "truncated input at {offset:#x}")
            }
            Error::InvalidText {
                offset,
                record: Some(i),
            } => write!(f, "name record {i} is not ASCII (text at {offset:#x})"),
            Error::InvalidText { offset, record: None } => {
                write!(f, "name text at {offset:#x} is not ASCII")
            }
            Error::Decode {
                offset,
                codec,
                detail,
            } => write!(f, "{codec} decode failed at {offset:#x}: {detail}"),
            Error::CorruptStream { codec, detail } => write!(f, "corrupt {codec} stream: {detail}"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
