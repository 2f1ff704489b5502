//! Parsers for the `.XXX` container and what it carries.
//!
//! All parsers follow the same conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a [`std::fs::File`], a
//!   [`std::io::Cursor`] over a synthetic fixture, or anything else that
//!   implements both traits. Each stage seeks to the offsets it needs, so
//!   stages can run against the same reader in any order.
//! * **Errors carry offsets** - every structural failure reports where in
//!   the file it happened, and the name-table walk returns what it decoded
//!   before failing.
//! * **Compression is separate** - [`payload`] finds and decompresses
//!   blocks through [`crate::compression`]; [`fsb`] only recognises audio
//!   banks inside the result.
//!
//! ## Format overview
//!
//! | Module      | Format | Description |
//! |-------------|--------|-------------|
//! | [`xxx`]     | XXX    | Archive header and name table |
//! | [`payload`] | -      | Candidate-offset scanning and decompression probes |
//! | [`fsb`]     | FSB    | Audio-bank signature detection |

pub mod fsb;
#[cfg(feature = "compression")]
pub mod payload;
pub mod xxx;
