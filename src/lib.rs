//! **xxxkit** - structural recovery for undocumented `.XXX` game archives.
//!
//! The archive starts with a name table whose length fields switch byte order
//! without warning, followed by compressed payload blocks whose offsets are
//! not recorded anywhere. xxxkit decodes the first and hunts for the second.
//!
//! # Stages
//! | Entry point | Purpose |
//! |-------------|---------|
//! | [`formats::xxx::read_name_table`] | Names, opaque flags, `next_offset`, import count |
//! | [`formats::payload::try_decompress_from`] | Decompress from a known candidate offset |
//! | [`formats::payload::locate_payload`] | Scan for candidate offsets and probe them |
//! | [`formats::fsb::find_bank_markers`] | Spot embedded FSB audio banks |
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use xxxkit::formats::payload::try_decompress_from;
//! use xxxkit::formats::xxx::read_name_table;
//!
//! # fn main() -> xxxkit::Result<()> {
//! let mut file = BufReader::new(File::open("SND_MOV_MK063_SPA.XXX")?);
//! let names = read_name_table(&mut file)?;
//! println!("{} names, next section at {:#x}", names.records.len(), names.next_offset);
//!
//! let payload = try_decompress_from(&mut file, 0x5f15)?;
//! println!("{} bytes, bank: {}", payload.len(), payload.has_bank_marker());
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod error;
pub mod formats;
pub(crate) mod utils;

pub use error::{Error, Result};
