use std::env;
use std::fs::File;
use std::io::BufReader;

use xxxkit::formats::payload::{ProbeConfig, locate_payload, try_decompress_from};
use xxxkit::formats::xxx::read_name_table;
use xxxkit::{Error, Result};

fn parse_offset(s: &str) -> Result<u64> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| Error::Parse("offset must be decimal or 0x-prefixed hex"))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: probe <file.xxx> [payload offset]");
        return Ok(());
    };
    let offset = args.next().as_deref().map(parse_offset).transpose()?;

    let mut file = BufReader::new(File::open(&path)?);

    let mut start = 0;
    match read_name_table(&mut file) {
        Ok(scan) => {
            for (i, record) in scan.records.iter().enumerate() {
                println!("name {i}: {} (flags: {})", record.text, record.flags_hex());
            }
            println!("next offset: {:#x}", scan.next_offset);
            match scan.import_count {
                Some(n) => println!("import count: {n}"),
                None => println!("import count: <end of file>"),
            }
            start = scan.next_offset;
        }
        Err(err) => {
            for (i, record) in err.parsed.iter().enumerate() {
                println!("name {i}: {} (flags: {})", record.text, record.flags_hex());
            }
            eprintln!("{err}");
        }
    }

    let result = match offset {
        Some(offset) => try_decompress_from(&mut file, offset).map(Some),
        None => {
            let config = ProbeConfig {
                start,
                ..ProbeConfig::default()
            };
            let scan = locate_payload(&mut file, &config)?;
            println!("{} candidates rejected", scan.rejected.len());
            Ok(scan.found)
        }
    };

    match result {
        Ok(Some(payload)) => {
            println!(
                "decompressed {} bytes of {} from {:#x}",
                payload.len(),
                payload.codec,
                payload.offset
            );
            for marker in &payload.markers {
                println!("  FSB marker at {:#x} (version {:?})", marker.offset, marker.version);
            }
        }
        Ok(None) => println!("no compressed stream found after {start:#x}"),
        Err(err) => eprintln!("{err}"),
    }

    Ok(())
}
