use crate::args::ReplayArgs;
use crate::shared::report::{format_position, format_satellites, format_statistics};
use anyhow::{Context, Result};
use gnss_stream::NavProcessor;
use log::info;
use std::fs;

// Public replay command entrypoint: decode a whole capture and print where it ended up.
pub fn run_replay(args: ReplayArgs) -> Result<()> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("reading capture failed: {}", args.file.display()))?;
    let processor = NavProcessor::with_config(args.to_processor_config());

    for chunk in bytes.chunks(args.chunk_bytes.max(1)) {
        processor.feed(chunk);
    }
    info!(
        "Replayed {} bytes from {} in {}-byte chunks",
        bytes.len(),
        args.file.display(),
        args.chunk_bytes.max(1)
    );

    let snapshot = processor.snapshot();
    println!("{}", format_position(&snapshot.position));
    for line in format_satellites(&snapshot.satellites, args.report_format) {
        println!("{line}");
    }
    println!("{}", format_statistics(&processor.current_statistics()));

    if args.dump_tail_bytes > 0 {
        println!("{}", hex_dump(&processor.raw_buffer(args.dump_tail_bytes)));
    }
    Ok(())
}

// Space-separated hex, 16 bytes per line.
fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|line| {
            line.iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
