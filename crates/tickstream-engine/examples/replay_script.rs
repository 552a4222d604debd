//! Stream a scripted replay to disk.
//!
//! Reads an event script (see `tickstream_engine::script`) and writes
//! `<stem>_ticks.json` and `<stem>_header.json` next to it.
//!
//! Run with: `cargo run --example replay_script -- match.json [--pretty]`
//!
//! Set `RUST_LOG=debug` to see every emitted tick.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tickstream_engine::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut input: Option<PathBuf> = None;
    let mut config = StreamConfig::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--pretty" => config.pretty = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            path if input.is_none() => input = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}"),
        }
    }
    let Some(input) = input else {
        bail!("usage: replay_script <script.json> [--pretty]");
    };

    let report = parse_file(&input, &config, ScriptedDecoder::from_reader)
        .with_context(|| format!("parsing {}", input.display()))?;

    let paths = OutputPaths::for_input(&input, &config);
    println!(
        "{} ticks from {} frames -> {} ({} bytes, blake3 {})",
        report.ticks_emitted,
        report.frames,
        paths.ticks.display(),
        report.stream.bytes,
        report.stream.digest,
    );
    println!("header -> {}", paths.header.display());
    Ok(())
}
