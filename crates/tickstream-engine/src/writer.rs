//! Incremental JSON stream writer.
//!
//! The ticks document is `{"ticks":[ <Tick>, <Tick>, ... ]}`, but a match has
//! tens of thousands of ticks, so it is never built in memory. Instead
//! [`TickStreamWriter`] writes the array framing by hand and serializes one
//! record at a time:
//!
//! ```text
//! Unopened --open()--> Streaming --append()*--> Streaming --close()--> Closed
//! ```
//!
//! If the writer is dropped while still `Streaming` (an error propagated
//! with `?` out of the pass, for instance), `Drop` writes the closing token
//! on a best-effort basis. The document is then incomplete but still valid
//! JSON.
//!
//! Every byte written is also fed to a BLAKE3 hasher; [`close`] reports the
//! digest so a consumer can check the file it reads is the file that was
//! written.
//!
//! [`write_header`] is unrelated to the framing protocol: it writes the one
//! [`HeaderData`] object to its own location.
//!
//! [`close`]: TickStreamWriter::close
//!
//! # Example
//!
//! ```
//! use tickstream_engine::writer::TickStreamWriter;
//!
//! let mut out = Vec::new();
//! let mut writer = TickStreamWriter::new(&mut out, false);
//! writer.open().unwrap();
//! let summary = writer.close().unwrap();
//! drop(writer);
//!
//! assert_eq!(summary.records, 0);
//! let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
//! assert_eq!(doc["ticks"], serde_json::json!([]));
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tickstream_model::records::{HeaderData, Tick};

use crate::ParseError;

const OPEN_TOKEN: &[u8] = b"{\"ticks\":[\n";
const SEPARATOR_TOKEN: &[u8] = b",\n";
const CLOSE_TOKEN: &[u8] = b"\n]}\n";

// ---------------------------------------------------------------------------
// WriterState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Unopened,
    Streaming,
    Closed,
}

// ---------------------------------------------------------------------------
// StreamSummary
// ---------------------------------------------------------------------------

/// What a closed ticks document contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    /// Number of tick records appended.
    pub records: u64,
    /// Total bytes written, framing included.
    pub bytes: u64,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the full document.
    pub digest: String,
}

// ---------------------------------------------------------------------------
// TickStreamWriter
// ---------------------------------------------------------------------------

pub struct TickStreamWriter<W: Write> {
    /// `None` only after [`into_inner`](Self::into_inner).
    out: Option<W>,
    state: WriterState,
    is_first_record: bool,
    pretty: bool,
    records: u64,
    bytes: u64,
    hasher: blake3::Hasher,
    /// Reused buffer holding the separator and the serialized record, so a
    /// failed serialization never leaves half a record in the output.
    scratch: Vec<u8>,
}

impl<W: Write> TickStreamWriter<W> {
    pub fn new(out: W, pretty: bool) -> Self {
        Self {
            out: Some(out),
            state: WriterState::Unopened,
            is_first_record: true,
            pretty,
            records: 0,
            bytes: 0,
            hasher: blake3::Hasher::new(),
            scratch: Vec::new(),
        }
    }

    /// Write the opening framing token.
    pub fn open(&mut self) -> Result<(), ParseError> {
        self.expect_state(WriterState::Unopened, "open")?;
        self.write_raw(OPEN_TOKEN)?;
        self.state = WriterState::Streaming;
        Ok(())
    }

    /// Serialize `tick` and append it, preceded by a separator unless it is
    /// the first record.
    pub fn append(&mut self, tick: &Tick) -> Result<(), ParseError> {
        self.expect_state(WriterState::Streaming, "append")?;

        // Separator and record go out in one write, so a failed record
        // never leaves a dangling separator behind.
        self.scratch.clear();
        if !self.is_first_record {
            self.scratch.extend_from_slice(SEPARATOR_TOKEN);
        }
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.scratch, tick)?;
        } else {
            serde_json::to_writer(&mut self.scratch, tick)?;
        }

        let record = std::mem::take(&mut self.scratch);
        let written = self.write_raw(&record);
        self.scratch = record;
        written?;

        self.is_first_record = false;
        self.records += 1;
        Ok(())
    }

    /// Write the closing framing token, flush, and report what was written.
    pub fn close(&mut self) -> Result<StreamSummary, ParseError> {
        self.expect_state(WriterState::Streaming, "close")?;
        // Closed even if the final write fails, so Drop does not retry.
        self.state = WriterState::Closed;
        self.write_raw(CLOSE_TOKEN)?;
        self.flush()?;

        Ok(StreamSummary {
            records: self.records,
            bytes: self.bytes,
            digest: self.hasher.finalize().to_hex().to_string(),
        })
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of records appended so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Take the underlying output back. A writer that is still streaming is
    /// closed best-effort first.
    pub fn into_inner(mut self) -> Option<W> {
        self.finish_best_effort();
        self.out.take()
    }

    // -- internals ----------------------------------------------------------

    fn expect_state(
        &self,
        expected: WriterState,
        operation: &'static str,
    ) -> Result<(), ParseError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ParseError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        if let Some(out) = self.out.as_mut() {
            out.write_all(bytes)?;
            self.hasher.update(bytes);
            self.bytes += bytes.len() as u64;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ParseError> {
        if let Some(out) = self.out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }

    fn finish_best_effort(&mut self) {
        if self.state != WriterState::Streaming {
            return;
        }
        tracing::warn!(
            records = self.records,
            "ticks stream dropped while open -- writing closing token"
        );
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "best-effort close of ticks stream failed");
        }
    }
}

impl<W: Write> Drop for TickStreamWriter<W> {
    fn drop(&mut self) {
        self.finish_best_effort();
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Serialize `header` as a single JSON document into `out`.
pub fn write_header_to<W: Write>(
    mut out: W,
    header: &HeaderData,
    pretty: bool,
) -> Result<(), ParseError> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, header)?;
    } else {
        serde_json::to_writer(&mut out, header)?;
    }
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write `header` to it.
pub fn write_header(path: &Path, header: &HeaderData, pretty: bool) -> Result<(), ParseError> {
    let file = File::create(path).map_err(|source| ParseError::CreateOutput {
        path: path.to_path_buf(),
        source,
    })?;
    write_header_to(BufWriter::new(file), header, pretty)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tickstream_model::records::{BombState, TicksDocument};

    fn tick(id: i32) -> Tick {
        Tick {
            tick: id,
            round_time: 0.0,
            round_started: false,
            team_side_switch: false,
            is_freeze_time: false,
            is_half_time: false,
            team_t: String::new(),
            team_ct: String::new(),
            t_wins: 0,
            ct_wins: 0,
            players: Vec::new(),
            shooting_events: Vec::new(),
            kills: Vec::new(),
            nades: Vec::new(),
            infernos: Vec::new(),
            nade_event: None,
            bomb: BombState::default(),
        }
    }

    /// A sink that fails after accepting `limit` bytes.
    struct FailingSink {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written.len() + buf.len() > self.limit {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// A sink that rejects any single write containing `needle`, once.
    struct RejectOnce {
        written: Vec<u8>,
        needle: &'static [u8],
        armed: bool,
    }

    impl Write for RejectOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.armed && buf.windows(self.needle.len()).any(|w| w == self.needle) {
                self.armed = false;
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "device busy"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn records_are_comma_separated_in_order() {
        let mut out = Vec::new();
        let mut writer = TickStreamWriter::new(&mut out, false);
        writer.open().unwrap();
        for id in [3, 4, 9] {
            writer.append(&tick(id)).unwrap();
        }
        let summary = writer.close().unwrap();
        drop(writer);

        assert_eq!(summary.records, 3);
        assert_eq!(summary.bytes, out.len() as u64);
        let doc: TicksDocument = serde_json::from_slice(&out).unwrap();
        let ids: Vec<i32> = doc.ticks.iter().map(|t| t.tick).collect();
        assert_eq!(ids, vec![3, 4, 9]);
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 5);
    }

    #[test]
    fn pretty_records_still_form_one_document() {
        let mut out = Vec::new();
        let mut writer = TickStreamWriter::new(&mut out, true);
        writer.open().unwrap();
        writer.append(&tick(1)).unwrap();
        writer.append(&tick(2)).unwrap();
        writer.close().unwrap();
        drop(writer);

        let doc: TicksDocument = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc.ticks.len(), 2);
    }

    #[test]
    fn digest_matches_written_bytes() {
        let mut out = Vec::new();
        let mut writer = TickStreamWriter::new(&mut out, false);
        writer.open().unwrap();
        writer.append(&tick(1)).unwrap();
        let summary = writer.close().unwrap();
        drop(writer);

        assert_eq!(summary.digest, blake3::hash(&out).to_hex().to_string());
        assert_eq!(summary.digest.len(), 64);
    }

    #[test]
    fn operations_out_of_order_are_rejected() {
        let mut writer = TickStreamWriter::new(Vec::new(), false);
        assert!(matches!(
            writer.append(&tick(1)),
            Err(ParseError::InvalidState { operation: "append", state: WriterState::Unopened })
        ));
        assert!(matches!(writer.close(), Err(ParseError::InvalidState { .. })));

        writer.open().unwrap();
        assert!(matches!(writer.open(), Err(ParseError::InvalidState { .. })));
        writer.close().unwrap();
        assert_eq!(writer.state(), WriterState::Closed);
        assert!(matches!(writer.append(&tick(2)), Err(ParseError::InvalidState { .. })));
        assert!(matches!(writer.close(), Err(ParseError::InvalidState { .. })));
    }

    #[test]
    fn dropping_an_open_writer_closes_the_framing() {
        let mut out = Vec::new();
        {
            let mut writer = TickStreamWriter::new(&mut out, false);
            writer.open().unwrap();
            writer.append(&tick(1)).unwrap();
            writer.append(&tick(2)).unwrap();
        }
        let doc: TicksDocument = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc.ticks.len(), 2);
    }

    #[test]
    fn unopened_writer_drops_silently() {
        let mut out = Vec::new();
        drop(TickStreamWriter::new(&mut out, false));
        assert!(out.is_empty());
    }

    #[test]
    fn into_inner_closes_an_open_stream() {
        let mut writer = TickStreamWriter::new(Vec::new(), false);
        writer.open().unwrap();
        writer.append(&tick(5)).unwrap();
        let out = writer.into_inner().unwrap();

        let doc: TicksDocument = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc.ticks[0].tick, 5);
    }

    #[test]
    fn write_failure_surfaces_as_output_error() {
        let sink = FailingSink {
            written: Vec::new(),
            limit: OPEN_TOKEN.len() + 10,
        };
        let mut writer = TickStreamWriter::new(sink, false);
        writer.open().unwrap();
        let err = writer.append(&tick(1)).unwrap_err();
        assert!(matches!(err, ParseError::WriteOutput(_)));
        assert_eq!(writer.records(), 0);
    }

    #[test]
    fn rejected_record_leaves_no_dangling_separator() {
        let sink = RejectOnce {
            written: Vec::new(),
            needle: b"\"tick\":2",
            armed: true,
        };
        let mut writer = TickStreamWriter::new(sink, false);
        writer.open().unwrap();
        writer.append(&tick(1)).unwrap();
        assert!(matches!(writer.append(&tick(2)), Err(ParseError::WriteOutput(_))));
        let sink = writer.into_inner().unwrap();

        let doc: TicksDocument = serde_json::from_slice(&sink.written).unwrap();
        let ids: Vec<i32> = doc.ticks.iter().map(|t| t.tick).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn append_after_rejected_record_stays_well_formed() {
        let sink = RejectOnce {
            written: Vec::new(),
            needle: b"\"tick\":2",
            armed: true,
        };
        let mut writer = TickStreamWriter::new(sink, false);
        writer.open().unwrap();
        writer.append(&tick(1)).unwrap();
        writer.append(&tick(2)).unwrap_err();
        writer.append(&tick(3)).unwrap();
        let summary = writer.close().unwrap();
        let sink = writer.into_inner().unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.digest, blake3::hash(&sink.written).to_hex().to_string());
        let doc: TicksDocument = serde_json::from_slice(&sink.written).unwrap();
        let ids: Vec<i32> = doc.ticks.iter().map(|t| t.tick).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn header_is_a_single_object() {
        let header = HeaderData {
            tick_rate: 64.0,
            total_ticks: 1000,
            map_name: "de_mirage".to_owned(),
            round_time: Some(115.0),
            freeze_time: Some(15.0),
            bomb_time: Some(40.0),
        };
        let mut out = Vec::new();
        write_header_to(&mut out, &header, false).unwrap();

        let back: HeaderData = serde_json::from_slice(&out).unwrap();
        assert_eq!(back, header);
        assert!(out.ends_with(b"\n"));
    }
}
