//! The single forward parse pass.
//!
//! [`ParsePass`] owns everything one pass needs: the decoder, the
//! [`MatchState`], the [`BoundaryDetector`], and the ticks
//! [`TickStreamWriter`]. [`ParsePass::run`] pulls events until end-of-stream:
//!
//! 1. Each event is [`dispatch`]ed into the accumulator.
//! 2. On [`Dispatched::FrameDone`] the detector is evaluated against the
//!    decoder's world; on a boundary one [`Tick`](tickstream_model::records::Tick)
//!    is built and appended.
//! 3. At end-of-stream the ticks document is closed and the header data is
//!    read from the decoder.
//!
//! The first error aborts the pass. The writer closes its framing when the
//! pass is dropped, so even an aborted pass leaves a parseable (if
//! incomplete) ticks document behind. The header document is only written
//! after a successful pass.
//!
//! [`parse_file`] wires a pass to the file system; [`succeeded`] collapses
//! its outcome into the plain success flag that callers across an FFI or
//! process boundary expect.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tickstream_model::decoder::{DemoDecoder, WorldState};
use tickstream_model::records::HeaderData;
use tickstream_model::DecodeError;
use tickstream_state::accumulator::MatchState;
use tickstream_state::boundary::{BoundaryDetector, BoundaryStats};

use crate::config::{OutputPaths, StreamConfig};
use crate::dispatch::{dispatch, Dispatched};
use crate::snapshot::build_tick;
use crate::writer::{write_header, StreamSummary, TickStreamWriter};
use crate::ParseError;

// ---------------------------------------------------------------------------
// PassReport
// ---------------------------------------------------------------------------

/// Outcome of a successful pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Events pulled from the decoder, frames included.
    pub events: u64,
    /// Frame-done events, i.e. boundary evaluations.
    pub frames: u64,
    /// Tick records written.
    pub ticks_emitted: u64,
    pub boundary: BoundaryStats,
    pub stream: StreamSummary,
    /// Header data read from the decoder after end-of-stream.
    pub header: HeaderData,
    /// Wall-clock duration of the pass.
    #[serde(skip)]
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// ParsePass
// ---------------------------------------------------------------------------

pub struct ParsePass<D: DemoDecoder, W: Write> {
    decoder: D,
    state: MatchState,
    detector: BoundaryDetector,
    writer: TickStreamWriter<W>,
    events: u64,
    frames: u64,
}

impl<D: DemoDecoder, W: Write> ParsePass<D, W> {
    /// Prepare a pass that writes the ticks document to `out`.
    pub fn new(decoder: D, out: W, config: &StreamConfig) -> Self {
        Self {
            decoder,
            state: MatchState::new(),
            detector: BoundaryDetector::new(),
            writer: TickStreamWriter::new(out, config.pretty),
            events: 0,
            frames: 0,
        }
    }

    /// Run the pass to end-of-stream.
    ///
    /// # Errors
    ///
    /// Aborts on the first decode, write, or serialization error. A pass
    /// runs once: calling `run` again returns
    /// [`ParseError::InvalidState`].
    pub fn run(&mut self) -> Result<PassReport, ParseError> {
        let started = Instant::now();
        self.writer.open()?;
        tracing::info!("parse pass started");

        while self.step()? {}

        if self.state.has_pending_events() {
            tracing::warn!(
                kills = self.state.pending_kills().len(),
                shots = self.state.pending_fire_events().len(),
                "events after the last frame were not emitted"
            );
        }

        let stream = self.writer.close()?;
        let header = HeaderData::from(&self.decoder.header());
        let report = PassReport {
            events: self.events,
            frames: self.frames,
            ticks_emitted: stream.records,
            boundary: self.detector.stats(),
            stream,
            header,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            ticks = report.ticks_emitted,
            frames = report.frames,
            events = report.events,
            bytes = report.stream.bytes,
            map = %report.header.map_name,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "parse pass finished"
        );
        Ok(report)
    }

    /// Pull and handle one event. Returns `false` at end-of-stream.
    fn step(&mut self) -> Result<bool, ParseError> {
        let Some(event) = self.decoder.next_event()? else {
            return Ok(false);
        };
        self.events += 1;
        tracing::trace!(event = event.kind_name(), "dispatch");

        if dispatch(&mut self.state, event) == Dispatched::FrameDone {
            self.frames += 1;
            self.on_frame_done()?;
        }
        Ok(true)
    }

    fn on_frame_done(&mut self) -> Result<(), ParseError> {
        let world = self.decoder.world();
        let started = world.is_match_started();
        let tick_id = world.current_tick();
        let Some(reason) = self.detector.decide(&mut self.state, started, tick_id) else {
            return Ok(());
        };

        let tick = build_tick(world, &mut self.state);
        tracing::debug!(
            tick = tick.tick,
            ?reason,
            players = tick.players.len(),
            kills = tick.kills.len(),
            "emitting tick"
        );
        self.writer.append(&tick)
    }

    /// Read-only access to the accumulator.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Take the ticks output back, closing the framing first if the pass
    /// was aborted.
    pub fn into_output(self) -> Option<W> {
        self.writer.into_inner()
    }
}

// ---------------------------------------------------------------------------
// File-system entry points
// ---------------------------------------------------------------------------

/// Parse the replay at `input` and write both documents next to it.
///
/// `open` turns the opened input into a decoder. Output locations are
/// derived with [`OutputPaths::for_input`] and must not overwrite `input`
/// or each other; the header document is written only after the ticks
/// document has been closed successfully.
pub fn parse_file<D, F>(
    input: &Path,
    config: &StreamConfig,
    open: F,
) -> Result<PassReport, ParseError>
where
    D: DemoDecoder,
    F: FnOnce(BufReader<File>) -> Result<D, DecodeError>,
{
    let paths = OutputPaths::for_input(input, config);
    paths.ensure_distinct(input)?;

    let file = File::open(input).map_err(|source| ParseError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    let decoder = open(BufReader::new(file))?;

    let out = File::create(&paths.ticks).map_err(|source| ParseError::CreateOutput {
        path: paths.ticks.clone(),
        source,
    })?;
    tracing::info!(
        input = %input.display(),
        ticks = %paths.ticks.display(),
        "parsing replay"
    );

    let out = BufWriter::with_capacity(config.buffer_capacity, out);
    let mut pass = ParsePass::new(decoder, out, config);
    let report = pass.run()?;
    drop(pass);

    write_header(&paths.header, &report.header, config.pretty)?;
    Ok(report)
}

/// Collapse a pass outcome into success/failure, logging the error.
pub fn succeeded<T>(outcome: Result<T, ParseError>) -> bool {
    match outcome {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "parse pass failed");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
