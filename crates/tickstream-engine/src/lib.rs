//! Tickstream Engine -- single-pass replay-to-snapshot streaming.
//!
//! This crate drives a [`DemoDecoder`](tickstream_model::decoder::DemoDecoder)
//! from start to end-of-stream and turns its events into a JSON document of
//! per-tick snapshots, written incrementally:
//!
//! 1. [`dispatch`] maps every decoded event onto one
//!    [`MatchState`](tickstream_state::accumulator::MatchState) mutation.
//! 2. On each frame, the
//!    [`BoundaryDetector`](tickstream_state::boundary::BoundaryDetector)
//!    decides whether a snapshot is due.
//! 3. [`snapshot::build_tick`] assembles the [`Tick`](tickstream_model::records::Tick).
//! 4. [`writer::TickStreamWriter`] appends it to `{"ticks":[...]}`.
//!
//! After end-of-stream the ticks document is closed and a separate header
//! document is written once.
//!
//! # Quick Start
//!
//! ```
//! use tickstream_engine::prelude::*;
//!
//! let script = EventScript::new(DemoHeader {
//!     tick_rate: 64.0,
//!     playback_frames: 3,
//!     map_name: "de_dust2".to_owned(),
//!     timers: None,
//! })
//! .frame(WorldPatch::at_tick(1).started(true))
//! .event(DemoEvent::RoundStart)
//! .frame(WorldPatch::at_tick(2));
//!
//! let mut out = Vec::new();
//! let mut pass = ParsePass::new(ScriptedDecoder::new(script), &mut out, &StreamConfig::default());
//! let report = pass.run().unwrap();
//! drop(pass);
//!
//! assert_eq!(report.ticks_emitted, 2);
//! let doc: TicksDocument = serde_json::from_slice(&out).unwrap();
//! assert!(doc.ticks[1].round_started);
//! ```

#![deny(unsafe_code)]

use std::path::PathBuf;

use tickstream_model::DecodeError;

pub mod config;
pub mod dispatch;
pub mod pass;
pub mod script;
pub mod snapshot;
pub mod writer;

/// Re-export the model crate for convenience.
pub use tickstream_model;

/// Re-export the state crate for convenience.
pub use tickstream_state;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Everything that can abort a parse pass.
///
/// None of these are recovered locally: the first error ends the pass.
/// `CreateOutput` and `WriteOutput` together form the "output" class;
/// `Serialization` signals a record that could not be encoded, which is a
/// bug rather than a user-facing condition.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The replay input could not be opened or read.
    #[error("cannot read replay input '{}': {source}", .path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An output location could not be created.
    #[error("cannot create output '{}': {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing to an already-open output failed.
    #[error("failed to write output stream: {0}")]
    WriteOutput(#[from] std::io::Error),

    /// The decoder reported a malformed replay before end-of-stream.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stream writer operation was called in the wrong state.
    #[error("stream writer cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: writer::WriterState,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tickstream_model::prelude::*;
    pub use tickstream_state::prelude::*;

    pub use crate::config::{OutputPaths, StreamConfig};
    pub use crate::dispatch::{dispatch, Dispatched};
    pub use crate::pass::{parse_file, succeeded, ParsePass, PassReport};
    pub use crate::script::{EventScript, ScriptStep, ScriptWorld, ScriptedDecoder, WorldPatch};
    pub use crate::snapshot::build_tick;
    pub use crate::writer::{
        write_header, write_header_to, StreamSummary, TickStreamWriter, WriterState,
    };
    pub use crate::ParseError;
}
