//! Tickstream Model -- record types and the replay-decoder boundary.
//!
//! This crate defines the vocabulary shared by the rest of the workspace:
//!
//! - [`records`]: the immutable values written to disk ([`Tick`](records::Tick),
//!   [`Player`](records::Player), [`Kill`](records::Kill), ... and the one-shot
//!   [`HeaderData`](records::HeaderData)). Field names on the wire follow the
//!   analytics consumers (`hp`, `sid`, `is_hs`, ...).
//! - [`decoder`]: the trait boundary to the external replay decoder. The
//!   decoder yields typed [`DemoEvent`](decoder::DemoEvent)s in wire order and
//!   exposes a queryable [`WorldState`](decoder::WorldState) describing the
//!   game world at the current position in the stream.
//!
//! Nothing in this crate performs I/O; the aggregation logic lives in
//! `tickstream-state` and the streaming pass in `tickstream-engine`.
//!
//! # Quick Start
//!
//! ```
//! use tickstream_model::prelude::*;
//!
//! let kill = Kill::attributed(Some("alice"), None, "ak47", true, 0);
//! assert_eq!(kill.killer, "alice");
//! assert_eq!(kill.victim, Kill::UNKNOWN);
//!
//! let json = serde_json::to_value(&kill).unwrap();
//! assert_eq!(json["is_hs"], true);
//! ```

#![deny(unsafe_code)]

pub mod decoder;
pub mod records;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A failure reported by the replay decoder before end-of-stream.
///
/// The decoder is a black box; all the pass can learn is a message and,
/// when the decoder knows it, the ingame tick at which decoding broke.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "replay decoding failed{}: {message}",
    .tick.map(|t| format!(" at tick {t}")).unwrap_or_default()
)]
pub struct DecodeError {
    /// Human-readable description from the decoder.
    pub message: String,
    /// The ingame tick at which the failure was detected, if known.
    pub tick: Option<i32>,
}

impl DecodeError {
    /// Create a decode error without tick information.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tick: None,
        }
    }

    /// Create a decode error pinned to an ingame tick.
    pub fn at_tick(message: impl Into<String>, tick: i32) -> Self {
        Self {
            message: message.into(),
            tick: Some(tick),
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::decoder::{
        BombObject, DemoDecoder, DemoEvent, DemoHeader, InfernoState, KillEvent, MatchTimers,
        Participant, Projectile, Side, Team, TeamState, Vec3, WorldState,
    };
    pub use crate::records::{
        BombState, Fire, HeaderData, Inferno, Kill, Nade, NadeEvent, NadeEventKind, Player, Tick,
        TicksDocument,
    };
    pub use crate::DecodeError;
}
