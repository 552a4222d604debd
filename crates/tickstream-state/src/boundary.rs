//! Tick boundary detection.
//!
//! The decoder reports a frame far more often than the server advances its
//! logical tick, so emitting a snapshot per frame would flood the output,
//! while emitting only on tick-id changes would drop events that land on a
//! frame whose tick id did not move. The [`BoundaryDetector`] therefore
//! declares a boundary when the match has started and *anything*
//! tick-worthy happened:
//!
//! - the decoder's tick id differs from the last emitted one,
//! - kills, weapon fire, or a grenade trigger are pending,
//! - a round started.
//!
//! A positive decision records the new tick id in the [`MatchState`] before
//! returning, so the snapshot builder always runs against an updated state.
//!
//! # Example
//!
//! ```
//! use tickstream_state::accumulator::MatchState;
//! use tickstream_state::boundary::BoundaryDetector;
//!
//! let mut state = MatchState::new();
//! let mut detector = BoundaryDetector::new();
//!
//! assert!(!detector.evaluate(&mut state, false, 10)); // match not started
//! assert!(detector.evaluate(&mut state, true, 10));
//! assert!(!detector.evaluate(&mut state, true, 10)); // nothing new
//! assert_eq!(state.last_emitted_tick(), Some(10));
//! ```

use serde::Serialize;

use crate::accumulator::MatchState;

// ---------------------------------------------------------------------------
// BoundaryReason
// ---------------------------------------------------------------------------

/// Why a boundary was declared. Several reasons can hold at once; the first
/// matching one in declaration order is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryReason {
    TickAdvanced,
    PendingKills,
    PendingFire,
    PendingNadeEvent,
    RoundStarted,
}

// ---------------------------------------------------------------------------
// BoundaryStats
// ---------------------------------------------------------------------------

/// Counters over the lifetime of one detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoundaryStats {
    /// Frames evaluated (including pre-match frames).
    pub frames_evaluated: u64,
    /// Frames skipped because the match had not started.
    pub frames_before_start: u64,
    /// Boundaries declared, i.e. snapshots to emit.
    pub boundaries: u64,
    /// Boundaries declared although the tick id did not change.
    pub event_only_boundaries: u64,
}

// ---------------------------------------------------------------------------
// BoundaryDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BoundaryDetector {
    stats: BoundaryStats,
}

impl BoundaryDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether the frame at `current_tick` is a boundary.
    ///
    /// On `true`, `state`'s last emitted tick is set to `current_tick`; the
    /// caller must then build and emit exactly one snapshot.
    pub fn evaluate(
        &mut self,
        state: &mut MatchState,
        match_started: bool,
        current_tick: i32,
    ) -> bool {
        self.decide(state, match_started, current_tick).is_some()
    }

    /// Like [`evaluate`](Self::evaluate), reporting the reason of a positive
    /// decision.
    pub fn decide(
        &mut self,
        state: &mut MatchState,
        match_started: bool,
        current_tick: i32,
    ) -> Option<BoundaryReason> {
        self.stats.frames_evaluated += 1;

        if !match_started {
            self.stats.frames_before_start += 1;
            return None;
        }

        let reason = if state.last_emitted_tick() != Some(current_tick) {
            BoundaryReason::TickAdvanced
        } else if !state.pending_kills().is_empty() {
            BoundaryReason::PendingKills
        } else if !state.pending_fire_events().is_empty() {
            BoundaryReason::PendingFire
        } else if state.pending_nade_event().is_some() {
            BoundaryReason::PendingNadeEvent
        } else if state.round_started() {
            BoundaryReason::RoundStarted
        } else {
            return None;
        };

        if reason != BoundaryReason::TickAdvanced {
            self.stats.event_only_boundaries += 1;
        }
        self.stats.boundaries += 1;
        state.mark_emitted(current_tick);

        Some(reason)
    }

    pub fn stats(&self) -> BoundaryStats {
        self.stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
