//! Match state accumulator.
//!
//! [`MatchState`] is the single mutable store of a parse pass. It holds two
//! kinds of data:
//!
//! - **Persistent** fields that live across snapshots: the bomb status, the
//!   id of the last emitted tick, and the round-start / side-switch flags
//!   (the flags persist until the next snapshot reports them).
//! - **Transient** fields that collect events between two snapshots: kills,
//!   weapon fire, and the single nade-event slot. They are handed to the
//!   snapshot builder by [`MatchState::drain_transient`], which also clears
//!   them, so every event is delivered at most once.
//!
//! Mutations are plain `&mut self` methods called by the event dispatcher.
//! They return nothing and may be called in any order within a tick window.
//!
//! # Example
//!
//! ```
//! use tickstream_model::prelude::*;
//! use tickstream_state::accumulator::MatchState;
//!
//! let mut state = MatchState::new();
//! state.on_round_start();
//! state.on_kill(Kill::attributed(Some("alice"), Some("bob"), "ak47", true, 0));
//! state.on_weapon_fire(76561198000000001);
//!
//! let drained = state.drain_transient();
//! assert_eq!(drained.kills.len(), 1);
//! assert_eq!(drained.fire_events, vec![76561198000000001]);
//! assert!(!state.has_pending_events());
//! assert!(state.take_round_started());
//! ```

use tickstream_model::records::{BombState, Kill, NadeEvent};

// ---------------------------------------------------------------------------
// TransientEvents
// ---------------------------------------------------------------------------

/// Events collected since the previous snapshot, moved out of the
/// accumulator in one piece.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransientEvents {
    /// Kills in observation order.
    pub kills: Vec<Kill>,
    /// Steam ids of shooters in observation order (one entry per shot).
    pub fire_events: Vec<u64>,
    /// The most recent non-terminal grenade trigger, if any.
    pub nade_event: Option<NadeEvent>,
}

impl TransientEvents {
    pub fn is_empty(&self) -> bool {
        self.kills.is_empty() && self.fire_events.is_empty() && self.nade_event.is_none()
    }
}

// ---------------------------------------------------------------------------
// MatchState
// ---------------------------------------------------------------------------

/// Mutable state of one aggregation pass.
///
/// Owned exclusively by the pass and passed by `&mut` into every handler.
#[derive(Debug, Clone, Default)]
pub struct MatchState {
    /// Tick id of the most recently emitted snapshot. `None` until the first
    /// snapshot, which no real tick id can equal.
    last_emitted_tick: Option<i32>,
    /// Set by a round start, consumed by the next snapshot.
    round_started: bool,
    /// Set by a side switch, consumed by the next snapshot.
    team_side_switch: bool,
    bomb: BombState,
    pending_kills: Vec<Kill>,
    pending_fire_events: Vec<u64>,
    /// Last-wins slot for non-terminal grenade triggers.
    pending_nade_event: Option<NadeEvent>,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    // -- mutations ----------------------------------------------------------

    pub fn on_kill(&mut self, kill: Kill) {
        self.pending_kills.push(kill);
    }

    pub fn on_weapon_fire(&mut self, shooter: u64) {
        self.pending_fire_events.push(shooter);
    }

    /// Record a non-terminal grenade trigger (HE/flash detonation, smoke or
    /// decoy start).
    ///
    /// Only one trigger is kept per tick window: a later trigger replaces an
    /// earlier one that has not been drained yet.
    pub fn on_grenade_trigger(&mut self, event: NadeEvent) {
        if let Some(previous) = self.pending_nade_event.replace(event) {
            tracing::trace!(
                dropped = ?previous.kind,
                "grenade trigger replaced an undrained one in the same tick window"
            );
        }
    }

    /// Mark a round start and reset the bomb so no bomb status leaks into
    /// the new round.
    pub fn on_round_start(&mut self) {
        self.round_started = true;
        self.bomb = BombState::default();
    }

    pub fn on_bomb_planted(&mut self, planter: &str) {
        self.bomb.planted = true;
        self.bomb.planted_by = planter.to_owned();
    }

    pub fn on_bomb_defused(&mut self, defuser: &str) {
        self.bomb.defused = true;
        self.bomb.defused_by = defuser.to_owned();
    }

    pub fn on_bomb_exploded(&mut self) {
        self.bomb.exploded = true;
    }

    pub fn on_side_switch(&mut self) {
        self.team_side_switch = true;
    }

    // -- snapshot support ---------------------------------------------------

    /// Move all transient events out of the accumulator, leaving it empty.
    pub fn drain_transient(&mut self) -> TransientEvents {
        TransientEvents {
            kills: std::mem::take(&mut self.pending_kills),
            fire_events: std::mem::take(&mut self.pending_fire_events),
            nade_event: self.pending_nade_event.take(),
        }
    }

    /// Report and reset the round-start flag.
    pub fn take_round_started(&mut self) -> bool {
        std::mem::take(&mut self.round_started)
    }

    /// Report and reset the side-switch flag.
    pub fn take_side_switch(&mut self) -> bool {
        std::mem::take(&mut self.team_side_switch)
    }

    /// Record that a snapshot for `tick` is being emitted.
    pub fn mark_emitted(&mut self, tick: i32) {
        self.last_emitted_tick = Some(tick);
    }

    // -- accessors ----------------------------------------------------------

    pub fn last_emitted_tick(&self) -> Option<i32> {
        self.last_emitted_tick
    }

    pub fn round_started(&self) -> bool {
        self.round_started
    }

    pub fn team_side_switch(&self) -> bool {
        self.team_side_switch
    }

    /// Persistent bomb status (flags and planter/defuser names).
    pub fn bomb(&self) -> &BombState {
        &self.bomb
    }

    pub fn pending_kills(&self) -> &[Kill] {
        &self.pending_kills
    }

    pub fn pending_fire_events(&self) -> &[u64] {
        &self.pending_fire_events
    }

    pub fn pending_nade_event(&self) -> Option<&NadeEvent> {
        self.pending_nade_event.as_ref()
    }

    /// Whether any transient event is waiting for the next snapshot.
    pub fn has_pending_events(&self) -> bool {
        !self.pending_kills.is_empty()
            || !self.pending_fire_events.is_empty()
            || self.pending_nade_event.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
