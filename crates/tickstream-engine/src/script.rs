//! Scripted, in-memory replay decoder.
//!
//! An [`EventScript`] is a serializable, ordered list of [`ScriptStep`]s:
//! either a decoded event, or a frame that patches the world and then ends
//! the frame. [`ScriptedDecoder`] replays it through the
//! [`DemoDecoder`] trait, which makes it a stand-in for a real replay
//! decoder in tests, benchmarks, and for feeding pre-extracted event logs
//! through the pass.
//!
//! # Building a script
//!
//! ```
//! use tickstream_engine::script::{EventScript, WorldPatch};
//! use tickstream_model::decoder::{DemoEvent, DemoHeader};
//!
//! let script = EventScript::new(DemoHeader::default())
//!     .frame(WorldPatch::at_tick(1).started(true))
//!     .event(DemoEvent::WeaponFire { shooter: 7 })
//!     .frame(WorldPatch::at_tick(1));
//!
//! assert_eq!(script.steps.len(), 3);
//! script.validate().unwrap();
//! ```
//!
//! # JSON form
//!
//! ```
//! use tickstream_engine::script::EventScript;
//!
//! let script = EventScript::from_json(r#"{
//!     "header": {"tick_rate": 64.0, "playback_frames": 2, "map_name": "de_ancient"},
//!     "steps": [
//!         {"frame": {"tick": 1, "match_started": true}},
//!         {"event": {"event": "round_start"}},
//!         {"frame": {"tick": 2}}
//!     ]
//! }"#).unwrap();
//! assert_eq!(script.header.map_name, "de_ancient");
//! ```

use std::io::Read;

use serde::{Deserialize, Serialize};
use tickstream_model::decoder::{
    BombObject, DemoDecoder, DemoEvent, DemoHeader, InfernoState, Participant, Projectile, Side,
    TeamState, WorldState,
};
use tickstream_model::DecodeError;

// ---------------------------------------------------------------------------
// ScriptWorld
// ---------------------------------------------------------------------------

/// A plain-data [`WorldState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptWorld {
    pub tick: i32,
    pub round_time: f64,
    pub match_started: bool,
    pub freeze_time: bool,
    pub half_time: bool,
    pub participants: Vec<Participant>,
    pub projectiles: Vec<Projectile>,
    pub infernos: Vec<InfernoState>,
    pub bomb: BombObject,
    pub team_t: TeamState,
    pub team_ct: TeamState,
    pub rounds_played: u32,
}

impl WorldState for ScriptWorld {
    fn current_tick(&self) -> i32 {
        self.tick
    }

    fn round_time(&self) -> f64 {
        self.round_time
    }

    fn is_match_started(&self) -> bool {
        self.match_started
    }

    fn is_freeze_time(&self) -> bool {
        self.freeze_time
    }

    fn is_half_time(&self) -> bool {
        self.half_time
    }

    fn participants(&self) -> &[Participant] {
        &self.participants
    }

    fn grenade_projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    fn infernos(&self) -> &[InfernoState] {
        &self.infernos
    }

    fn bomb(&self) -> &BombObject {
        &self.bomb
    }

    fn team(&self, side: Side) -> &TeamState {
        match side {
            Side::T => &self.team_t,
            Side::Ct => &self.team_ct,
        }
    }

    fn rounds_played(&self) -> u32 {
        self.rounds_played
    }
}

// ---------------------------------------------------------------------------
// WorldPatch
// ---------------------------------------------------------------------------

/// A partial world update applied at the start of a scripted frame.
///
/// `None` fields keep their previous value, so a script only spells out what
/// changes from frame to frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldPatch {
    pub tick: Option<i32>,
    pub round_time: Option<f64>,
    pub match_started: Option<bool>,
    pub freeze_time: Option<bool>,
    pub half_time: Option<bool>,
    pub participants: Option<Vec<Participant>>,
    pub projectiles: Option<Vec<Projectile>>,
    pub infernos: Option<Vec<InfernoState>>,
    pub bomb: Option<BombObject>,
    pub team_t: Option<TeamState>,
    pub team_ct: Option<TeamState>,
    pub rounds_played: Option<u32>,
}

impl WorldPatch {
    pub fn at_tick(tick: i32) -> Self {
        Self {
            tick: Some(tick),
            ..Default::default()
        }
    }

    pub fn started(mut self, started: bool) -> Self {
        self.match_started = Some(started);
        self
    }

    pub fn with_participants(mut self, participants: Vec<Participant>) -> Self {
        self.participants = Some(participants);
        self
    }

    pub fn with_bomb(mut self, bomb: BombObject) -> Self {
        self.bomb = Some(bomb);
        self
    }

    pub fn with_rounds_played(mut self, rounds: u32) -> Self {
        self.rounds_played = Some(rounds);
        self
    }

    /// Overwrite every field of `world` that this patch sets.
    pub fn apply(self, world: &mut ScriptWorld) {
        if let Some(v) = self.tick {
            world.tick = v;
        }
        if let Some(v) = self.round_time {
            world.round_time = v;
        }
        if let Some(v) = self.match_started {
            world.match_started = v;
        }
        if let Some(v) = self.freeze_time {
            world.freeze_time = v;
        }
        if let Some(v) = self.half_time {
            world.half_time = v;
        }
        if let Some(v) = self.participants {
            world.participants = v;
        }
        if let Some(v) = self.projectiles {
            world.projectiles = v;
        }
        if let Some(v) = self.infernos {
            world.infernos = v;
        }
        if let Some(v) = self.bomb {
            world.bomb = v;
        }
        if let Some(v) = self.team_t {
            world.team_t = v;
        }
        if let Some(v) = self.team_ct {
            world.team_ct = v;
        }
        if let Some(v) = self.rounds_played {
            world.rounds_played = v;
        }
    }
}

// ---------------------------------------------------------------------------
// EventScript
// ---------------------------------------------------------------------------

/// One step of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Yield this event unchanged.
    Event(DemoEvent),
    /// Apply the patch, then yield [`DemoEvent::FrameDone`].
    Frame(WorldPatch),
}

/// A complete scripted replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventScript {
    /// Returned from [`DemoDecoder::header`].
    pub header: DemoHeader,
    pub steps: Vec<ScriptStep>,
    /// Report a decode failure instead of the step at this index.
    #[serde(default)]
    pub fail_at_step: Option<usize>,
}

impl EventScript {
    pub fn new(header: DemoHeader) -> Self {
        Self {
            header,
            steps: Vec::new(),
            fail_at_step: None,
        }
    }

    pub fn event(mut self, event: DemoEvent) -> Self {
        self.steps.push(ScriptStep::Event(event));
        self
    }

    pub fn frame(mut self, patch: WorldPatch) -> Self {
        self.steps.push(ScriptStep::Frame(patch));
        self
    }

    /// Make the decoder fail when it reaches the next step to be added.
    pub fn fail_here(mut self) -> Self {
        self.fail_at_step = Some(self.steps.len());
        self
    }

    /// Parse a script from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        let script: EventScript = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("invalid event script: {e}"))?;
        script.validate()?;
        Ok(script)
    }

    /// Check that the script describes a forward-only stream.
    ///
    /// # Errors
    ///
    /// - A frame patch moves the tick id backwards.
    /// - `fail_at_step` points past the end of the script.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let mut last_tick: Option<i32> = None;
        for (index, step) in self.steps.iter().enumerate() {
            let ScriptStep::Frame(WorldPatch { tick: Some(tick), .. }) = step else {
                continue;
            };
            if let Some(prev) = last_tick {
                if *tick < prev {
                    return Err(anyhow::anyhow!(
                        "event script step {index} moves tick backwards from {prev} to {tick}"
                    ));
                }
            }
            last_tick = Some(*tick);
        }

        if let Some(at) = self.fail_at_step {
            if at > self.steps.len() {
                return Err(anyhow::anyhow!(
                    "fail_at_step ({at}) is past the end of the script ({} steps)",
                    self.steps.len()
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedDecoder
// ---------------------------------------------------------------------------

/// Replays an [`EventScript`] as a [`DemoDecoder`].
pub struct ScriptedDecoder {
    steps: std::vec::IntoIter<ScriptStep>,
    header: DemoHeader,
    fail_at_step: Option<usize>,
    world: ScriptWorld,
    /// Index of the next step to yield.
    position: usize,
}

impl ScriptedDecoder {
    pub fn new(script: EventScript) -> Self {
        Self {
            steps: script.steps.into_iter(),
            header: script.header,
            fail_at_step: script.fail_at_step,
            world: ScriptWorld::default(),
            position: 0,
        }
    }

    /// Read, parse, and validate a JSON script.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, DecodeError> {
        let mut json = String::new();
        reader
            .read_to_string(&mut json)
            .map_err(|e| DecodeError::new(format!("cannot read event script: {e}")))?;
        let script = EventScript::from_json(&json).map_err(|e| DecodeError::new(e.to_string()))?;
        Ok(Self::new(script))
    }
}

impl DemoDecoder for ScriptedDecoder {
    type World = ScriptWorld;

    fn next_event(&mut self) -> Result<Option<DemoEvent>, DecodeError> {
        if self.fail_at_step == Some(self.position) {
            return Err(DecodeError::at_tick(
                format!("scripted failure at step {}", self.position),
                self.world.tick,
            ));
        }

        let Some(step) = self.steps.next() else {
            return Ok(None);
        };
        self.position += 1;

        Ok(Some(match step {
            ScriptStep::Event(event) => event,
            ScriptStep::Frame(patch) => {
                patch.apply(&mut self.world);
                DemoEvent::FrameDone
            }
        }))
    }

    fn world(&self) -> &ScriptWorld {
        &self.world
    }

    fn header(&self) -> DemoHeader {
        self.header.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut ScriptedDecoder) -> Result<Vec<DemoEvent>, DecodeError> {
        let mut events = Vec::new();
        while let Some(event) = decoder.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn frames_patch_the_world_and_yield_frame_done() {
        let script = EventScript::new(DemoHeader::default())
            .frame(WorldPatch::at_tick(5).started(true))
            .event(DemoEvent::RoundStart)
            .frame(WorldPatch::at_tick(6));
        let mut decoder = ScriptedDecoder::new(script);

        assert_eq!(decoder.next_event().unwrap(), Some(DemoEvent::FrameDone));
        assert_eq!(decoder.world().current_tick(), 5);
        assert!(decoder.world().is_match_started());

        assert_eq!(decoder.next_event().unwrap(), Some(DemoEvent::RoundStart));
        assert_eq!(decoder.next_event().unwrap(), Some(DemoEvent::FrameDone));
        assert_eq!(decoder.world().current_tick(), 6);
        // Unpatched fields carry over.
        assert!(decoder.world().is_match_started());

        assert_eq!(decoder.next_event().unwrap(), None);
    }

    #[test]
    fn scripted_failure_is_reported_at_the_step() {
        let script = EventScript::new(DemoHeader::default())
            .frame(WorldPatch::at_tick(40).started(true))
            .fail_here()
            .frame(WorldPatch::at_tick(41));
        let mut decoder = ScriptedDecoder::new(script);

        let err = drain(&mut decoder).unwrap_err();
        assert_eq!(err.tick, Some(40));
        assert!(err.message.contains("step 1"));
    }

    #[test]
    fn backwards_tick_is_rejected() {
        let script = EventScript::new(DemoHeader::default())
            .frame(WorldPatch::at_tick(10))
            .frame(WorldPatch::default())
            .frame(WorldPatch::at_tick(9));
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("backwards from 10 to 9"));
    }

    #[test]
    fn fail_index_past_end_is_rejected() {
        let mut script = EventScript::new(DemoHeader::default()).event(DemoEvent::RoundStart);
        script.fail_at_step = Some(5);
        assert!(script.validate().is_err());
    }

    #[test]
    fn from_reader_maps_bad_json_to_decode_error() {
        let err = ScriptedDecoder::from_reader("{not json".as_bytes())
            .err()
            .expect("malformed script must fail");
        assert!(err.message.contains("invalid event script"));
    }

    #[test]
    fn script_round_trips_through_json() {
        let script = EventScript::new(DemoHeader {
            tick_rate: 128.0,
            playback_frames: 10,
            map_name: "de_train".to_owned(),
            timers: None,
        })
        .frame(WorldPatch::at_tick(1).with_rounds_played(3))
        .event(DemoEvent::BombPlanted {
            planter: "p".to_owned(),
        });

        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(EventScript::from_json(&json).unwrap(), script);
    }
}
