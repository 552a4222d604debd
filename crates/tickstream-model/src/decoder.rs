//! The replay-decoder boundary.
//!
//! The binary replay format is decoded elsewhere. This module only describes
//! what the aggregation pass needs from a decoder:
//!
//! - [`DemoDecoder::next_event`] yields [`DemoEvent`]s in wire order and
//!   `Ok(None)` at end-of-stream. This pull model replaces per-event callback
//!   registration: the pass dispatches on the event enum, so every event kind
//!   is handled by an exhaustive `match`.
//! - [`DemoDecoder::world`] exposes the [`WorldState`] as of the last event
//!   returned. The pass only reads it while handling a
//!   [`DemoEvent::FrameDone`].
//! - [`DemoDecoder::header`] reports replay-level metadata once the stream
//!   has been consumed.
//!
//! The view types ([`Participant`], [`Projectile`], ...) are decoder-side
//! facts. They are deliberately richer than the output records; turning them
//! into [`Player`](crate::records::Player)s and friends is the snapshot
//! builder's job.

use serde::{Deserialize, Serialize};

use crate::records::NadeEvent;
use crate::DecodeError;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A world-space position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Team membership of a participant or grenade owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[default]
    #[serde(rename = "UNASSIGNED")]
    Unassigned,
    #[serde(rename = "SPEC")]
    Spectators,
    #[serde(rename = "T")]
    Terrorists,
    #[serde(rename = "CT")]
    CounterTerrorists,
}

impl Team {
    /// Whether the team takes part in rounds (T or CT).
    pub fn is_playing(self) -> bool {
        matches!(self, Team::Terrorists | Team::CounterTerrorists)
    }
}

/// One of the two playing sides, used to query team name and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    T,
    Ct,
}

/// Name and round-win count of one side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    /// Clan/team name as shown on the scoreboard.
    pub name: String,
    /// Rounds won so far.
    pub score: i32,
}

// ---------------------------------------------------------------------------
// World views
// ---------------------------------------------------------------------------

/// A connected participant as tracked by the decoder.
///
/// Includes dead players and spectators; the snapshot builder filters them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub steam_id: u64,
    pub name: String,
    pub clan: String,
    pub team: Team,
    pub is_alive: bool,
    pub health: i32,
    pub money: i32,
    pub armor: i32,
    pub has_helmet: bool,
    pub has_defuse_kit: bool,
    pub position: Vec3,
    /// Horizontal view angle in degrees.
    pub view_x: f32,
    /// Vertical view angle in degrees.
    pub view_y: f32,
    pub active_weapon: Option<String>,
    /// Every weapon/utility item in the inventory, in decoder order.
    pub weapons: Vec<String>,
    pub is_ducking: bool,
    pub is_walking: bool,
    pub is_standing: bool,
    pub is_airborne: bool,
    pub is_reloading: bool,
    pub is_planting: bool,
    pub is_defusing: bool,
    // cumulative
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub total_damage: i32,
}

/// A grenade projectile currently in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: i64,
    /// Weapon name of the thrown grenade.
    pub weapon: String,
    pub position: Vec3,
    pub owner_team: Team,
}

/// A burning molotov/incendiary volume and its active fire points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfernoState {
    pub id: i64,
    pub fires: Vec<Vec3>,
}

/// The bomb entity: who carries it and where it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BombObject {
    /// Carrier name; `None` when the bomb is dropped or planted.
    pub carrier: Option<String>,
    pub position: Vec3,
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Match timer configuration, when the decoder can read it from the replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchTimers {
    /// Round length in seconds.
    pub round_time: f64,
    /// Freeze-time length in seconds.
    pub freeze_time: f64,
    /// Bomb timer in seconds.
    pub bomb_time: f64,
}

/// Replay-level metadata reported by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemoHeader {
    pub tick_rate: f64,
    pub playback_frames: i32,
    pub map_name: String,
    #[serde(default)]
    pub timers: Option<MatchTimers>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Raw kill information as the decoder reports it. Either side may be
/// unattributable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillEvent {
    pub killer: Option<String>,
    pub victim: Option<String>,
    pub weapon: String,
    #[serde(default)]
    pub is_headshot: bool,
    #[serde(default)]
    pub penetrated_objects: i32,
}

/// A typed game event, in wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DemoEvent {
    Kill(KillEvent),
    WeaponFire { shooter: u64 },
    /// HE/flash detonation or smoke/decoy start.
    GrenadeTrigger(NadeEvent),
    RoundStart,
    BombPlanted { planter: String },
    BombDefused { defuser: String },
    BombExploded,
    TeamSideSwitch,
    /// The decoder finished processing one frame. The world is consistent
    /// and may be queried.
    FrameDone,
}

impl DemoEvent {
    /// Short stable name, used for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DemoEvent::Kill(_) => "kill",
            DemoEvent::WeaponFire { .. } => "weapon_fire",
            DemoEvent::GrenadeTrigger(_) => "grenade_trigger",
            DemoEvent::RoundStart => "round_start",
            DemoEvent::BombPlanted { .. } => "bomb_planted",
            DemoEvent::BombDefused { .. } => "bomb_defused",
            DemoEvent::BombExploded => "bomb_exploded",
            DemoEvent::TeamSideSwitch => "team_side_switch",
            DemoEvent::FrameDone => "frame_done",
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Queryable game world at the decoder's current position.
pub trait WorldState {
    /// Current ingame tick id.
    fn current_tick(&self) -> i32;

    /// Seconds elapsed in the current round.
    fn round_time(&self) -> f64;

    /// Whether the match proper has started (warmup is over).
    fn is_match_started(&self) -> bool;

    fn is_freeze_time(&self) -> bool;

    fn is_half_time(&self) -> bool {
        false
    }

    /// All known participants, alive or not.
    fn participants(&self) -> &[Participant];

    fn grenade_projectiles(&self) -> &[Projectile];

    fn infernos(&self) -> &[InfernoState];

    fn bomb(&self) -> &BombObject;

    fn team(&self, side: Side) -> &TeamState;

    /// Rounds completed so far in the match.
    fn rounds_played(&self) -> u32;
}

/// A forward-only source of replay events.
pub trait DemoDecoder {
    type World: WorldState;

    /// Decode the next event. `Ok(None)` signals end-of-stream; after an
    /// error the decoder must not be polled again.
    fn next_event(&mut self) -> Result<Option<DemoEvent>, DecodeError>;

    /// The world as of the most recently returned event.
    fn world(&self) -> &Self::World;

    /// Replay metadata. Only guaranteed complete once `next_event` has
    /// returned `Ok(None)`.
    fn header(&self) -> DemoHeader;
}
