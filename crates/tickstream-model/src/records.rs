//! Output records: one [`Tick`] per emitted snapshot plus a one-shot
//! [`HeaderData`].
//!
//! Every record derives `Serialize` and `Deserialize`. The serde names are
//! the wire contract with downstream analytics and must not change casually;
//! Rust field names are free to be more descriptive (e.g.
//! `team_side_switch` is written as `"switch"`).
//!
//! Records are plain values. A [`Tick`] is built once by the snapshot
//! builder and never mutated afterwards; [`Player`] entries are recomputed
//! from the decoder's world on every emitted tick.

use serde::{Deserialize, Serialize};

use crate::decoder::{DemoHeader, Team, Vec3};

// ---------------------------------------------------------------------------
// Kill
// ---------------------------------------------------------------------------

/// A kill observed since the previous emitted tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kill {
    /// Name of the killing player, or [`Kill::UNKNOWN`].
    pub killer: String,
    /// Name of the killed player, or [`Kill::UNKNOWN`].
    pub victim: String,
    /// Weapon display name.
    pub weapon: String,
    #[serde(rename = "is_hs")]
    pub is_headshot: bool,
    /// Number of objects the bullet went through.
    #[serde(rename = "penetrations")]
    pub penetrated_objects: i32,
}

impl Kill {
    /// Placeholder name used when the decoder cannot attribute a participant
    /// (world damage, disconnected player, ...).
    pub const UNKNOWN: &'static str = "Unknown";

    /// Build a kill record, substituting [`Kill::UNKNOWN`] for missing
    /// participants.
    pub fn attributed(
        killer: Option<&str>,
        victim: Option<&str>,
        weapon: &str,
        is_headshot: bool,
        penetrated_objects: i32,
    ) -> Self {
        Self {
            killer: killer.unwrap_or(Self::UNKNOWN).to_owned(),
            victim: victim.unwrap_or(Self::UNKNOWN).to_owned(),
            weapon: weapon.to_owned(),
            is_headshot,
            penetrated_objects,
        }
    }
}

// ---------------------------------------------------------------------------
// Grenades
// ---------------------------------------------------------------------------

/// A grenade projectile in flight at the time of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nade {
    /// Decoder-assigned projectile id, stable while the projectile lives.
    pub id: i64,
    /// Grenade weapon name (e.g. `"HE Grenade"`).
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Team of the thrower.
    pub team: Team,
}

/// The non-terminal grenade triggers collapsed into the single nade-event
/// slot of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NadeEventKind {
    HeExplode,
    FlashExplode,
    SmokeStart,
    DecoyStart,
}

/// A grenade detonation or effect start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NadeEvent {
    #[serde(rename = "type")]
    pub kind: NadeEventKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl NadeEvent {
    pub fn new(kind: NadeEventKind, position: Vec3) -> Self {
        Self {
            kind,
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }
}

// ---------------------------------------------------------------------------
// Infernos
// ---------------------------------------------------------------------------

/// A single burning point of an [`Inferno`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fire {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vec3> for Fire {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A molotov/incendiary fire volume.
///
/// `fires` may be empty: an inferno that is dying out still exists in the
/// world and is still emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inferno {
    pub id: i64,
    pub fires: Vec<Fire>,
}

// ---------------------------------------------------------------------------
// BombState
// ---------------------------------------------------------------------------

/// Bomb status. Persists across ticks and is reset at every round start.
///
/// `planted`, `defused` and `exploded` are driven by bomb events; `carrier`
/// and the position are refreshed from the world at every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BombState {
    /// Name of the player carrying the bomb, empty when nobody carries it.
    pub carrier: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub planted: bool,
    pub defused: bool,
    pub exploded: bool,
    /// Name of the planting player, empty until the bomb is planted.
    pub planted_by: String,
    /// Name of the defusing player, empty until the bomb is defused.
    pub defused_by: String,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// An alive participant at the time of the snapshot.
///
/// Players are derived fresh from the decoder's world on every emitted tick.
/// Dead players are absent from the list rather than represented by a
/// placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Stable 64-bit platform id.
    #[serde(rename = "sid")]
    pub steam_id: u64,
    pub name: String,
    pub clan: String,
    pub team: Team,
    #[serde(rename = "hp")]
    pub health: i32,
    pub money: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub view_x: f32,
    pub view_y: f32,
    /// Active weapon name, empty when the player holds nothing.
    #[serde(rename = "actv_itm")]
    pub active_item: String,
    pub items: Vec<String>,
    pub helmet: bool,
    pub armor: i32,
    /// Whether the player carries a defuse kit.
    pub kit: bool,
    pub is_ducking: bool,
    pub is_walking: bool,
    pub is_standing: bool,
    #[serde(rename = "is_air")]
    pub is_airborne: bool,
    #[serde(rename = "is_rld")]
    pub is_reloading: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    /// Cumulative damage dealt this match.
    #[serde(rename = "dmg")]
    pub damage: i32,
    /// Average damage per round, see [`average_damage_per_round`].
    pub adr: f64,
    pub is_planting: bool,
    pub is_defusing: bool,
}

/// Average damage per round.
///
/// With zero rounds played the total damage itself is returned, so damage
/// dealt before round one is reported as-is instead of dividing by zero.
pub fn average_damage_per_round(total_damage: i32, rounds_played: u32) -> f64 {
    if rounds_played == 0 {
        f64::from(total_damage)
    } else {
        f64::from(total_damage) / f64::from(rounds_played)
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// One emitted snapshot of match state.
///
/// A tick is not necessarily one server simulation step: it is emitted when
/// the boundary detector fires, which happens on tick-id changes *and* on
/// frames that carry events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Ingame tick id reported by the decoder.
    pub tick: i32,
    /// Seconds elapsed in the current round.
    pub round_time: f64,
    /// A round started since the previous emitted tick.
    #[serde(rename = "round_start")]
    pub round_started: bool,
    /// Teams swapped sides since the previous emitted tick.
    #[serde(rename = "switch")]
    pub team_side_switch: bool,
    #[serde(rename = "is_freeze")]
    pub is_freeze_time: bool,
    #[serde(rename = "is_halftime")]
    pub is_half_time: bool,
    /// Terrorist team name.
    #[serde(rename = "t")]
    pub team_t: String,
    /// Counter-terrorist team name.
    #[serde(rename = "ct")]
    pub team_ct: String,
    pub t_wins: i32,
    pub ct_wins: i32,
    pub players: Vec<Player>,
    /// Steam ids of players that fired a weapon since the previous tick.
    #[serde(rename = "shooting")]
    pub shooting_events: Vec<u64>,
    pub kills: Vec<Kill>,
    pub nades: Vec<Nade>,
    pub infernos: Vec<Inferno>,
    pub nade_event: Option<NadeEvent>,
    pub bomb: BombState,
}

/// The parsed form of a complete ticks document: `{"ticks": [...]}`.
///
/// The writer never builds this in memory; it exists so consumers (and
/// tests) can read a finished document back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicksDocument {
    pub ticks: Vec<Tick>,
}

// ---------------------------------------------------------------------------
// HeaderData
// ---------------------------------------------------------------------------

/// Match-level metadata written once after the ticks document is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderData {
    /// Server tick rate reported by the decoder.
    #[serde(rename = "tickrate")]
    pub tick_rate: f64,
    /// Total playback frames in the replay.
    pub total_ticks: i32,
    pub map_name: String,
    /// Round length in seconds, if the decoder exposes match configuration.
    pub round_time: Option<f64>,
    /// Freeze-time length in seconds, if exposed.
    pub freeze_time: Option<f64>,
    /// Bomb timer length in seconds, if exposed.
    pub bomb_time: Option<f64>,
}

impl From<&DemoHeader> for HeaderData {
    fn from(header: &DemoHeader) -> Self {
        Self {
            tick_rate: header.tick_rate,
            total_ticks: header.playback_frames,
            map_name: header.map_name.clone(),
            round_time: header.timers.map(|t| t.round_time),
            freeze_time: header.timers.map(|t| t.freeze_time),
            bomb_time: header.timers.map(|t| t.bomb_time),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
