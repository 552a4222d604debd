//! Snapshot assembly.
//!
//! [`build_tick`] turns the decoder's world plus the accumulator into one
//! immutable [`Tick`]. It must run only right after a positive boundary
//! decision; it drains the accumulator's transient events and one-shot
//! flags as a side effect.
//!
//! Steps, in order:
//!
//! 1. drain kills / weapon fire / nade event;
//! 2. alive, playing participants become [`Player`]s;
//! 3. grenade projectiles become [`Nade`]s;
//! 4. infernos become [`Inferno`]s, including ones with no fire left;
//! 5. bomb carrier and position are merged into the persistent bomb status;
//! 6. team names and scores are read;
//! 7. round-start and side-switch flags are consumed.

use tickstream_model::decoder::{
    BombObject, InfernoState, Participant, Projectile, Side, WorldState,
};
use tickstream_model::records::{
    average_damage_per_round, BombState, Fire, Inferno, Nade, Player, Tick,
};
use tickstream_state::accumulator::MatchState;

/// Build the snapshot for the boundary that was just declared.
pub fn build_tick<W: WorldState + ?Sized>(world: &W, state: &mut MatchState) -> Tick {
    debug_assert_eq!(
        state.last_emitted_tick(),
        Some(world.current_tick()),
        "build_tick called without a boundary at the current tick"
    );

    let events = state.drain_transient();

    let rounds_played = world.rounds_played();
    let players = world
        .participants()
        .iter()
        .filter(|p| p.is_alive && p.team.is_playing())
        .map(|p| player_from(p, rounds_played))
        .collect();

    let nades = world.grenade_projectiles().iter().map(nade_from).collect();
    let infernos = world.infernos().iter().map(inferno_from).collect();
    let bomb = merge_bomb(state.bomb(), world.bomb());

    let team_t = world.team(Side::T);
    let team_ct = world.team(Side::Ct);

    Tick {
        tick: world.current_tick(),
        round_time: world.round_time(),
        round_started: state.take_round_started(),
        team_side_switch: state.take_side_switch(),
        is_freeze_time: world.is_freeze_time(),
        is_half_time: world.is_half_time(),
        team_t: team_t.name.clone(),
        team_ct: team_ct.name.clone(),
        t_wins: team_t.score,
        ct_wins: team_ct.score,
        players,
        shooting_events: events.fire_events,
        kills: events.kills,
        nades,
        infernos,
        nade_event: events.nade_event,
        bomb,
    }
}

fn player_from(p: &Participant, rounds_played: u32) -> Player {
    Player {
        steam_id: p.steam_id,
        name: p.name.clone(),
        clan: p.clan.clone(),
        team: p.team,
        health: p.health,
        money: p.money,
        x: p.position.x,
        y: p.position.y,
        z: p.position.z,
        view_x: p.view_x,
        view_y: p.view_y,
        active_item: p.active_weapon.clone().unwrap_or_default(),
        items: p.weapons.clone(),
        helmet: p.has_helmet,
        armor: p.armor,
        kit: p.has_defuse_kit,
        is_ducking: p.is_ducking,
        is_walking: p.is_walking,
        is_standing: p.is_standing,
        is_airborne: p.is_airborne,
        is_reloading: p.is_reloading,
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        damage: p.total_damage,
        adr: average_damage_per_round(p.total_damage, rounds_played),
        is_planting: p.is_planting,
        is_defusing: p.is_defusing,
    }
}

fn nade_from(p: &Projectile) -> Nade {
    Nade {
        id: p.id,
        kind: p.weapon.clone(),
        x: p.position.x,
        y: p.position.y,
        z: p.position.z,
        team: p.owner_team,
    }
}

fn inferno_from(i: &InfernoState) -> Inferno {
    Inferno {
        id: i.id,
        fires: i.fires.iter().copied().map(Fire::from).collect(),
    }
}

/// Event-driven flags and names come from the accumulator; who carries the
/// bomb and where it is come from the world.
fn merge_bomb(persistent: &BombState, object: &BombObject) -> BombState {
    BombState {
        carrier: object.carrier.clone().unwrap_or_default(),
        x: object.position.x,
        y: object.position.y,
        z: object.position.z,
        ..persistent.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ScriptWorld, WorldPatch};
    use tickstream_model::decoder::{Team, TeamState, Vec3};
    use tickstream_model::records::{Kill, NadeEvent, NadeEventKind};

    fn participant(name: &str, team: Team, alive: bool, damage: i32) -> Participant {
        Participant {
            steam_id: name.len() as u64,
            name: name.to_owned(),
            team,
            is_alive: alive,
            health: if alive { 100 } else { 0 },
            total_damage: damage,
            active_weapon: Some("glock".to_owned()),
            weapons: vec!["knife".to_owned(), "glock".to_owned()],
            ..Default::default()
        }
    }

    fn world_at(tick: i32) -> ScriptWorld {
        let mut world = ScriptWorld::default();
        WorldPatch::at_tick(tick).started(true).apply(&mut world);
        world
    }

    fn boundary(state: &mut MatchState, tick: i32) {
        state.mark_emitted(tick);
    }

    #[test]
    fn only_alive_playing_participants_are_emitted() {
        let mut world = world_at(10);
        world.participants = vec![
            participant("alive_t", Team::Terrorists, true, 0),
            participant("dead_ct", Team::CounterTerrorists, false, 0),
            participant("spectator", Team::Spectators, true, 0),
            participant("alive_ct", Team::CounterTerrorists, true, 0),
        ];
        let mut state = MatchState::new();
        boundary(&mut state, 10);

        let tick = build_tick(&world, &mut state);
        let names: Vec<_> = tick.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alive_t", "alive_ct"]);
    }

    #[test]
    fn adr_uses_rounds_played() {
        let mut world = world_at(10);
        world.participants = vec![participant("a", Team::Terrorists, true, 40)];
        let mut state = MatchState::new();

        boundary(&mut state, 10);
        assert_eq!(build_tick(&world, &mut state).players[0].adr, 40.0);

        world.rounds_played = 2;
        world.tick = 11;
        boundary(&mut state, 11);
        assert_eq!(build_tick(&world, &mut state).players[0].adr, 20.0);
    }

    #[test]
    fn player_fields_are_copied_from_the_participant() {
        let mut world = world_at(3);
        world.participants = vec![Participant {
            steam_id: 76561198000000042,
            name: "carol".to_owned(),
            clan: "[abc]".to_owned(),
            team: Team::CounterTerrorists,
            is_alive: true,
            health: 73,
            money: 4150,
            armor: 98,
            has_helmet: true,
            has_defuse_kit: true,
            position: Vec3::new(1.0, 2.0, 3.0),
            view_x: 90.0,
            view_y: -5.0,
            active_weapon: None,
            is_ducking: true,
            is_defusing: true,
            ..Default::default()
        }];
        let mut state = MatchState::new();
        boundary(&mut state, 3);

        let player = &build_tick(&world, &mut state).players[0];
        assert_eq!(player.steam_id, 76561198000000042);
        assert_eq!(player.clan, "[abc]");
        assert_eq!(player.health, 73);
        assert_eq!(player.money, 4150);
        assert_eq!((player.x, player.y, player.z), (1.0, 2.0, 3.0));
        assert_eq!(player.view_x, 90.0);
        assert_eq!(player.active_item, "");
        assert!(player.helmet && player.kit && player.is_ducking && player.is_defusing);
        assert!(!player.is_planting);
    }

    #[test]
    fn dying_inferno_is_still_emitted() {
        let mut world = world_at(5);
        world.infernos = vec![
            InfernoState {
                id: 1,
                fires: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)],
            },
            InfernoState {
                id: 2,
                fires: Vec::new(),
            },
        ];
        let mut state = MatchState::new();
        boundary(&mut state, 5);

        let tick = build_tick(&world, &mut state);
        assert_eq!(tick.infernos.len(), 2);
        assert_eq!(tick.infernos[0].fires.len(), 2);
        assert!(tick.infernos[1].fires.is_empty());
    }

    #[test]
    fn bomb_merges_world_position_with_persistent_flags() {
        let mut world = world_at(5);
        world.bomb = BombObject {
            carrier: Some("dave".to_owned()),
            position: Vec3::new(10.0, 20.0, 30.0),
        };
        let mut state = MatchState::new();
        state.on_bomb_planted("erin");
        boundary(&mut state, 5);

        let bomb = build_tick(&world, &mut state).bomb;
        assert_eq!(bomb.carrier, "dave");
        assert_eq!((bomb.x, bomb.y, bomb.z), (10.0, 20.0, 30.0));
        assert!(bomb.planted);
        assert_eq!(bomb.planted_by, "erin");
        // Persistent state keeps the flags for the next snapshot.
        assert!(state.bomb().planted);
    }

    #[test]
    fn transient_events_and_flags_are_consumed() {
        let mut world = world_at(8);
        world.team_t = TeamState {
            name: "Alpha".to_owned(),
            score: 3,
        };
        world.team_ct = TeamState {
            name: "Bravo".to_owned(),
            score: 5,
        };
        let mut state = MatchState::new();
        state.on_round_start();
        state.on_side_switch();
        state.on_kill(Kill::attributed(Some("a"), Some("b"), "deagle", true, 0));
        state.on_weapon_fire(11);
        state.on_grenade_trigger(NadeEvent::new(NadeEventKind::SmokeStart, Vec3::default()));
        boundary(&mut state, 8);

        let tick = build_tick(&world, &mut state);
        assert!(tick.round_started);
        assert!(tick.team_side_switch);
        assert_eq!(tick.kills.len(), 1);
        assert_eq!(tick.shooting_events, vec![11]);
        assert_eq!(tick.nade_event.unwrap().kind, NadeEventKind::SmokeStart);
        assert_eq!((tick.team_t.as_str(), tick.t_wins), ("Alpha", 3));
        assert_eq!((tick.team_ct.as_str(), tick.ct_wins), ("Bravo", 5));

        world.tick = 9;
        boundary(&mut state, 9);
        let next = build_tick(&world, &mut state);
        assert!(!next.round_started);
        assert!(!next.team_side_switch);
        assert!(next.kills.is_empty());
        assert!(next.shooting_events.is_empty());
        assert!(next.nade_event.is_none());
    }

    #[test]
    fn projectiles_become_nades() {
        let mut world = world_at(4);
        world.projectiles = vec![Projectile {
            id: 77,
            weapon: "Molotov".to_owned(),
            position: Vec3::new(5.0, 6.0, 7.0),
            owner_team: Team::Terrorists,
        }];
        let mut state = MatchState::new();
        boundary(&mut state, 4);

        let nades = build_tick(&world, &mut state).nades;
        assert_eq!(nades.len(), 1);
        assert_eq!(nades[0].id, 77);
        assert_eq!(nades[0].kind, "Molotov");
        assert_eq!(nades[0].team, Team::Terrorists);
    }
}
