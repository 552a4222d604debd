//! Event dispatch: one decoded event, one accumulator mutation.
//!
//! [`dispatch`] matches exhaustively on [`DemoEvent`], so adding an event
//! kind to the decoder boundary fails to compile until it is handled here.
//! Frame boundaries are not handled by the accumulator; they are reported
//! back to the caller as [`Dispatched::FrameDone`].

use tickstream_model::decoder::DemoEvent;
use tickstream_model::records::Kill;
use tickstream_state::accumulator::MatchState;

/// What the caller has to do after dispatching an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The event was folded into the accumulator.
    Accumulated,
    /// A frame ended; evaluate the boundary detector now.
    FrameDone,
}

/// Apply `event` to `state`.
pub fn dispatch(state: &mut MatchState, event: DemoEvent) -> Dispatched {
    match event {
        DemoEvent::Kill(kill) => state.on_kill(Kill::attributed(
            kill.killer.as_deref(),
            kill.victim.as_deref(),
            &kill.weapon,
            kill.is_headshot,
            kill.penetrated_objects,
        )),
        DemoEvent::WeaponFire { shooter } => state.on_weapon_fire(shooter),
        DemoEvent::GrenadeTrigger(nade) => state.on_grenade_trigger(nade),
        DemoEvent::RoundStart => state.on_round_start(),
        DemoEvent::BombPlanted { planter } => state.on_bomb_planted(&planter),
        DemoEvent::BombDefused { defuser } => state.on_bomb_defused(&defuser),
        DemoEvent::BombExploded => state.on_bomb_exploded(),
        DemoEvent::TeamSideSwitch => state.on_side_switch(),
        DemoEvent::FrameDone => return Dispatched::FrameDone,
    }
    Dispatched::Accumulated
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickstream_model::decoder::{KillEvent, Vec3};
    use tickstream_model::records::{NadeEvent, NadeEventKind};

    #[test]
    fn frame_done_is_reported_and_leaves_state_alone() {
        let mut state = MatchState::new();
        assert_eq!(dispatch(&mut state, DemoEvent::FrameDone), Dispatched::FrameDone);
        assert!(!state.has_pending_events());
        assert_eq!(state.last_emitted_tick(), None);
    }

    #[test]
    fn kill_without_attribution_becomes_unknown() {
        let mut state = MatchState::new();
        let outcome = dispatch(
            &mut state,
            DemoEvent::Kill(KillEvent {
                killer: None,
                victim: Some("bob".to_owned()),
                weapon: "World".to_owned(),
                is_headshot: false,
                penetrated_objects: 0,
            }),
        );
        assert_eq!(outcome, Dispatched::Accumulated);
        assert_eq!(state.pending_kills()[0].killer, Kill::UNKNOWN);
        assert_eq!(state.pending_kills()[0].victim, "bob");
    }

    #[test]
    fn every_accumulating_event_reaches_the_state() {
        let mut state = MatchState::new();
        let events = vec![
            DemoEvent::WeaponFire { shooter: 5 },
            DemoEvent::GrenadeTrigger(NadeEvent::new(NadeEventKind::HeExplode, Vec3::default())),
            DemoEvent::RoundStart,
            DemoEvent::BombPlanted { planter: "p".to_owned() },
            DemoEvent::BombDefused { defuser: "d".to_owned() },
            DemoEvent::BombExploded,
            DemoEvent::TeamSideSwitch,
        ];
        for event in events {
            assert_eq!(dispatch(&mut state, event), Dispatched::Accumulated);
        }

        assert_eq!(state.pending_fire_events(), &[5]);
        assert!(state.pending_nade_event().is_some());
        assert!(state.round_started());
        assert!(state.team_side_switch());
        assert_eq!(state.bomb().planted_by, "p");
        assert_eq!(state.bomb().defused_by, "d");
        assert!(state.bomb().exploded);
    }
}
