use crate::domain::UserId;
use crate::snapshot::{HoldemSnapshot, KittensSnapshot};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnState {
    pub current_player: Option<UserId>,
    pub is_my_turn: bool,
    /// Session active, my turn, and I am still in the game.
    pub can_act: bool,
    /// `can_act` and the engine is waiting on at least one draw.
    pub can_draw: bool,
}

pub fn kittens_turn(snapshot: &KittensSnapshot, me: Option<&UserId>, session_active: bool) -> TurnState {
    let current_player = snapshot.current_player().cloned();
    let is_my_turn = me.is_some() && current_player.as_ref() == me;
    let alive = me.is_some_and(|id| snapshot.is_alive(id));
    let can_act = session_active && is_my_turn && alive;
    TurnState {
        current_player,
        is_my_turn,
        can_act,
        can_draw: can_act && snapshot.pending_draws > 0,
    }
}

pub fn holdem_turn(snapshot: &HoldemSnapshot, me: Option<&UserId>, session_active: bool) -> TurnState {
    let current_player = snapshot.current_player().cloned();
    let is_my_turn = me.is_some() && current_player.as_ref() == me;
    let in_play = me
        .and_then(|id| snapshot.player(id))
        .is_some_and(|p| p.can_act());
    TurnState {
        current_player,
        is_my_turn,
        can_act: session_active && is_my_turn && in_play,
        can_draw: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::KittensPlayer;

    fn snapshot(turn: usize, pending_draws: u32, b_alive: bool) -> KittensSnapshot {
        KittensSnapshot {
            player_order: vec![UserId::new("a"), UserId::new("b")],
            current_turn_index: turn,
            players: vec![
                KittensPlayer {
                    player_id: UserId::new("a"),
                    display_name: None,
                    hand: vec![],
                    alive: true,
                },
                KittensPlayer {
                    player_id: UserId::new("b"),
                    display_name: None,
                    hand: vec![],
                    alive: b_alive,
                },
            ],
            deck_count: 10,
            discard_pile: vec![],
            pending_draws,
            pending_defuse: None,
            logs: vec![],
        }
    }

    #[test]
    fn draw_needs_turn_life_active_session_and_pending_draws() {
        let b = UserId::new("b");
        assert!(kittens_turn(&snapshot(1, 1, true), Some(&b), true).can_draw);
        assert!(!kittens_turn(&snapshot(1, 0, true), Some(&b), true).can_draw);
        assert!(!kittens_turn(&snapshot(1, 1, false), Some(&b), true).can_act);
        assert!(!kittens_turn(&snapshot(1, 1, true), Some(&b), false).can_act);
        assert!(!kittens_turn(&snapshot(0, 1, true), Some(&b), true).is_my_turn);
    }

    #[test]
    fn spectator_never_has_the_turn() {
        let state = kittens_turn(&snapshot(0, 1, true), None, true);
        assert_eq!(state.current_player, Some(UserId::new("a")));
        assert!(!state.is_my_turn);
        assert!(!state.can_act);
    }

    #[test]
    fn out_of_range_turn_index_has_no_current_player() {
        let state = kittens_turn(&snapshot(7, 1, true), Some(&UserId::new("a")), true);
        assert_eq!(state.current_player, None);
        assert!(!state.is_my_turn);
    }
}
