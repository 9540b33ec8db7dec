use std::fmt;

use serde_json::{json, Map, Value};

use crate::domain::{RoomId, UserId};
use crate::realtime::{outbound, ActionCompletion};
use crate::snapshot::{CatCard, Chips};
use crate::view::ComboMode;

/// What the busy flag remembers about the outstanding action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionTag {
    Draw,
    PlayAction,
    PlayFavor,
    PlaySeeFuture,
    PlayCatCombo,
    PlayDefuse,
    PostHistoryNote,
    HoldemAction,
    HoldemHistoryNote,
}

impl ActionTag {
    /// Completion notice the server sends once this action is applied.
    pub fn completion(self) -> ActionCompletion {
        match self {
            ActionTag::Draw => ActionCompletion::Drawn,
            ActionTag::PlayAction => ActionCompletion::ActionPlayed,
            ActionTag::PlayFavor => ActionCompletion::FavorPlayed,
            ActionTag::PlaySeeFuture => ActionCompletion::SeeFuturePlayed,
            ActionTag::PlayCatCombo => ActionCompletion::CatComboPlayed,
            ActionTag::PlayDefuse => ActionCompletion::DefusePlayed,
            ActionTag::PostHistoryNote => ActionCompletion::HistoryNoteAdded,
            ActionTag::HoldemAction => ActionCompletion::HoldemActionPerformed,
            ActionTag::HoldemHistoryNote => ActionCompletion::HoldemNoteAdded,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionTag::Draw => "draw",
            ActionTag::PlayAction => "play-action",
            ActionTag::PlayFavor => "play-favor",
            ActionTag::PlaySeeFuture => "play-see-future",
            ActionTag::PlayCatCombo => "play-cat-combo",
            ActionTag::PlayDefuse => "play-defuse",
            ActionTag::PostHistoryNote => "post-history-note",
            ActionTag::HoldemAction => "holdem-action",
            ActionTag::HoldemHistoryNote => "holdem-history-note",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldemMove {
    Fold,
    Check,
    Call,
    /// Raise so that my total bet this street becomes `to`.
    Raise { to: Chips },
    AllIn,
}

impl HoldemMove {
    fn name(self) -> &'static str {
        match self {
            HoldemMove::Fold => "fold",
            HoldemMove::Check => "check",
            HoldemMove::Call => "call",
            HoldemMove::Raise { .. } => "raise",
            HoldemMove::AllIn => "all_in",
        }
    }
}

/// A user-initiated request to change game state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionIntent {
    Draw,
    /// Attack, skip or shuffle.
    PlayAction { card: CatCard },
    PlayFavor { target: UserId },
    PlaySeeFuture,
    PlayCatCombo {
        card: CatCard,
        mode: ComboMode,
        target: UserId,
        desired_card: Option<CatCard>,
    },
    /// Put the exploding cat back at `position` from the top of the deck.
    PlayDefuse { position: u32 },
    PostHistoryNote { message: String },
    Holdem(HoldemMove),
    HoldemHistoryNote { message: String },
}

impl ActionIntent {
    pub fn tag(&self) -> ActionTag {
        match self {
            ActionIntent::Draw => ActionTag::Draw,
            ActionIntent::PlayAction { .. } => ActionTag::PlayAction,
            ActionIntent::PlayFavor { .. } => ActionTag::PlayFavor,
            ActionIntent::PlaySeeFuture => ActionTag::PlaySeeFuture,
            ActionIntent::PlayCatCombo { .. } => ActionTag::PlayCatCombo,
            ActionIntent::PlayDefuse { .. } => ActionTag::PlayDefuse,
            ActionIntent::PostHistoryNote { .. } => ActionTag::PostHistoryNote,
            ActionIntent::Holdem(_) => ActionTag::HoldemAction,
            ActionIntent::HoldemHistoryNote { .. } => ActionTag::HoldemHistoryNote,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self.tag() {
            ActionTag::Draw => outbound::DRAW,
            ActionTag::PlayAction => outbound::PLAY_ACTION,
            ActionTag::PlayFavor => outbound::PLAY_FAVOR,
            ActionTag::PlaySeeFuture => outbound::PLAY_SEE_FUTURE,
            ActionTag::PlayCatCombo => outbound::PLAY_CAT_COMBO,
            ActionTag::PlayDefuse => outbound::PLAY_DEFUSE,
            ActionTag::PostHistoryNote => outbound::POST_HISTORY_NOTE,
            ActionTag::HoldemAction => outbound::HOLDEM_ACTION,
            ActionTag::HoldemHistoryNote => outbound::HOLDEM_HISTORY_NOTE,
        }
    }

    fn body(&self) -> Value {
        match self {
            ActionIntent::Draw | ActionIntent::PlaySeeFuture => json!({}),
            ActionIntent::PlayAction { card } => json!({ "card": card }),
            ActionIntent::PlayFavor { target } => json!({ "targetPlayerId": target }),
            ActionIntent::PlayCatCombo {
                card,
                mode,
                target,
                desired_card,
            } => {
                let mut body = json!({ "cat": card, "mode": mode, "targetPlayerId": target });
                if let Some(desired) = desired_card {
                    body["desiredCard"] = json!(desired);
                }
                body
            }
            ActionIntent::PlayDefuse { position } => json!({ "position": position }),
            ActionIntent::PostHistoryNote { message } | ActionIntent::HoldemHistoryNote { message } => {
                json!({ "message": message })
            }
            ActionIntent::Holdem(action) => match action {
                HoldemMove::Raise { to } => json!({ "action": action.name(), "amount": to }),
                _ => json!({ "action": action.name() }),
            },
        }
    }

    /// Outbound payload: `{roomId, userId, ...}`.
    pub fn payload(&self, room_id: &RoomId, user_id: &UserId) -> Value {
        let mut object = Map::new();
        object.insert("roomId".into(), json!(room_id));
        object.insert("userId".into(), json!(user_id));
        if let Value::Object(body) = self.body() {
            object.extend(body);
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (RoomId, UserId) {
        (RoomId::new("r1"), UserId::new("u1"))
    }

    #[test]
    fn payloads_carry_room_and_user() {
        let (room, user) = ids();
        assert_eq!(
            ActionIntent::Draw.payload(&room, &user),
            json!({ "roomId": "r1", "userId": "u1" })
        );
        assert_eq!(
            ActionIntent::PlayAction { card: CatCard::Attack }.payload(&room, &user),
            json!({ "roomId": "r1", "userId": "u1", "card": "attack" })
        );
    }

    #[test]
    fn combo_payload_includes_desired_card_for_trio_only() {
        let (room, user) = ids();
        let pair = ActionIntent::PlayCatCombo {
            card: CatCard::Tacocat,
            mode: ComboMode::Pair,
            target: UserId::new("u2"),
            desired_card: None,
        };
        assert_eq!(
            pair.payload(&room, &user),
            json!({ "roomId": "r1", "userId": "u1", "cat": "tacocat", "mode": "pair", "targetPlayerId": "u2" })
        );
        let trio = ActionIntent::PlayCatCombo {
            card: CatCard::Tacocat,
            mode: ComboMode::Trio,
            target: UserId::new("u2"),
            desired_card: Some(CatCard::Defuse),
        };
        assert_eq!(trio.payload(&room, &user)["desiredCard"], json!("defuse"));
    }

    #[test]
    fn holdem_moves_share_one_event() {
        let (room, user) = ids();
        let raise = ActionIntent::Holdem(HoldemMove::Raise { to: 40 });
        assert_eq!(raise.event_name(), outbound::HOLDEM_ACTION);
        assert_eq!(
            raise.payload(&room, &user),
            json!({ "roomId": "r1", "userId": "u1", "action": "raise", "amount": 40 })
        );
        assert_eq!(ActionIntent::Holdem(HoldemMove::AllIn).payload(&room, &user)["action"], "all_in");
    }

    #[test]
    fn every_tag_has_a_matching_completion() {
        assert_eq!(ActionTag::HoldemAction.completion(), ActionCompletion::HoldemActionPerformed);
        assert_eq!(ActionTag::Draw.to_string(), "draw");
    }
}
