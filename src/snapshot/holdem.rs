use serde::{Deserialize, Serialize};

use super::log::LogEntry;
use crate::domain::UserId;

pub type Chips = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    #[serde(other)]
    Waiting,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldemPlayer {
    pub player_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub chips: Chips,
    #[serde(default)]
    pub bet: Chips,
    #[serde(default)]
    pub folded: bool,
    #[serde(default)]
    pub all_in: bool,
    /// Hidden cards arrive as an empty list for everyone but their owner.
    #[serde(default)]
    pub hole_cards: Vec<String>,
}

impl HoldemPlayer {
    pub fn can_act(&self) -> bool {
        !self.folded && !self.all_in
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldemSnapshot {
    pub player_order: Vec<UserId>,
    pub current_turn_index: usize,
    #[serde(default)]
    pub dealer_index: usize,
    #[serde(default)]
    pub players: Vec<HoldemPlayer>,
    #[serde(default)]
    pub community_cards: Vec<String>,
    #[serde(default)]
    pub pot: Chips,
    #[serde(default)]
    pub current_bet: Chips,
    #[serde(default)]
    pub min_raise: Chips,
    pub stage: Street,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl HoldemSnapshot {
    pub fn current_player(&self) -> Option<&UserId> {
        self.player_order.get(self.current_turn_index)
    }

    pub fn player(&self, id: &UserId) -> Option<&HoldemPlayer> {
        self.players.iter().find(|p| &p.player_id == id)
    }
}
