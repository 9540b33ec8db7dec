use serde::{Deserialize, Serialize};

use super::log::LogEntry;
use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatCard {
    ExplodingCat,
    Defuse,
    Attack,
    Skip,
    Favor,
    Shuffle,
    SeeTheFuture,
    Nope,
    Tacocat,
    HairyPotatoCat,
    RainbowRalphingCat,
    BeardCat,
    Cattermelon,
    #[serde(other)]
    Unknown,
}

impl CatCard {
    /// Plain cat cards have no effect of their own and are only played as
    /// pairs or trios.
    pub fn is_combinable(self) -> bool {
        matches!(
            self,
            CatCard::Tacocat
                | CatCard::HairyPotatoCat
                | CatCard::RainbowRalphingCat
                | CatCard::BeardCat
                | CatCard::Cattermelon
        )
    }

    /// Cards sent through the generic play-action event.
    pub fn is_simple_action(self) -> bool {
        matches!(self, CatCard::Attack | CatCard::Skip | CatCard::Shuffle)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KittensPlayer {
    pub player_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub hand: Vec<CatCard>,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

fn default_alive() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KittensSnapshot {
    pub player_order: Vec<UserId>,
    pub current_turn_index: usize,
    #[serde(default)]
    pub players: Vec<KittensPlayer>,
    #[serde(default)]
    pub deck_count: u32,
    #[serde(default)]
    pub discard_pile: Vec<CatCard>,
    #[serde(default)]
    pub pending_draws: u32,
    #[serde(default)]
    pub pending_defuse: Option<UserId>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl KittensSnapshot {
    pub fn current_player(&self) -> Option<&UserId> {
        self.player_order.get(self.current_turn_index)
    }

    pub fn player(&self, id: &UserId) -> Option<&KittensPlayer> {
        self.players.iter().find(|p| &p.player_id == id)
    }

    pub fn is_alive(&self, id: &UserId) -> bool {
        self.player(id).map(|p| p.alive).unwrap_or(false)
    }
}
