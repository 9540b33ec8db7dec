use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::domain::UserId;
use crate::snapshot::CatCard;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardGroup<C> {
    pub card: C,
    pub count: usize,
}

/// Collapse duplicates into `(card, count)` keeping first-occurrence order.
pub fn group_cards<C>(hand: &[C]) -> Vec<CardGroup<C>>
where
    C: Copy + Eq + Hash,
{
    let mut slots: HashMap<C, usize> = HashMap::new();
    let mut groups: Vec<CardGroup<C>> = Vec::new();
    for card in hand {
        match slots.get(card) {
            Some(&idx) => groups[idx].count += 1,
            None => {
                slots.insert(*card, groups.len());
                groups.push(CardGroup {
                    card: *card,
                    count: 1,
                });
            }
        }
    }
    groups
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboMode {
    Pair,
    Trio,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComboLegality {
    pub card: CatCard,
    pub count: usize,
    pub pair: bool,
    pub trio: bool,
}

impl ComboLegality {
    pub fn allows(&self, mode: ComboMode) -> bool {
        match mode {
            ComboMode::Pair => self.pair,
            ComboMode::Trio => self.trio,
        }
    }

    pub fn first_mode(&self) -> Option<ComboMode> {
        if self.pair {
            Some(ComboMode::Pair)
        } else if self.trio {
            Some(ComboMode::Trio)
        } else {
            None
        }
    }
}

pub fn combo_legality(groups: &[CardGroup<CatCard>], alive_opponents: usize) -> Vec<ComboLegality> {
    groups
        .iter()
        .filter(|g| g.card.is_combinable())
        .map(|g| ComboLegality {
            card: g.card,
            count: g.count,
            pair: g.count >= 2 && alive_opponents > 0,
            trio: g.count >= 3 && alive_opponents > 0,
        })
        .collect()
}

/// In-progress combo the user is editing. Kept apart from the legality
/// flags, which may change underneath it between snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComboDraft {
    pub card: CatCard,
    pub mode: ComboMode,
    pub target: Option<UserId>,
    /// Card requested from the target; trio mode only.
    pub desired_card: Option<CatCard>,
}

impl ComboDraft {
    /// Defaults: first eligible mode for `legality`, first alive opponent.
    pub fn seed(legality: &ComboLegality, alive_opponents: &[UserId]) -> Option<Self> {
        let mode = legality.first_mode()?;
        Some(Self {
            card: legality.card,
            mode,
            target: alive_opponents.first().cloned(),
            desired_card: None,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ComboError {
    #[error("{mode:?} with {card:?} is no longer allowed")]
    NotAllowed { card: CatCard, mode: ComboMode },
    #[error("a target player is required")]
    MissingTarget,
    #[error("target {0} is not an alive opponent")]
    InvalidTarget(UserId),
    #[error("trio requires naming a desired card")]
    MissingDesiredCard,
}

/// Confirm-time check of a draft against freshly derived legality.
pub fn validate_combo(
    draft: &ComboDraft,
    legality: &[ComboLegality],
    alive_opponents: &[UserId],
) -> Result<(), ComboError> {
    let allowed = legality
        .iter()
        .find(|l| l.card == draft.card)
        .is_some_and(|l| l.allows(draft.mode));
    if !allowed {
        return Err(ComboError::NotAllowed {
            card: draft.card,
            mode: draft.mode,
        });
    }
    let target = draft.target.as_ref().ok_or(ComboError::MissingTarget)?;
    if !alive_opponents.contains(target) {
        return Err(ComboError::InvalidTarget(target.clone()));
    }
    if draft.mode == ComboMode::Trio && draft.desired_card.is_none() {
        return Err(ComboError::MissingDesiredCard);
    }
    Ok(())
}
