//! Per-game front ends over the dispatcher. Each checks the freshly derived
//! view before sending so that buttons the view disables stay inert.

use parking_lot::Mutex;
use tracing::debug;

use super::dispatcher::{ActionDispatcher, DispatchOutcome};
use super::intent::{ActionIntent, HoldemMove};
use super::integration::GameIntegration;
use crate::domain::UserId;
use crate::snapshot::{CatCard, Chips};
use crate::view::{validate_combo, ComboDraft, ComboError, ComboMode, HoldemView, KittensView};

const LOG_TARGET: &str = "dispatch::tables";

fn not_eligible(action: &str) -> DispatchOutcome {
    debug!(target: LOG_TARGET, action, "action not allowed by current view");
    DispatchOutcome::NotEligible
}

pub struct KittensTable {
    dispatcher: ActionDispatcher,
    draft: Mutex<Option<ComboDraft>>,
}

impl KittensTable {
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self {
            dispatcher,
            draft: Mutex::new(None),
        }
    }

    fn playable(view: &KittensView, card: CatCard) -> bool {
        view.hand.iter().any(|h| h.card == card && h.playable)
    }

    pub fn draw(&self, view: &KittensView) -> DispatchOutcome {
        if !view.turn.can_draw || view.must_defuse {
            return not_eligible("draw");
        }
        self.dispatcher.dispatch(ActionIntent::Draw)
    }

    /// Attack, skip, shuffle or see-the-future.
    pub fn play_card(&self, view: &KittensView, card: CatCard) -> DispatchOutcome {
        if !Self::playable(view, card) {
            return not_eligible("play-card");
        }
        let intent = match card {
            CatCard::SeeTheFuture => ActionIntent::PlaySeeFuture,
            c if c.is_simple_action() => ActionIntent::PlayAction { card: c },
            _ => return not_eligible("play-card"),
        };
        self.dispatcher.dispatch(intent)
    }

    pub fn favor(&self, view: &KittensView, target: UserId) -> DispatchOutcome {
        if !Self::playable(view, CatCard::Favor) || !view.alive_opponents.contains(&target) {
            return not_eligible("play-favor");
        }
        self.dispatcher.dispatch(ActionIntent::PlayFavor { target })
    }

    pub fn defuse(&self, view: &KittensView, position: u32) -> DispatchOutcome {
        if !view.must_defuse {
            return not_eligible("play-defuse");
        }
        let position = position.min(view.deck_count);
        self.dispatcher.dispatch(ActionIntent::PlayDefuse { position })
    }

    pub fn post_note(&self, message: &str) -> DispatchOutcome {
        let message = message.trim();
        if message.is_empty() {
            return not_eligible("post-history-note");
        }
        self.dispatcher.dispatch(ActionIntent::PostHistoryNote {
            message: message.to_string(),
        })
    }

    pub fn combo_draft(&self) -> Option<ComboDraft> {
        self.draft.lock().clone()
    }

    /// Open the combo editor for `card`, seeded from the view's legality.
    pub fn begin_combo(&self, view: &KittensView, card: CatCard) -> Option<ComboDraft> {
        if !view.turn.can_act {
            return None;
        }
        let seeded = view
            .combos
            .iter()
            .find(|l| l.card == card)
            .and_then(|l| ComboDraft::seed(l, &view.alive_opponents));
        self.draft.lock().clone_from(&seeded);
        seeded
    }

    pub fn set_combo_mode(&self, mode: ComboMode) {
        if let Some(draft) = self.draft.lock().as_mut() {
            draft.mode = mode;
            if mode == ComboMode::Pair {
                draft.desired_card = None;
            }
        }
    }

    pub fn set_combo_target(&self, target: UserId) {
        if let Some(draft) = self.draft.lock().as_mut() {
            draft.target = Some(target);
        }
    }

    pub fn set_desired_card(&self, card: CatCard) {
        if let Some(draft) = self.draft.lock().as_mut() {
            draft.desired_card = Some(card);
        }
    }

    pub fn cancel_combo(&self) {
        self.draft.lock().take();
    }

    /// Re-validate the draft against `view` and send it. The draft survives a
    /// validation failure so the user can fix it.
    pub fn confirm_combo(&self, view: &KittensView) -> Result<DispatchOutcome, ComboError> {
        let mut slot = self.draft.lock();
        let Some(draft) = slot.as_ref() else {
            return Ok(not_eligible("play-cat-combo"));
        };
        if !view.turn.can_act {
            return Ok(not_eligible("play-cat-combo"));
        }
        validate_combo(draft, &view.combos, &view.alive_opponents)?;
        let Some(target) = draft.target.clone() else {
            return Err(ComboError::MissingTarget);
        };
        let intent = ActionIntent::PlayCatCombo {
            card: draft.card,
            mode: draft.mode,
            target,
            desired_card: draft.desired_card.filter(|_| draft.mode == ComboMode::Trio),
        };
        let outcome = self.dispatcher.dispatch(intent);
        if outcome == DispatchOutcome::Sent {
            slot.take();
        }
        Ok(outcome)
    }
}

impl GameIntegration for KittensTable {
    fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    fn reset(&self) {
        self.cancel_combo();
        self.dispatcher.clear_all("reset");
    }
}

pub struct HoldemTable {
    dispatcher: ActionDispatcher,
}

impl HoldemTable {
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self { dispatcher }
    }

    fn act(&self, view: &HoldemView, action: HoldemMove) -> DispatchOutcome {
        let allowed = view.turn.can_act
            && match action {
                HoldemMove::Fold | HoldemMove::AllIn => true,
                HoldemMove::Check => view.can_check,
                HoldemMove::Call => view.call_amount > 0,
                HoldemMove::Raise { to } => view.raise_to.as_ref().is_some_and(|r| r.contains(&to)),
            };
        if !allowed {
            return not_eligible("holdem-action");
        }
        self.dispatcher.dispatch(ActionIntent::Holdem(action))
    }

    pub fn fold(&self, view: &HoldemView) -> DispatchOutcome {
        self.act(view, HoldemMove::Fold)
    }

    pub fn check(&self, view: &HoldemView) -> DispatchOutcome {
        self.act(view, HoldemMove::Check)
    }

    pub fn call(&self, view: &HoldemView) -> DispatchOutcome {
        self.act(view, HoldemMove::Call)
    }

    pub fn raise_to(&self, view: &HoldemView, to: Chips) -> DispatchOutcome {
        self.act(view, HoldemMove::Raise { to })
    }

    pub fn all_in(&self, view: &HoldemView) -> DispatchOutcome {
        self.act(view, HoldemMove::AllIn)
    }

    pub fn post_note(&self, message: &str) -> DispatchOutcome {
        let message = message.trim();
        if message.is_empty() {
            return not_eligible("holdem-history-note");
        }
        self.dispatcher.dispatch(ActionIntent::HoldemHistoryNote {
            message: message.to_string(),
        })
    }

    /// Deal the next hand.
    pub fn start_hand(&self) -> DispatchOutcome {
        self.dispatcher.dispatch_start()
    }
}

impl GameIntegration for HoldemTable {
    fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }
}
