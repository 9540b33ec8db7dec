//! Pure derivation of a renderable view from `{room, session, identity}`.
//!
//! Nothing here performs I/O or keeps state between calls; the view is
//! recomputed from scratch whenever any input changes.

pub mod cards;
pub mod log_feed;
pub mod seats;
pub mod turn;


use std::ops::RangeInclusive;

pub use cards::{
    combo_legality, group_cards, validate_combo, CardGroup, ComboDraft, ComboError,
    ComboLegality, ComboMode,
};
pub use log_feed::{build_log_feed, LogFeedInput, LogLine, SenderLabel, DEFAULT_LOG_LIMIT};
pub use seats::{opponents_of, seat_anchors, SeatAnchor, TableGeometry};
pub use turn::{holdem_turn, kittens_turn, TurnState};

use tracing::warn;

use crate::domain::{LocalIdentity, Membership, Room, RoomId, Session, SessionStatus, UserId};
use crate::snapshot::{
    CatCard, Chips, GameSnapshot, HoldemSnapshot, KittensSnapshot, LogEntry, Street,
};

const LOG_TARGET: &str = "view";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfig {
    pub geometry: TableGeometry,
    pub log_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            geometry: TableGeometry::default(),
            log_limit: DEFAULT_LOG_LIMIT,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub room_id: RoomId,
    pub is_host: bool,
    pub membership: Membership,
    /// The viewer is seated in the current match, not just signed in.
    pub is_participant: bool,
    pub session_status: Option<SessionStatus>,
    pub started: bool,
    pub table: Option<TableView>,
    /// Set when the session carries a snapshot this client cannot decode.
    pub snapshot_error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableView {
    Kittens(KittensView),
    Holdem(HoldemView),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandCard {
    pub card: CatCard,
    pub count: usize,
    pub playable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KittensSeat {
    pub player_id: UserId,
    pub name: SenderLabel,
    pub alive: bool,
    pub card_count: usize,
    pub is_current: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KittensView {
    pub turn: TurnState,
    pub seats: Vec<SeatAnchor>,
    pub opponents: Vec<KittensSeat>,
    pub me: Option<KittensSeat>,
    pub hand: Vec<HandCard>,
    pub combos: Vec<ComboLegality>,
    pub combo_seed: Option<ComboDraft>,
    pub alive_opponents: Vec<UserId>,
    pub must_defuse: bool,
    pub deck_count: u32,
    pub discard_top: Option<CatCard>,
    pub pending_draws: u32,
    pub logs: Vec<LogLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoldemSeat {
    pub player_id: UserId,
    pub name: SenderLabel,
    pub chips: Chips,
    pub bet: Chips,
    pub folded: bool,
    pub all_in: bool,
    pub is_dealer: bool,
    pub is_current: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HoldemView {
    pub turn: TurnState,
    pub seats: Vec<SeatAnchor>,
    pub opponents: Vec<HoldemSeat>,
    pub me: Option<HoldemSeat>,
    pub hole_cards: Vec<String>,
    pub community_cards: Vec<String>,
    pub stage: Street,
    pub pot: Chips,
    pub call_amount: Chips,
    pub can_check: bool,
    pub raise_to: Option<RangeInclusive<Chips>>,
    pub logs: Vec<LogLine>,
}

/// Derive the full view model. Deterministic in its inputs.
pub fn derive_view(
    room: &Room,
    session: Option<&Session>,
    identity: Option<&LocalIdentity>,
    config: &ViewConfig,
) -> ViewModel {
    let me = identity.map(|i| &i.user_id);
    let mut view = ViewModel {
        room_id: room.id.clone(),
        is_host: me.is_some_and(|id| room.is_hosted_by(id)),
        membership: Membership::for_identity(identity),
        is_participant: false,
        session_status: session.map(|s| s.status),
        started: session.is_some_and(|s| s.has_started()),
        table: None,
        snapshot_error: None,
    };

    let Some(session) = session else {
        return view;
    };
    let snapshot = match GameSnapshot::extract(session) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return view,
        Err(err) => {
            warn!(target: LOG_TARGET, room_id = %room.id, error = %err, "undecodable session snapshot");
            view.snapshot_error = Some(err.to_string());
            return view;
        }
    };

    view.is_participant = me.is_some_and(|id| snapshot.is_participant(id));
    let ctx = DeriveContext {
        room,
        me,
        participant: view.is_participant,
        active: session.is_active(),
        config,
    };
    view.table = Some(match &snapshot {
        GameSnapshot::Kittens(s) => TableView::Kittens(ctx.kittens(s)),
        GameSnapshot::Holdem(s) => TableView::Holdem(ctx.holdem(s)),
    });
    view
}

struct DeriveContext<'a> {
    room: &'a Room,
    me: Option<&'a UserId>,
    participant: bool,
    active: bool,
    config: &'a ViewConfig,
}

impl DeriveContext<'_> {
    fn label(&self, id: &UserId, snapshot_name: Option<&str>) -> SenderLabel {
        snapshot_name
            .or_else(|| self.room.member_name(id))
            .map(|name| SenderLabel::Named(name.to_string()))
            .unwrap_or(if self.me == Some(id) {
                SenderLabel::You
            } else {
                SenderLabel::Unknown
            })
    }

    fn logs(&self, entries: &[LogEntry], roster: &dyn Fn(&UserId) -> Option<String>) -> Vec<LogLine> {
        build_log_feed(LogFeedInput {
            entries,
            viewer: self.me,
            viewer_is_participant: self.participant,
            roster,
            limit: self.config.log_limit,
        })
    }

    fn kittens(&self, s: &KittensSnapshot) -> KittensView {
        let turn = kittens_turn(s, self.me, self.active);
        let current = s.current_player();
        let seat = |id: &UserId| {
            let player = s.player(id);
            KittensSeat {
                player_id: id.clone(),
                name: self.label(id, player.and_then(|p| p.display_name.as_deref())),
                alive: player.is_some_and(|p| p.alive),
                card_count: player.map(|p| p.hand.len()).unwrap_or(0),
                is_current: current == Some(id),
            }
        };

        let opponent_ids = opponents_of(&s.player_order, self.me);
        let alive_opponents: Vec<UserId> = opponent_ids
            .iter()
            .filter(|id| s.is_alive(id))
            .cloned()
            .collect();

        let my_hand = self
            .me
            .and_then(|id| s.player(id))
            .map(|p| p.hand.as_slice())
            .unwrap_or(&[]);
        let groups = group_cards(my_hand);
        let combos = combo_legality(&groups, alive_opponents.len());
        let must_defuse = self.active && self.me.is_some() && s.pending_defuse.as_ref() == self.me;

        let hand = groups
            .iter()
            .map(|g| HandCard {
                card: g.card,
                count: g.count,
                playable: kittens_card_playable(g.card, &turn, must_defuse, &alive_opponents, &combos),
            })
            .collect();
        let combo_seed = turn
            .can_act
            .then(|| combos.iter().find_map(|c| ComboDraft::seed(c, &alive_opponents)))
            .flatten();

        let roster = |id: &UserId| {
            s.player(id)
                .and_then(|p| p.display_name.clone())
                .or_else(|| self.room.member_name(id).map(str::to_string))
        };

        KittensView {
            seats: seat_anchors(&opponent_ids, &self.config.geometry),
            opponents: opponent_ids.iter().map(|id| seat(id)).collect(),
            me: self.me.filter(|id| s.player_order.contains(id)).map(|id| seat(id)),
            hand,
            combos,
            combo_seed,
            alive_opponents,
            must_defuse,
            deck_count: s.deck_count,
            discard_top: s.discard_pile.last().copied(),
            pending_draws: s.pending_draws,
            logs: self.logs(&s.logs, &roster),
            turn,
        }
    }

    fn holdem(&self, s: &HoldemSnapshot) -> HoldemView {
        let turn = holdem_turn(s, self.me, self.active);
        let current = s.current_player();
        let dealer = s.player_order.get(s.dealer_index);
        let seat = |id: &UserId| {
            let player = s.player(id);
            HoldemSeat {
                player_id: id.clone(),
                name: self.label(id, player.and_then(|p| p.display_name.as_deref())),
                chips: player.map(|p| p.chips).unwrap_or(0),
                bet: player.map(|p| p.bet).unwrap_or(0),
                folded: player.is_some_and(|p| p.folded),
                all_in: player.is_some_and(|p| p.all_in),
                is_dealer: dealer == Some(id),
                is_current: current == Some(id),
            }
        };
        let opponent_ids = opponents_of(&s.player_order, self.me);
        let mine = self.me.and_then(|id| s.player(id));

        let my_bet = mine.map(|p| p.bet).unwrap_or(0);
        let call_amount = s.current_bet.saturating_sub(my_bet);
        let raise_to = mine.filter(|_| turn.can_act).and_then(|p| {
            let max = p.chips.saturating_add(p.bet);
            let min = s.current_bet.saturating_add(s.min_raise.max(1)).min(max);
            (max > s.current_bet).then_some(min..=max)
        });

        let roster = |id: &UserId| {
            s.player(id)
                .and_then(|p| p.display_name.clone())
                .or_else(|| self.room.member_name(id).map(str::to_string))
        };

        HoldemView {
            seats: seat_anchors(&opponent_ids, &self.config.geometry),
            opponents: opponent_ids.iter().map(|id| seat(id)).collect(),
            me: self.me.filter(|id| s.player_order.contains(id)).map(|id| seat(id)),
            hole_cards: mine.map(|p| p.hole_cards.clone()).unwrap_or_default(),
            community_cards: s.community_cards.clone(),
            stage: s.stage,
            pot: s.pot,
            call_amount: if turn.can_act { call_amount } else { 0 },
            can_check: turn.can_act && call_amount == 0,
            raise_to,
            logs: self.logs(&s.logs, &roster),
            turn,
        }
    }
}

fn kittens_card_playable(
    card: CatCard,
    turn: &TurnState,
    must_defuse: bool,
    alive_opponents: &[UserId],
    combos: &[ComboLegality],
) -> bool {
    if must_defuse {
        return card == CatCard::Defuse;
    }
    if !turn.can_act {
        return false;
    }
    match card {
        CatCard::Attack | CatCard::Skip | CatCard::Shuffle | CatCard::SeeTheFuture => true,
        CatCard::Favor => !alive_opponents.is_empty(),
        c if c.is_combinable() => combos.iter().any(|l| l.card == c && (l.pair || l.trio)),
        _ => false,
    }
}
