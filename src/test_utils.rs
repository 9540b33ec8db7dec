//! Fixtures and fakes shared across test modules.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;

use crate::api::{ApiError, CreateRoomRequest, JoinRoomRequest, ListRoomsQuery, RoomsApi, StartedRoom};
use crate::dispatch::ActionDispatcher;
use crate::domain::{
    EngineTag, LocalIdentity, Room, RoomId, RoomMember, RoomStatus, Session, SessionId,
    SessionStatus, UserId, Visibility,
};
use crate::presenter::{Alert, ConfirmPrompt, Navigation, Presenter};
use crate::realtime::InMemoryChannel;
use crate::snapshot::{
    CatCard, Chips, HoldemPlayer, HoldemSnapshot, KittensPlayer, KittensSnapshot, LogEntry,
    LogKind, LogScope, Street,
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn room(id: &str, host: &str, members: &[&str]) -> Room {
    Room {
        id: RoomId::new(id),
        host_id: UserId::new(host),
        name: Some(format!("room {id}")),
        game_type: EngineTag::ExplodingCats,
        visibility: Visibility::Public,
        max_players: 5,
        status: RoomStatus::Lobby,
        members: members
            .iter()
            .map(|m| RoomMember {
                user_id: UserId::new(*m),
                display_name: Some(m.to_uppercase()),
                joined_at: Some(base_time()),
            })
            .collect(),
        invite_code: None,
        created_at: Some(base_time()),
    }
}

pub fn log_entry(id: &str, minute: i64, scope: LogScope, sender: Option<&str>) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        kind: LogKind::Action,
        scope: Some(scope),
        sender_id: sender.map(UserId::new),
        sender_name: None,
        message: format!("entry {id}"),
        created_at: base_time() + Duration::minutes(minute),
    }
}

pub fn kittens_player(id: &str, hand: &[CatCard]) -> KittensPlayer {
    KittensPlayer {
        player_id: UserId::new(id),
        display_name: None,
        hand: hand.to_vec(),
        alive: true,
    }
}

pub fn kittens_snapshot(players: Vec<KittensPlayer>, turn: usize) -> KittensSnapshot {
    KittensSnapshot {
        player_order: players.iter().map(|p| p.player_id.clone()).collect(),
        current_turn_index: turn,
        players,
        deck_count: 20,
        discard_pile: vec![],
        pending_draws: 1,
        pending_defuse: None,
        logs: vec![],
    }
}

pub fn holdem_player(id: &str, chips: Chips, bet: Chips) -> HoldemPlayer {
    HoldemPlayer {
        player_id: UserId::new(id),
        display_name: None,
        chips,
        bet,
        folded: false,
        all_in: false,
        hole_cards: vec![],
    }
}

pub fn holdem_snapshot(players: Vec<HoldemPlayer>, turn: usize, current_bet: Chips, min_raise: Chips) -> HoldemSnapshot {
    HoldemSnapshot {
        player_order: players.iter().map(|p| p.player_id.clone()).collect(),
        current_turn_index: turn,
        dealer_index: 0,
        pot: players.iter().map(|p| p.bet).sum(),
        players,
        community_cards: vec![],
        current_bet,
        min_raise,
        stage: Street::Preflop,
        logs: vec![],
    }
}

fn session_for(room_id: &str, engine: EngineTag, snapshot: serde_json::Value) -> Session {
    Session {
        id: SessionId::new(format!("s-{room_id}")),
        room_id: RoomId::new(room_id),
        engine,
        status: SessionStatus::Active,
        state: Some(json!({ "snapshot": snapshot })),
    }
}

pub fn kittens_session(room_id: &str, snapshot: &KittensSnapshot) -> Session {
    session_for(room_id, EngineTag::ExplodingCats, serde_json::to_value(snapshot).unwrap())
}

pub fn holdem_session(room_id: &str, snapshot: &HoldemSnapshot) -> Session {
    session_for(room_id, EngineTag::TexasHoldem, serde_json::to_value(snapshot).unwrap())
}

/// A session row that exists but has no match running yet.
pub fn waiting_session(room_id: &str) -> Session {
    Session {
        id: SessionId::new(format!("s-{room_id}")),
        room_id: RoomId::new(room_id),
        engine: EngineTag::ExplodingCats,
        status: SessionStatus::Waiting,
        state: None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenterCall {
    Confirm(ConfirmPrompt),
    Alert(Alert),
    BlockingAlert(Alert),
    Toast(String),
    Navigate(Navigation),
}

pub struct RecordingPresenter {
    calls: Mutex<Vec<PresenterCall>>,
    confirm_answer: AtomicBool,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            confirm_answer: AtomicBool::new(true),
        })
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Alert(a) | PresenterCall::BlockingAlert(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> Vec<Navigation> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Navigate(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Toast(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn confirm(&self, prompt: ConfirmPrompt) -> bool {
        self.calls.lock().push(PresenterCall::Confirm(prompt));
        self.confirm_answer.load(Ordering::SeqCst)
    }

    fn alert(&self, alert: Alert) {
        self.calls.lock().push(PresenterCall::Alert(alert));
    }

    async fn blocking_alert(&self, alert: Alert) {
        self.calls.lock().push(PresenterCall::BlockingAlert(alert));
    }

    fn toast(&self, message: String) {
        self.calls.lock().push(PresenterCall::Toast(message));
    }

    fn navigate(&self, to: Navigation) {
        self.calls.lock().push(PresenterCall::Navigate(to));
    }
}

/// In-memory games service. Operations listed via [`FakeRoomsApi::fail`]
/// answer with HTTP 500.
#[derive(Default)]
pub struct FakeRoomsApi {
    rooms: Mutex<HashMap<RoomId, Room>>,
    sessions: Mutex<HashMap<RoomId, Session>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRoomsApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put_room(&self, room: Room) {
        self.rooms.lock().insert(room.id.clone(), room);
    }

    pub fn put_session(&self, session: Session) {
        self.sessions.lock().insert(session.room_id.clone(), session);
    }

    pub fn clear_session(&self, room_id: &str) {
        self.sessions.lock().remove(&RoomId::new(room_id));
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().remove(op);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn enter(&self, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().push(op);
        if self.failing.lock().contains(op) {
            return Err(ApiError::Http {
                status: 500,
                message: format!("{op} failed"),
            });
        }
        Ok(())
    }

    fn room_or_404(&self, room_id: &RoomId) -> Result<Room, ApiError> {
        self.rooms.lock().get(room_id).cloned().ok_or(ApiError::Http {
            status: 404,
            message: "Room not found".into(),
        })
    }
}

#[async_trait]
impl RoomsApi for FakeRoomsApi {
    async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room, ApiError> {
        self.enter("create")?;
        let id = format!("r{}", self.rooms.lock().len() + 1);
        let mut created = room(&id, "host", &["host"]);
        created.game_type = request.game_type;
        created.visibility = request.visibility;
        created.max_players = request.max_players;
        self.put_room(created.clone());
        Ok(created)
    }

    async fn list_rooms(&self, query: &ListRoomsQuery) -> Result<Vec<Room>, ApiError> {
        self.enter("list")?;
        let mut rooms: Vec<Room> = self
            .rooms
            .lock()
            .values()
            .filter(|r| query.game_type.map_or(true, |g| r.game_type == g))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(rooms)
    }

    async fn fetch_room(&self, room_id: &RoomId) -> Result<Room, ApiError> {
        self.enter("fetch_room")?;
        self.room_or_404(room_id)
    }

    async fn fetch_session(&self, room_id: &RoomId) -> Result<Option<Session>, ApiError> {
        self.enter("fetch_session")?;
        Ok(self.sessions.lock().get(room_id).cloned())
    }

    async fn join_room(&self, request: &JoinRoomRequest) -> Result<Room, ApiError> {
        self.enter("join")?;
        match request {
            JoinRoomRequest::ById { room_id } => self.room_or_404(room_id),
            JoinRoomRequest::ByInvite { invite_code } => self
                .rooms
                .lock()
                .values()
                .find(|r| r.invite_code.as_deref() == Some(invite_code.as_str()))
                .cloned()
                .ok_or(ApiError::Http {
                    status: 404,
                    message: "Invite code not found".into(),
                }),
        }
    }

    async fn leave_room(&self, _room_id: &RoomId) -> Result<(), ApiError> {
        self.enter("leave")
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), ApiError> {
        self.enter("delete")?;
        self.rooms.lock().remove(room_id);
        self.sessions.lock().remove(room_id);
        Ok(())
    }

    async fn start_room(&self, room_id: &RoomId, engine: EngineTag) -> Result<StartedRoom, ApiError> {
        self.enter("start")?;
        let mut room = self.room_or_404(room_id)?;
        room.status = RoomStatus::InProgress;
        let players: Vec<KittensPlayer> = room
            .members
            .iter()
            .map(|m| kittens_player(m.user_id.as_str(), &[CatCard::Defuse]))
            .collect();
        let mut session = kittens_session(room_id.as_str(), &kittens_snapshot(players, 0));
        session.engine = engine;
        self.put_room(room.clone());
        self.put_session(session.clone());
        Ok(StartedRoom { room, session })
    }
}

/// A dispatcher wired to an in-memory transport that is already connected.
pub fn dispatcher_for(
    room_id: &str,
    identity: Option<LocalIdentity>,
) -> (ActionDispatcher, Arc<InMemoryChannel>, Arc<RecordingPresenter>) {
    let channel = Arc::new(InMemoryChannel::new());
    channel.connect_now();
    let presenter = RecordingPresenter::new();
    let dispatcher = ActionDispatcher::new(RoomId::new(room_id), identity, channel.clone(), presenter.clone());
    (dispatcher, channel, presenter)
}
