//! Canonical `{room, session}` for one room screen, fed by REST fetches and
//! the live channel.


use std::sync::{Arc, Weak};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RoomsApi};
use crate::dispatch::GameIntegration;
use crate::domain::{EngineTag, LocalIdentity, Room, RoomId, Session};
use crate::messages::{resolve_exception_message, MessageCatalog};
use crate::presenter::{Alert, ConfirmPrompt, Navigation, Presenter};
use crate::realtime::{InboundEvent, RealtimeChannel};
use crate::view::{derive_view, ViewConfig, ViewModel};

const LOG_TARGET: &str = "controller";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// First paint of the screen.
    Initial,
    /// Focus regained; the channel may have dropped while backgrounded.
    Refresh,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoomState {
    pub room: Option<Room>,
    pub session: Option<Session>,
    /// Set when the room itself could not be loaded.
    pub error: Option<String>,
    pub loading: bool,
    pub refreshing: bool,
}

/// Fetch that has been claimed but not yet run. Holds no borrow of the
/// controller so the channel can keep being served meanwhile.
pub struct PendingFetch {
    api: Arc<dyn RoomsApi>,
    room_id: RoomId,
    mode: FetchMode,
}

pub struct FetchOutcome {
    mode: FetchMode,
    room: Result<Room, ApiError>,
    /// Not attempted when the room lookup failed.
    session: Option<Result<Option<Session>, ApiError>>,
}

impl PendingFetch {
    pub async fn run(self) -> FetchOutcome {
        let room = self.api.fetch_room(&self.room_id).await;
        let session = match room {
            Ok(_) => Some(self.api.fetch_session(&self.room_id).await),
            Err(_) => None,
        };
        FetchOutcome {
            mode: self.mode,
            room,
            session,
        }
    }
}

pub struct RoomSessionController {
    room_id: RoomId,
    identity: Option<LocalIdentity>,
    api: Arc<dyn RoomsApi>,
    presenter: Arc<dyn Presenter>,
    catalog: Arc<dyn MessageCatalog>,
    integration: Option<Weak<dyn GameIntegration>>,
    state: RoomState,
    deleting: bool,
    departed: bool,
}

impl RoomSessionController {
    pub fn new(
        room_id: RoomId,
        identity: Option<LocalIdentity>,
        api: Arc<dyn RoomsApi>,
        presenter: Arc<dyn Presenter>,
        catalog: Arc<dyn MessageCatalog>,
    ) -> Self {
        Self {
            room_id,
            identity,
            api,
            presenter,
            catalog,
            integration: None,
            state: RoomState::default(),
            deleting: false,
            departed: false,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn identity(&self) -> Option<&LocalIdentity> {
        self.identity.as_ref()
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn room(&self) -> Option<&Room> {
        self.state.room.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    /// The screen navigated away (leave, delete or room removed).
    pub fn has_departed(&self) -> bool {
        self.departed
    }

    /// Hold a back-reference to the active game screen. The controller never
    /// keeps it alive.
    pub fn attach_integration(&mut self, integration: &Arc<dyn GameIntegration>) {
        self.integration = Some(Arc::downgrade(integration));
    }

    fn integration(&self) -> Option<Arc<dyn GameIntegration>> {
        self.integration.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_host(&self) -> bool {
        match (&self.state.room, &self.identity) {
            (Some(room), Some(identity)) => room.is_hosted_by(&identity.user_id),
            _ => false,
        }
    }

    fn matches(&self, room_id: &RoomId) -> bool {
        let ok = room_id == &self.room_id;
        if !ok {
            debug!(target: LOG_TARGET, current = %self.room_id, received = %room_id, "ignoring event for another room");
        }
        ok
    }

    fn in_flight(&mut self, mode: FetchMode) -> &mut bool {
        match mode {
            FetchMode::Initial => &mut self.state.loading,
            FetchMode::Refresh => &mut self.state.refreshing,
        }
    }

    /// Claim the in-flight flag for `mode`. `None` while a fetch of the same
    /// mode is still running; the other mode is unaffected.
    pub fn begin_fetch(&mut self, mode: FetchMode) -> Option<PendingFetch> {
        let flag = self.in_flight(mode);
        if *flag {
            debug!(target: LOG_TARGET, ?mode, "fetch already in flight");
            return None;
        }
        *flag = true;
        Some(PendingFetch {
            api: Arc::clone(&self.api),
            room_id: self.room_id.clone(),
            mode,
        })
    }

    pub fn complete_fetch(&mut self, outcome: FetchOutcome) {
        *self.in_flight(outcome.mode) = false;
        if self.departed {
            return;
        }
        match outcome.room {
            Err(err) => {
                warn!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "room fetch failed");
                self.state.room = None;
                self.state.session = None;
                self.state.error = Some(err.to_string());
            }
            Ok(room) => {
                if !self.matches(&room.id) {
                    return;
                }
                self.state.room = Some(room);
                self.state.error = None;
                match outcome.session {
                    Some(Ok(session)) => {
                        // Fetched state is not a terminal event, so pending
                        // actions on the game screen stay pending.
                        let session = session.filter(|s| self.matches(&s.room_id));
                        self.state.session = session;
                    }
                    Some(Err(err)) => {
                        // No session is the normal "not started" state.
                        debug!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "session fetch failed");
                        self.state.session = None;
                    }
                    None => {}
                }
            }
        }
    }

    /// Room lookup, then best-effort session lookup. Returns `false` when a
    /// fetch of the same mode was already running.
    pub async fn fetch_room(&mut self, mode: FetchMode) -> bool {
        let Some(pending) = self.begin_fetch(mode) else {
            return false;
        };
        let outcome = pending.run().await;
        self.complete_fetch(outcome);
        true
    }

    pub async fn on_focus(&mut self) -> bool {
        self.fetch_room(FetchMode::Refresh).await
    }

    fn replace_session(&mut self, session: Option<Session>) {
        let session = session.filter(|s| self.matches(&s.room_id));
        self.state.session = session;
        if let Some(integration) = self.integration() {
            integration.on_snapshot(self.state.session.as_ref());
        }
    }

    fn reset_integration(&self) {
        if let Some(integration) = self.integration() {
            integration.reset();
        }
    }

    /// Apply one live event. Returns `false` when it was ignored.
    pub async fn apply_event(&mut self, event: InboundEvent) -> bool {
        if self.departed {
            return false;
        }
        match event {
            InboundEvent::Attached { mode, room, session } => {
                if let Some(room) = room {
                    if !self.matches(&room.id) {
                        return false;
                    }
                    self.state.room = Some(room);
                    self.state.error = None;
                }
                if let Some(session) = session {
                    self.replace_session(session);
                }
                debug!(target: LOG_TARGET, room_id = %self.room_id, ?mode, "attached to room");
                true
            }
            InboundEvent::RoomUpdated(room) => {
                if !self.matches(&room.id) {
                    return false;
                }
                self.state.room = Some(room);
                true
            }
            InboundEvent::RoomDeleted { room_id } => {
                if !self.matches(&room_id) {
                    return false;
                }
                if self.deleting {
                    debug!(target: LOG_TARGET, room_id = %self.room_id, "room deletion initiated locally");
                    return false;
                }
                info!(target: LOG_TARGET, room_id = %self.room_id, "room deleted remotely");
                self.state.room = None;
                self.state.session = None;
                self.reset_integration();
                self.departed = true;
                self.presenter.blocking_alert(Alert::RoomDeleted).await;
                self.presenter.navigate(Navigation::Lobby);
                true
            }
            InboundEvent::SessionSnapshot { room_id, session } => {
                if !self.matches(&room_id) {
                    return false;
                }
                self.replace_session(session);
                true
            }
            InboundEvent::SessionStarted { room, session } => {
                if !self.matches(&room.id) || !self.matches(&session.room_id) {
                    return false;
                }
                self.apply_started(room, session);
                true
            }
            InboundEvent::ActionCompleted { room_id, completion } => {
                if room_id.as_ref().is_some_and(|id| !self.matches(id)) {
                    return false;
                }
                if let Some(integration) = self.integration() {
                    integration.on_action_completed(completion);
                }
                true
            }
            InboundEvent::Exception(exception) => {
                if exception.room_id.as_ref().is_some_and(|id| !self.matches(id)) {
                    return false;
                }
                if let Some(integration) = self.integration() {
                    integration.on_exception(&exception);
                }
                let message = resolve_exception_message(self.catalog.as_ref(), &exception);
                warn!(
                    target: LOG_TARGET,
                    room_id = %self.room_id,
                    code = exception.code.as_deref().unwrap_or("-"),
                    "server rejected request"
                );
                self.presenter.toast(message);
                true
            }
        }
    }

    fn apply_started(&mut self, room: Room, session: Session) {
        self.state.room = Some(room);
        self.state.session = Some(session);
        self.state.error = None;
        if let (Some(integration), Some(session)) = (self.integration(), self.state.session.as_ref()) {
            integration.on_started(session);
        }
    }

    fn require_identity(&self) -> bool {
        if self.identity.is_none() {
            self.presenter.alert(Alert::SignInRequired);
            return false;
        }
        true
    }

    pub async fn leave_room(&mut self) -> bool {
        if !self.require_identity() {
            return false;
        }
        if !self.presenter.confirm(ConfirmPrompt::LeaveRoom).await {
            return false;
        }
        self.state.session = None;
        self.reset_integration();
        match self.api.leave_room(&self.room_id).await {
            Ok(()) => {
                info!(target: LOG_TARGET, room_id = %self.room_id, "left room");
                self.departed = true;
                self.presenter.navigate(Navigation::Lobby);
                true
            }
            Err(err) => {
                warn!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "leave failed");
                self.presenter.alert(Alert::LeaveFailed(err.to_string()));
                false
            }
        }
    }

    /// Host only. A `room deleted` echo of our own request is suppressed.
    pub async fn delete_room(&mut self) -> bool {
        if !self.require_identity() {
            return false;
        }
        if !self.is_host() {
            debug!(target: LOG_TARGET, room_id = %self.room_id, "delete requested by non-host");
            return false;
        }
        if !self.presenter.confirm(ConfirmPrompt::DeleteRoom).await {
            return false;
        }
        self.deleting = true;
        self.state.session = None;
        self.reset_integration();
        match self.api.delete_room(&self.room_id).await {
            Ok(()) => {
                info!(target: LOG_TARGET, room_id = %self.room_id, "room deleted");
                self.state.room = None;
                self.departed = true;
                self.presenter.navigate(Navigation::Lobby);
                true
            }
            Err(err) => {
                warn!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "delete failed");
                self.deleting = false;
                self.presenter.alert(Alert::DeleteFailed(err.to_string()));
                false
            }
        }
    }

    /// Open the game screen when a match is running.
    pub fn view_game(&self) -> bool {
        match self.state.session.as_ref().filter(|s| s.has_started()) {
            Some(session) => {
                self.presenter.navigate(Navigation::Game {
                    room_id: self.room_id.clone(),
                    session_id: Some(session.id.clone()),
                });
                true
            }
            None => false,
        }
    }

    /// Host start over REST. Guarded by the integration's start flag when a
    /// game screen is attached.
    pub async fn start_match(&mut self, engine: EngineTag) -> bool {
        if !self.require_identity() || !self.is_host() {
            return false;
        }
        let integration = self.integration();
        if let Some(integration) = &integration {
            if let Err(err) = integration.dispatcher().try_begin_start(engine) {
                debug!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "start already pending");
                return false;
            }
        }
        match self.api.start_room(&self.room_id, engine).await {
            Ok(started) => {
                if !self.matches(&started.room.id) {
                    if let Some(integration) = &integration {
                        integration.dispatcher().settle_start("mismatched start reply");
                    }
                    return false;
                }
                info!(target: LOG_TARGET, room_id = %self.room_id, %engine, "match started");
                self.apply_started(started.room, started.session);
                true
            }
            Err(err) => {
                warn!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "start failed");
                if let Some(integration) = &integration {
                    integration.dispatcher().settle_start("start failed");
                }
                self.presenter.alert(Alert::StartFailed(err.to_string()));
                false
            }
        }
    }

    /// Current view, recomputed from scratch.
    pub fn view(&self, config: &ViewConfig) -> Option<ViewModel> {
        let room = self.state.room.as_ref()?;
        Some(derive_view(
            room,
            self.state.session.as_ref(),
            self.identity.as_ref(),
            config,
        ))
    }

    pub async fn run(&mut self, channel: &mut RealtimeChannel) {
        self.run_with(channel, |_| {}).await;
    }

    /// Serve `channel` until it closes or the screen departs. The initial
    /// fetch runs alongside; `on_change` sees the controller after every
    /// applied fetch or event.
    pub async fn run_with<F>(&mut self, channel: &mut RealtimeChannel, mut on_change: F)
    where
        F: FnMut(&Self),
    {
        if !self.matches(channel.room_id()) {
            warn!(target: LOG_TARGET, "channel belongs to another room");
            return;
        }
        let mode = if self.state.room.is_none() {
            FetchMode::Initial
        } else {
            FetchMode::Refresh
        };
        let mut fetches = FuturesUnordered::new();
        if let Some(pending) = self.begin_fetch(mode) {
            fetches.push(pending.run());
        }

        while !self.departed {
            tokio::select! {
                Some(outcome) = fetches.next(), if !fetches.is_empty() => {
                    self.complete_fetch(outcome);
                    on_change(&*self);
                }
                event = channel.next_event() => match event {
                    Some(event) => {
                        if self.apply_event(event).await {
                            on_change(&*self);
                        }
                    }
                    None => {
                        info!(target: LOG_TARGET, room_id = %self.room_id, "channel closed");
                        break;
                    }
                },
            }
        }
        channel.close();
    }
}
