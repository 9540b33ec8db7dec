use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info, warn};

use super::busy::{BusyError, BusyState};
use super::intent::{ActionIntent, ActionTag};
use crate::domain::{EngineTag, LocalIdentity, RoomId};
use crate::presenter::{Alert, Presenter};
use crate::realtime::{outbound, EventChannel};

const LOG_TARGET: &str = "dispatch";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exactly one outbound message was queued.
    Sent,
    /// Another request is outstanding; nothing was sent.
    Busy,
    /// No local identity or room; the user was asked to sign in.
    SignInRequired,
    /// The current view does not allow this action.
    NotEligible,
    /// The transport refused the frame; the busy flag was released.
    Failed,
}

/// Single-flight gate in front of the shared event connection.
///
/// The flag set by [`ActionDispatcher::dispatch`] is never cleared on
/// success; it waits for a terminal server event routed through a
/// [`GameIntegration`](super::GameIntegration).
pub struct ActionDispatcher {
    room_id: RoomId,
    identity: Option<LocalIdentity>,
    channel: Arc<dyn EventChannel>,
    presenter: Arc<dyn Presenter>,
    busy: Mutex<BusyState<ActionTag>>,
    starting: Mutex<BusyState<EngineTag>>,
    stale_after: Option<Duration>,
}

impl ActionDispatcher {
    pub fn new(
        room_id: RoomId,
        identity: Option<LocalIdentity>,
        channel: Arc<dyn EventChannel>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            room_id,
            identity,
            channel,
            presenter,
            busy: Mutex::new(BusyState::Idle),
            starting: Mutex::new(BusyState::Idle),
            stale_after: None,
        }
    }

    /// Let a pending flag older than `threshold` stop blocking new actions.
    pub fn with_stale_after(mut self, threshold: Option<Duration>) -> Self {
        self.stale_after = threshold;
        self
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn identity(&self) -> Option<&LocalIdentity> {
        self.identity.as_ref()
    }

    pub fn pending(&self) -> Option<ActionTag> {
        self.busy.lock().pending().copied()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.lock().is_busy()
    }

    pub fn is_starting(&self) -> bool {
        self.starting.lock().is_busy()
    }

    fn signed_in(&self) -> Option<&LocalIdentity> {
        let identity = self.identity.as_ref().filter(|_| !self.room_id.is_empty());
        if identity.is_none() {
            debug!(target: LOG_TARGET, room_id = %self.room_id, "action without identity");
            self.presenter.alert(Alert::SignInRequired);
        }
        identity
    }

    fn begin<T>(&self, flag: &Mutex<BusyState<T>>, tag: T) -> Result<(), BusyError<T>>
    where
        T: Clone + std::fmt::Debug + std::fmt::Display,
    {
        let mut flag = flag.lock();
        let was_pending = flag.pending().cloned();
        flag.try_begin(tag, self.stale_after)?;
        if let Some(abandoned) = was_pending {
            warn!(target: LOG_TARGET, room_id = %self.room_id, %abandoned, "replacing stale pending request");
        }
        Ok(())
    }

    /// Send `intent` unless something is already in flight.
    pub fn dispatch(&self, intent: ActionIntent) -> DispatchOutcome {
        let Some(identity) = self.signed_in() else {
            return DispatchOutcome::SignInRequired;
        };
        let tag = intent.tag();
        if let Err(err) = self.begin(&self.busy, tag) {
            debug!(target: LOG_TARGET, room_id = %self.room_id, requested = %tag, error = %err, "action ignored");
            return DispatchOutcome::Busy;
        }

        let payload = intent.payload(&self.room_id, &identity.user_id);
        match self.channel.emit(intent.event_name(), payload) {
            Ok(()) => {
                info!(target: LOG_TARGET, room_id = %self.room_id, action = %tag, "action sent");
                DispatchOutcome::Sent
            }
            Err(err) => {
                // Nothing left the device, so no terminal event will come.
                self.busy.lock().clear();
                warn!(target: LOG_TARGET, room_id = %self.room_id, action = %tag, error = %err, "action emit failed");
                DispatchOutcome::Failed
            }
        }
    }

    /// Claim the start flag for a host-initiated start.
    pub fn try_begin_start(&self, engine: EngineTag) -> Result<(), BusyError<EngineTag>> {
        self.begin(&self.starting, engine)
    }

    /// Ask the server to deal the next hold'em hand over the live channel.
    pub fn dispatch_start(&self) -> DispatchOutcome {
        let Some(identity) = self.signed_in() else {
            return DispatchOutcome::SignInRequired;
        };
        if self.try_begin_start(EngineTag::TexasHoldem).is_err() {
            return DispatchOutcome::Busy;
        }
        let payload = json!({ "roomId": self.room_id, "userId": identity.user_id });
        match self.channel.emit(outbound::START_HOLDEM, payload) {
            Ok(()) => {
                info!(target: LOG_TARGET, room_id = %self.room_id, "start requested");
                DispatchOutcome::Sent
            }
            Err(err) => {
                self.starting.lock().clear();
                warn!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "start emit failed");
                DispatchOutcome::Failed
            }
        }
    }

    /// Release the action flag. Returns the tag that was pending.
    pub fn settle_action(&self, reason: &str) -> Option<ActionTag> {
        let cleared = self.busy.lock().clear();
        if let Some(tag) = cleared {
            debug!(target: LOG_TARGET, room_id = %self.room_id, action = %tag, reason, "action settled");
        }
        cleared
    }

    pub fn settle_start(&self, reason: &str) -> Option<EngineTag> {
        let cleared = self.starting.lock().clear();
        if let Some(engine) = cleared {
            debug!(target: LOG_TARGET, room_id = %self.room_id, %engine, reason, "start settled");
        }
        cleared
    }

    pub fn clear_all(&self, reason: &str) {
        self.settle_action(reason);
        self.settle_start(reason);
    }
}
