//! Inbound event vocabulary and the demultiplexer that maps wire event names
//! onto it, plus the outbound event names.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::transport::ChannelError;
use crate::domain::{Room, RoomId, Session};

pub mod outbound {
    pub const JOIN: &str = "games:room:join";
    pub const WATCH: &str = "games:room:watch";
    pub const DRAW: &str = "games:session:draw";
    pub const PLAY_ACTION: &str = "games:session:play-action";
    pub const PLAY_FAVOR: &str = "games:session:play-favor";
    pub const PLAY_SEE_FUTURE: &str = "games:session:play-see-future";
    pub const PLAY_CAT_COMBO: &str = "games:session:play-cat-combo";
    pub const PLAY_DEFUSE: &str = "games:session:play-defuse";
    pub const POST_HISTORY_NOTE: &str = "games:session:post-history-note";
    pub const HOLDEM_ACTION: &str = "games:session:holdem-action";
    pub const HOLDEM_HISTORY_NOTE: &str = "games:session:holdem-history-note";
    pub const START_HOLDEM: &str = "games:session:start-holdem";
}

pub mod inbound {
    pub const JOINED: &str = "games:room:joined";
    pub const WATCHING: &str = "games:room:watching";
    pub const ROOM_UPDATED: &str = "games:room:updated";
    pub const ROOM_DELETED: &str = "games:room:deleted";
    pub const SESSION_SNAPSHOT: &str = "games:session:snapshot";
    pub const SESSION_STARTED: &str = "games:session:started";
    pub const EXCEPTION: &str = "games:exception";
}

/// Per-action completion notices. They carry no state; the new state always
/// arrives as a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionCompletion {
    Drawn,
    ActionPlayed,
    FavorPlayed,
    SeeFuturePlayed,
    CatComboPlayed,
    DefusePlayed,
    HistoryNoteAdded,
    HoldemActionPerformed,
    HoldemNoteAdded,
}

impl ActionCompletion {
    pub const ALL: [ActionCompletion; 9] = [
        ActionCompletion::Drawn,
        ActionCompletion::ActionPlayed,
        ActionCompletion::FavorPlayed,
        ActionCompletion::SeeFuturePlayed,
        ActionCompletion::CatComboPlayed,
        ActionCompletion::DefusePlayed,
        ActionCompletion::HistoryNoteAdded,
        ActionCompletion::HoldemActionPerformed,
        ActionCompletion::HoldemNoteAdded,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            ActionCompletion::Drawn => "games:session:drawn",
            ActionCompletion::ActionPlayed => "games:session:action-played",
            ActionCompletion::FavorPlayed => "games:session:favor-played",
            ActionCompletion::SeeFuturePlayed => "games:session:see-future-played",
            ActionCompletion::CatComboPlayed => "games:session:cat-combo-played",
            ActionCompletion::DefusePlayed => "games:session:defuse-played",
            ActionCompletion::HistoryNoteAdded => "games:session:history-note-added",
            ActionCompletion::HoldemActionPerformed => "games:session:holdem-action-performed",
            ActionCompletion::HoldemNoteAdded => "games:session:holdem-note-added",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.event_name() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachMode {
    Joined,
    Watching,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// Handshake answer. `session` is `None` when the key was absent and
    /// `Some(None)` when the server sent an explicit null.
    Attached {
        mode: AttachMode,
        room: Option<Room>,
        session: Option<Option<Session>>,
    },
    RoomUpdated(Room),
    RoomDeleted { room_id: RoomId },
    SessionSnapshot { room_id: RoomId, session: Option<Session> },
    SessionStarted { room: Room, session: Session },
    ActionCompleted { room_id: Option<RoomId>, completion: ActionCompletion },
    Exception(ExceptionPayload),
}

impl InboundEvent {
    /// Room the event is about, when it names one.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            InboundEvent::Attached { room, .. } => room.as_ref().map(|r| &r.id),
            InboundEvent::RoomUpdated(room) => Some(&room.id),
            InboundEvent::RoomDeleted { room_id } => Some(room_id),
            InboundEvent::SessionSnapshot { room_id, .. } => Some(room_id),
            InboundEvent::SessionStarted { room, .. } => Some(&room.id),
            InboundEvent::ActionCompleted { room_id, .. } => room_id.as_ref(),
            InboundEvent::Exception(exception) => exception.room_id.as_ref(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionPayload {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message_key: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomPayload {
    room: Room,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomIdPayload {
    room_id: RoomId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotPayload {
    room_id: RoomId,
    session: Option<Session>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartedPayload {
    room: Room,
    session: Session,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionPayload {
    #[serde(default)]
    room_id: Option<RoomId>,
}

fn parse<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, ChannelError> {
    serde_json::from_value(payload).map_err(|source| ChannelError::Payload {
        event: event.to_string(),
        source,
    })
}

fn parse_attached(event: &str, mode: AttachMode, payload: Value) -> Result<InboundEvent, ChannelError> {
    let room = match payload.get("room") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse::<Room>(event, value.clone())?),
    };
    let session = match payload.get("session") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(value) => Some(Some(parse::<Session>(event, value.clone())?)),
    };
    Ok(InboundEvent::Attached { mode, room, session })
}

/// Map a decrypted frame onto the event vocabulary. Unknown event names yield
/// `Ok(None)`.
pub fn decode_inbound(event: &str, payload: Value) -> Result<Option<InboundEvent>, ChannelError> {
    let decoded = match event {
        inbound::JOINED => parse_attached(event, AttachMode::Joined, payload)?,
        inbound::WATCHING => parse_attached(event, AttachMode::Watching, payload)?,
        inbound::ROOM_UPDATED => InboundEvent::RoomUpdated(parse::<RoomPayload>(event, payload)?.room),
        inbound::ROOM_DELETED => InboundEvent::RoomDeleted {
            room_id: parse::<RoomIdPayload>(event, payload)?.room_id,
        },
        inbound::SESSION_SNAPSHOT => {
            let SnapshotPayload { room_id, session } = parse(event, payload)?;
            InboundEvent::SessionSnapshot { room_id, session }
        }
        inbound::SESSION_STARTED => {
            let StartedPayload { room, session } = parse(event, payload)?;
            InboundEvent::SessionStarted { room, session }
        }
        inbound::EXCEPTION => InboundEvent::Exception(parse(event, payload)?),
        other => match ActionCompletion::from_event_name(other) {
            Some(completion) => InboundEvent::ActionCompleted {
                room_id: parse::<CompletionPayload>(event, payload)
                    .map(|p| p.room_id)
                    .unwrap_or(None),
                completion,
            },
            None => return Ok(None),
        },
    };
    Ok(Some(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn room_json(id: &str) -> Value {
        json!({
            "id": id, "hostId": "h", "gameType": "texas_holdem",
            "maxPlayers": 6, "status": "lobby", "members": []
        })
    }

    fn session_json(room: &str) -> Value {
        json!({ "id": "s1", "roomId": room, "engine": "texas_holdem", "status": "waiting", "state": null })
    }

    #[test]
    fn joined_distinguishes_missing_and_null_session() {
        let absent = decode_inbound(inbound::JOINED, json!({ "room": room_json("r1") }))
            .unwrap()
            .unwrap();
        let InboundEvent::Attached { session, room, mode } = absent else {
            panic!("expected attached");
        };
        assert_eq!(mode, AttachMode::Joined);
        assert!(room.is_some());
        assert_eq!(session, None);

        let null = decode_inbound(inbound::WATCHING, json!({ "session": null }))
            .unwrap()
            .unwrap();
        let InboundEvent::Attached { session, room, mode } = null else {
            panic!("expected attached");
        };
        assert_eq!(mode, AttachMode::Watching);
        assert!(room.is_none());
        assert_eq!(session, Some(None));
    }

    #[test]
    fn completion_events_map_by_name() {
        for completion in ActionCompletion::ALL {
            let event = decode_inbound(completion.event_name(), json!({ "roomId": "r1" }))
                .unwrap()
                .unwrap();
            assert_eq!(
                event,
                InboundEvent::ActionCompleted {
                    room_id: Some(RoomId::new("r1")),
                    completion
                }
            );
        }
    }

    #[test]
    fn completion_payload_shape_is_not_required() {
        let event = decode_inbound("games:session:drawn", json!("ok")).unwrap().unwrap();
        assert_eq!(event.room_id(), None);
    }

    #[test]
    fn session_events_carry_room_identity() {
        let snapshot = decode_inbound(
            inbound::SESSION_SNAPSHOT,
            json!({ "roomId": "r2", "session": session_json("r2") }),
        )
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.room_id(), Some(&RoomId::new("r2")));

        let started = decode_inbound(
            inbound::SESSION_STARTED,
            json!({ "room": room_json("r3"), "session": session_json("r3") }),
        )
        .unwrap()
        .unwrap();
        assert_eq!(started.room_id(), Some(&RoomId::new("r3")));
    }

    #[test]
    fn exceptions_keep_their_room_when_named() {
        let scoped = decode_inbound(
            inbound::EXCEPTION,
            json!({ "roomId": "r2", "message": "Not your turn." }),
        )
        .unwrap()
        .unwrap();
        assert_eq!(scoped.room_id(), Some(&RoomId::new("r2")));

        let unscoped = decode_inbound(inbound::EXCEPTION, json!({ "code": "ROOM_FULL" }))
            .unwrap()
            .unwrap();
        assert_eq!(unscoped.room_id(), None);
    }

    #[test]
    fn unknown_events_are_ignored_and_bad_payloads_rejected() {
        assert!(decode_inbound("games:chat:typing", json!({})).unwrap().is_none());
        assert!(matches!(
            decode_inbound(inbound::ROOM_DELETED, json!({ "id": 1 })),
            Err(ChannelError::Payload { .. })
        ));
    }
}
