use serde::{Deserialize, Serialize};

use crate::domain::{EngineTag, Room, RoomId, RoomStatus, Session, Visibility};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub game_type: EngineTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub visibility: Visibility,
    pub max_players: u16,
}

impl CreateRoomRequest {
    pub fn new(game_type: EngineTag) -> Self {
        let max_players = match game_type {
            EngineTag::TexasHoldem => 9,
            _ => 5,
        };
        Self {
            game_type,
            name: None,
            visibility: Visibility::Public,
            max_players,
        }
    }
}

/// Which rooms to list relative to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Participation {
    All,
    Joined,
    Hosted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListRoomsQuery {
    pub game_type: Option<EngineTag>,
    pub status: Option<RoomStatus>,
    pub visibility: Option<Visibility>,
    pub participation: Option<Participation>,
}

impl ListRoomsQuery {
    /// Query-string pairs for the fields that are set.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        fn text<T: Serialize>(value: &T) -> Option<String> {
            match serde_json::to_value(value) {
                Ok(serde_json::Value::String(s)) => Some(s),
                _ => None,
            }
        }
        [
            ("gameType", self.game_type.as_ref().and_then(text)),
            ("status", self.status.as_ref().and_then(text)),
            ("visibility", self.visibility.as_ref().and_then(text)),
            ("participation", self.participation.as_ref().and_then(text)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JoinRoomRequest {
    ById {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    ByInvite {
        #[serde(rename = "inviteCode")]
        invite_code: String,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomEnvelope {
    pub room: Room,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomsEnvelope {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionEnvelope {
    #[serde(default)]
    pub session: Option<Session>,
}

/// Answer to a host start: both halves are applied together.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StartedRoom {
    pub room: Room,
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_query_only_sends_set_filters() {
        let query = ListRoomsQuery {
            game_type: Some(EngineTag::ExplodingCats),
            participation: Some(Participation::Joined),
            ..Default::default()
        };
        assert_eq!(
            query.pairs(),
            vec![
                ("gameType", "exploding_cats".to_string()),
                ("participation", "joined".to_string())
            ]
        );
        assert!(ListRoomsQuery::default().pairs().is_empty());
    }

    #[test]
    fn join_body_is_by_id_or_invite() {
        let by_id = JoinRoomRequest::ById { room_id: RoomId::new("r1") };
        let by_code = JoinRoomRequest::ByInvite { invite_code: "ABCD".into() };
        assert_eq!(serde_json::to_value(by_id).unwrap(), json!({ "roomId": "r1" }));
        assert_eq!(serde_json::to_value(by_code).unwrap(), json!({ "inviteCode": "ABCD" }));
    }

    #[test]
    fn create_body_omits_missing_name() {
        let body = serde_json::to_value(CreateRoomRequest::new(EngineTag::TexasHoldem)).unwrap();
        assert_eq!(
            body,
            json!({ "gameType": "texas_holdem", "visibility": "public", "maxPlayers": 9 })
        );
    }
}
