use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{RoomId, UserId};
use super::session::EngineTag;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    InProgress,
    Completed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// Server-owned room record. The client keeps a cached copy that is replaced
/// wholesale on every authoritative update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub host_id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    pub game_type: EngineTag,
    #[serde(default)]
    pub visibility: Visibility,
    pub max_players: u16,
    pub status: RoomStatus,
    #[serde(default)]
    pub members: Vec<RoomMember>,
    #[serde(default)]
    pub invite_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn is_hosted_by(&self, user: &UserId) -> bool {
        &self.host_id == user
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.iter().any(|m| &m.user_id == user)
    }

    pub fn member_name(&self, user: &UserId) -> Option<&str> {
        self.members
            .iter()
            .find(|m| &m.user_id == user)
            .and_then(|m| m.display_name.as_deref())
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= usize::from(self.max_players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_parses_from_camel_case_wire_shape() {
        let room: Room = serde_json::from_value(json!({
            "id": "r1",
            "hostId": "alice",
            "gameType": "exploding_cats",
            "visibility": "private",
            "maxPlayers": 5,
            "status": "in_progress",
            "members": [
                { "userId": "alice", "displayName": "Alice" },
                { "userId": "bob" }
            ],
            "inviteCode": "ABC123",
            "createdAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(room.status, RoomStatus::InProgress);
        assert_eq!(room.visibility, Visibility::Private);
        assert!(room.is_hosted_by(&UserId::new("alice")));
        assert!(room.is_member(&UserId::new("bob")));
        assert_eq!(room.member_name(&UserId::new("alice")), Some("Alice"));
        assert_eq!(room.member_name(&UserId::new("bob")), None);
        assert!(!room.is_full());
    }
}
