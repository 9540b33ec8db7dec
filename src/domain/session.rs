use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{RoomId, SessionId};

/// Game engine that owns a session's state blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineTag {
    ExplodingCats,
    TexasHoldem,
    #[serde(other)]
    Unknown,
}

impl EngineTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineTag::ExplodingCats => "exploding_cats",
            EngineTag::TexasHoldem => "texas_holdem",
            EngineTag::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EngineTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Active,
    Completed,
}

/// A match inside a room. `state` is engine-owned and only the `snapshot`
/// module looks inside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub room_id: RoomId,
    pub engine: EngineTag,
    pub status: SessionStatus,
    #[serde(default)]
    pub state: Option<Value>,
}

impl Session {
    /// A match has started once the engine has published a snapshot object
    /// inside the session state. A bare state object without `snapshot` is
    /// treated as not started.
    pub fn has_started(&self) -> bool {
        self.snapshot_blob().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub(crate) fn snapshot_blob(&self) -> Option<&Value> {
        self.state
            .as_ref()
            .and_then(|state| state.get("snapshot"))
            .filter(|snapshot| snapshot.is_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(state: Option<Value>) -> Session {
        Session {
            id: SessionId::new("s1"),
            room_id: RoomId::new("r1"),
            engine: EngineTag::ExplodingCats,
            status: SessionStatus::Active,
            state,
        }
    }

    #[test]
    fn started_requires_nested_snapshot_object() {
        assert!(!session(None).has_started());
        assert!(!session(Some(json!({}))).has_started());
        assert!(!session(Some(json!({ "snapshot": null }))).has_started());
        assert!(session(Some(json!({ "snapshot": { "playerOrder": [] } }))).has_started());
    }

    #[test]
    fn unknown_engine_tags_are_tolerated() {
        let parsed: Session = serde_json::from_value(json!({
            "id": "s1",
            "roomId": "r1",
            "engine": "go_fish",
            "status": "waiting",
            "state": null
        }))
        .unwrap();
        assert_eq!(parsed.engine, EngineTag::Unknown);
        assert!(parsed.state.is_none());
    }
}
