//! Engine-specific views of a session's opaque state blob.
//!
//! Everything outside this module treats `Session::state` as a black box; the
//! typed snapshots below are only produced here.

pub mod holdem;
pub mod kittens;
pub mod log;

pub use holdem::{Chips, HoldemPlayer, HoldemSnapshot, Street};
pub use kittens::{CatCard, KittensPlayer, KittensSnapshot};
pub use log::{LogEntry, LogKind, LogScope};

use crate::domain::{EngineTag, Session, UserId};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed {engine} snapshot: {source}")]
    Malformed {
        engine: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("engine `{0}` has no snapshot decoder")]
    UnsupportedEngine(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameSnapshot {
    Kittens(KittensSnapshot),
    Holdem(HoldemSnapshot),
}

impl GameSnapshot {
    /// Decode the snapshot inside `session`. `Ok(None)` means no match has
    /// started yet.
    pub fn extract(session: &Session) -> Result<Option<Self>, SnapshotError> {
        let Some(blob) = session.snapshot_blob() else {
            return Ok(None);
        };
        let engine = session.engine.as_str();
        let malformed = |source| SnapshotError::Malformed { engine, source };
        let snapshot = match session.engine {
            EngineTag::ExplodingCats => {
                GameSnapshot::Kittens(serde_json::from_value(blob.clone()).map_err(malformed)?)
            }
            EngineTag::TexasHoldem => {
                GameSnapshot::Holdem(serde_json::from_value(blob.clone()).map_err(malformed)?)
            }
            EngineTag::Unknown => return Err(SnapshotError::UnsupportedEngine(engine)),
        };
        Ok(Some(snapshot))
    }

    pub fn player_order(&self) -> &[UserId] {
        match self {
            GameSnapshot::Kittens(s) => &s.player_order,
            GameSnapshot::Holdem(s) => &s.player_order,
        }
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        self.player_order().contains(user)
    }
}
