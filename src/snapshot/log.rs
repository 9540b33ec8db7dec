use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    System,
    Action,
    Message,
}

/// Visibility classifier. Entries scoped to `Players` are hidden from
/// spectators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogScope {
    #[default]
    All,
    Players,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default)]
    pub scope: Option<LogScope>,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn scope(&self) -> LogScope {
        self.scope.unwrap_or_default()
    }
}
