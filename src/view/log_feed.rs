use chrono::{DateTime, Utc};

use crate::domain::UserId;
use crate::snapshot::{LogEntry, LogKind, LogScope};

pub const DEFAULT_LOG_LIMIT: usize = 20;

/// Who wrote a log line. Rendering `You`/`Unknown` is left to the
/// presentation layer so it can be localized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SenderLabel {
    Named(String),
    You,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub id: String,
    pub kind: LogKind,
    pub sender: SenderLabel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

pub struct LogFeedInput<'a> {
    pub entries: &'a [LogEntry],
    pub viewer: Option<&'a UserId>,
    pub viewer_is_participant: bool,
    /// Resolves a player id to its display name from the current roster.
    pub roster: &'a dyn Fn(&UserId) -> Option<String>,
    pub limit: usize,
}

/// Filter, stable-sort ascending, keep the last `limit`, newest first.
pub fn build_log_feed(input: LogFeedInput<'_>) -> Vec<LogLine> {
    let mut visible: Vec<&LogEntry> = input
        .entries
        .iter()
        .filter(|entry| entry.scope() == LogScope::All || input.viewer_is_participant)
        .collect();
    visible.sort_by_key(|entry| entry.created_at);

    let skip = visible.len().saturating_sub(input.limit);
    visible
        .into_iter()
        .skip(skip)
        .rev()
        .map(|entry| LogLine {
            id: entry.id.clone(),
            kind: entry.kind,
            sender: sender_label(entry, input.viewer, input.roster),
            message: entry.message.clone(),
            created_at: entry.created_at,
        })
        .collect()
}

fn sender_label(
    entry: &LogEntry,
    viewer: Option<&UserId>,
    roster: &dyn Fn(&UserId) -> Option<String>,
) -> SenderLabel {
    if let Some(name) = entry.sender_name.as_deref().filter(|n| !n.is_empty()) {
        return SenderLabel::Named(name.to_string());
    }
    let Some(sender) = entry.sender_id.as_ref() else {
        return SenderLabel::Unknown;
    };
    if let Some(name) = roster(sender) {
        return SenderLabel::Named(name);
    }
    if viewer == Some(sender) {
        return SenderLabel::You;
    }
    SenderLabel::Unknown
}
