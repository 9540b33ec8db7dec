//! Localized text lookup for server-reported exceptions.

use std::collections::HashMap;

use crate::realtime::ExceptionPayload;

/// Key used when nothing better is available.
pub const GENERIC_ERROR_KEY: &str = "games.errors.generic";

pub trait MessageCatalog: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;

    fn generic_error(&self) -> String {
        self.lookup(GENERIC_ERROR_KEY)
            .unwrap_or_else(|| "Something went wrong. Please try again.".to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, String>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }
}

impl MessageCatalog for StaticCatalog {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// Pick the text to show for a server exception.
///
/// `code` and then `messageKey` are looked up in the catalog. A raw
/// `message` is only shown when it reads like a sentence (contains
/// whitespace); bare identifiers such as `ROOM_NOT_FOUND` fall back to the
/// generic text.
pub fn resolve_exception_message(catalog: &dyn MessageCatalog, exception: &ExceptionPayload) -> String {
    [exception.code.as_deref(), exception.message_key.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|key| catalog.lookup(key))
        .or_else(|| {
            exception
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| m.contains(char::is_whitespace))
                .map(str::to_string)
        })
        .unwrap_or_else(|| catalog.generic_error())
}
