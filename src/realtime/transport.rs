use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

/// What a shared connection hands to each room listener.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelFrame {
    /// Emitted on the first connect and on every reconnect.
    Connected,
    Disconnected,
    Message { event: String, payload: Value },
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("realtime channel is closed")]
    Closed,
    #[error("realtime connect failed: {0}")]
    Connect(String),
    #[error("failed to encode realtime frame: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to decrypt payload: {0}")]
    Decrypt(String),
    #[error("malformed `{event}` payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Process-wide event connection shared by every room screen.
///
/// `subscribe` registers a listener; dropping the receiver unregisters it
/// without touching the connection or other listeners.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn connect(&self) -> Result<(), ChannelError>;

    fn is_connected(&self) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<ChannelFrame>;

    /// Best effort: `Ok` means the frame was queued, not delivered.
    fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError>;
}
