use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use super::transport::{ChannelError, ChannelFrame, EventChannel};

/// Loopback transport: frames are injected by hand and emits are recorded.
#[derive(Debug)]
pub struct InMemoryChannel {
    tx: broadcast::Sender<ChannelFrame>,
    connected: AtomicBool,
    shut: AtomicBool,
    emitted: Mutex<Vec<(String, Value)>>,
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            connected: AtomicBool::new(false),
            shut: AtomicBool::new(false),
            emitted: Mutex::new(Vec::new()),
        }
    }

    fn broadcast(&self, frame: ChannelFrame) {
        // No listeners is fine.
        let _ = self.tx.send(frame);
    }

    pub fn connect_now(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.broadcast(ChannelFrame::Connected);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.broadcast(ChannelFrame::Disconnected);
    }

    /// Make every subsequent emit fail as if the socket were gone.
    pub fn shut(&self) {
        self.shut.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn inject(&self, event: &str, payload: Value) {
        self.broadcast(ChannelFrame::Message {
            event: event.to_string(),
            payload,
        });
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().clone()
    }

    pub fn emitted_names(&self) -> Vec<String> {
        self.emitted.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventChannel for InMemoryChannel {
    async fn connect(&self) -> Result<(), ChannelError> {
        if self.shut.load(Ordering::SeqCst) {
            return Err(ChannelError::Connect("transport shut down".into()));
        }
        self.connect_now();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelFrame> {
        self.tx.subscribe()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        if self.shut.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.emitted.lock().push((event.to_string(), payload));
        Ok(())
    }
}
