use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::dispatch::ActionDispatcher;
use crate::domain::{LocalIdentity, RoomId};
use crate::presenter::Presenter;
use crate::realtime::{EventChannel, WebSocketConfig};
use crate::view::{TableGeometry, ViewConfig, DEFAULT_LOG_LIMIT};

/// Everything a room screen needs to talk to the games service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    pub realtime_url: Url,
    pub request_timeout: Duration,
    pub handshake_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub broadcast_capacity: usize,
    pub log_limit: usize,
    pub geometry: TableGeometry,
    /// Opt-in: a pending action older than this no longer blocks new ones.
    pub action_stale_after: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_base: Url, realtime_url: Url) -> Self {
        Self {
            api_base,
            realtime_url,
            request_timeout: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
            broadcast_capacity: 64,
            log_limit: DEFAULT_LOG_LIMIT,
            geometry: TableGeometry::default(),
            action_stale_after: None,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = limit;
        self
    }

    pub fn with_geometry(mut self, geometry: TableGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_action_stale_after(mut self, threshold: Option<Duration>) -> Self {
        self.action_stale_after = threshold;
        self
    }

    pub fn websocket(&self) -> WebSocketConfig {
        WebSocketConfig {
            url: self.realtime_url.clone(),
            handshake_timeout: self.handshake_timeout,
            heartbeat_interval: self.heartbeat_interval,
            reconnect_delay: self.reconnect_delay,
            broadcast_capacity: self.broadcast_capacity,
        }
    }

    pub fn view(&self) -> ViewConfig {
        ViewConfig {
            geometry: self.geometry,
            log_limit: self.log_limit,
        }
    }

    /// Dispatcher for one game screen, carrying the stale-flag policy.
    pub fn dispatcher(
        &self,
        room_id: RoomId,
        identity: Option<LocalIdentity>,
        channel: Arc<dyn EventChannel>,
        presenter: Arc<dyn Presenter>,
    ) -> ActionDispatcher {
        ActionDispatcher::new(room_id, identity, channel, presenter)
            .with_stale_after(self.action_stale_after)
    }
}
