use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::envelope::{open_payload, PayloadDecryptor};
use super::events::{decode_inbound, outbound, InboundEvent};
use super::transport::{ChannelError, ChannelFrame, EventChannel};
use crate::domain::{LocalIdentity, Membership, RoomId};

const LOG_TARGET: &str = "realtime::channel";

type PendingDecode = BoxFuture<'static, Option<InboundEvent>>;

enum Step {
    Decoded(Option<InboundEvent>),
    Frame(Result<ChannelFrame, RecvError>),
}

/// One room screen's view of the shared event connection.
///
/// Replays the join/watch handshake on every `Connected` frame, unwraps
/// encrypted payloads, and yields decoded events in the order their decodes
/// finish.
pub struct RealtimeChannel {
    transport: Arc<dyn EventChannel>,
    decryptor: Arc<dyn PayloadDecryptor>,
    room_id: RoomId,
    identity: Option<LocalIdentity>,
    frames: Option<broadcast::Receiver<ChannelFrame>>,
    pending: FuturesUnordered<PendingDecode>,
}

impl RealtimeChannel {
    pub async fn open(
        transport: Arc<dyn EventChannel>,
        room_id: RoomId,
        identity: Option<LocalIdentity>,
        decryptor: Arc<dyn PayloadDecryptor>,
    ) -> Result<Self, ChannelError> {
        let frames = transport.subscribe();
        let channel = Self {
            transport,
            decryptor,
            room_id,
            identity,
            frames: Some(frames),
            pending: FuturesUnordered::new(),
        };
        info!(
            target: LOG_TARGET,
            room_id = %channel.room_id,
            membership = ?channel.membership(),
            "opening room channel"
        );

        // A connection that is already up will not produce another
        // `Connected` frame for this listener.
        if channel.transport.is_connected() {
            channel.handshake()?;
        } else {
            channel.transport.connect().await?;
        }
        Ok(channel)
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn membership(&self) -> Membership {
        Membership::for_identity(self.identity.as_ref())
    }

    pub fn is_open(&self) -> bool {
        self.frames.is_some()
    }

    /// Queue an outbound frame on the shared connection.
    pub fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        self.transport.emit(event, payload)
    }

    fn handshake(&self) -> Result<(), ChannelError> {
        match &self.identity {
            Some(identity) => {
                debug!(target: LOG_TARGET, room_id = %self.room_id, "joining room");
                self.transport.emit(
                    outbound::JOIN,
                    json!({ "roomId": self.room_id, "userId": identity.user_id }),
                )
            }
            None => {
                debug!(target: LOG_TARGET, room_id = %self.room_id, "watching room");
                self.transport
                    .emit(outbound::WATCH, json!({ "roomId": self.room_id }))
            }
        }
    }

    fn queue_decode(&mut self, event: String, payload: Value) {
        let decryptor = Arc::clone(&self.decryptor);
        self.pending.push(Box::pin(async move {
            let decoded = match open_payload(decryptor.as_ref(), payload).await {
                Ok(plain) => decode_inbound(&event, plain),
                Err(err) => Err(err),
            };
            match decoded {
                Ok(Some(inbound)) => Some(inbound),
                Ok(None) => {
                    debug!(target: LOG_TARGET, event = %event, "ignoring unknown event");
                    None
                }
                Err(err) => {
                    warn!(target: LOG_TARGET, event = %event, error = %err, "dropping undecodable event");
                    None
                }
            }
        }));
    }

    /// Next decoded event, or `None` once the channel is closed and every
    /// in-flight decode has been delivered.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        loop {
            let step = match self.frames.as_mut() {
                Some(frames) => {
                    let pending = &mut self.pending;
                    tokio::select! {
                        Some(decoded) = pending.next(), if !pending.is_empty() => Step::Decoded(decoded),
                        frame = frames.recv() => Step::Frame(frame),
                    }
                }
                None => match self.pending.next().await {
                    Some(decoded) => Step::Decoded(decoded),
                    None => return None,
                },
            };

            match step {
                Step::Decoded(Some(event)) => return Some(event),
                Step::Decoded(None) => {}
                Step::Frame(Ok(ChannelFrame::Connected)) => {
                    if let Err(err) = self.handshake() {
                        warn!(target: LOG_TARGET, room_id = %self.room_id, error = %err, "handshake emit failed");
                    }
                }
                Step::Frame(Ok(ChannelFrame::Disconnected)) => {
                    debug!(target: LOG_TARGET, room_id = %self.room_id, "connection lost, waiting for reconnect");
                }
                Step::Frame(Ok(ChannelFrame::Message { event, payload })) => {
                    self.queue_decode(event, payload);
                }
                Step::Frame(Err(RecvError::Lagged(skipped))) => {
                    warn!(target: LOG_TARGET, room_id = %self.room_id, skipped, "listener lagged behind the connection");
                }
                Step::Frame(Err(RecvError::Closed)) => {
                    info!(target: LOG_TARGET, room_id = %self.room_id, "connection closed");
                    self.frames = None;
                }
            }
        }
    }

    /// Unregister this room's listener. The shared connection stays up.
    pub fn close(&mut self) {
        if self.frames.take().is_some() {
            debug!(target: LOG_TARGET, room_id = %self.room_id, "closing room channel");
        }
        self.pending = FuturesUnordered::new();
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use super::*;
    use crate::realtime::envelope::{NoDecryption, SealedPayload};
    use crate::realtime::events::inbound;
    use crate::realtime::InMemoryChannel;

    /// Sleeps for `iv[0]` milliseconds before handing back the ciphertext.
    struct Delayed;

    #[async_trait]
    impl PayloadDecryptor for Delayed {
        async fn decrypt(&self, sealed: SealedPayload) -> Result<Vec<u8>, ChannelError> {
            let delay = sealed.iv.as_ref().and_then(|iv| iv.first().copied()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
            Ok(sealed.ciphertext)
        }
    }

    fn sealed(delay_ms: u8, plain: Value) -> Value {
        json!({
            "encrypted": true,
            "iv": STANDARD.encode([delay_ms]),
            "payload": STANDARD.encode(serde_json::to_vec(&plain).unwrap()),
        })
    }

    async fn open(transport: &Arc<InMemoryChannel>, identity: Option<LocalIdentity>) -> RealtimeChannel {
        RealtimeChannel::open(
            transport.clone(),
            RoomId::new("r1"),
            identity,
            Arc::new(Delayed),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn handshake_replays_on_every_connect() -> anyhow::Result<()> {
        let transport = Arc::new(InMemoryChannel::new());
        let mut channel = open(&transport, Some(LocalIdentity::new("u1"))).await;

        transport.disconnect();
        transport.connect_now();
        transport.inject(inbound::ROOM_DELETED, json!({ "roomId": "r1" }));
        let event = channel.next_event().await;
        assert!(matches!(event, Some(InboundEvent::RoomDeleted { .. })));

        let joins: Vec<_> = transport
            .emitted()
            .into_iter()
            .filter(|(name, _)| name == outbound::JOIN)
            .collect();
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].1, json!({ "roomId": "r1", "userId": "u1" }));
        Ok(())
    }

    #[tokio::test]
    async fn spectators_watch_instead_of_join() -> anyhow::Result<()> {
        let transport = Arc::new(InMemoryChannel::new());
        transport.connect_now();
        let channel = open(&transport, None).await;
        assert_eq!(channel.membership(), Membership::Spectator);
        assert_eq!(
            transport.emitted(),
            vec![(outbound::WATCH.to_string(), json!({ "roomId": "r1" }))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn last_resolving_decode_is_delivered_last() -> anyhow::Result<()> {
        let transport = Arc::new(InMemoryChannel::new());
        let mut channel = open(&transport, Some(LocalIdentity::new("u1"))).await;

        transport.inject(inbound::ROOM_DELETED, sealed(60, json!({ "roomId": "slow" })));
        transport.inject(inbound::ROOM_DELETED, sealed(1, json!({ "roomId": "fast" })));

        let first = channel.next_event().await.and_then(|e| e.room_id().cloned());
        let second = channel.next_event().await.and_then(|e| e.room_id().cloned());
        assert_eq!(first, Some(RoomId::new("fast")));
        assert_eq!(second, Some(RoomId::new("slow")));
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_frames_are_skipped() -> anyhow::Result<()> {
        let transport = Arc::new(InMemoryChannel::new());
        transport.connect_now();
        let mut channel = RealtimeChannel::open(
            transport.clone(),
            RoomId::new("r1"),
            None,
            Arc::new(NoDecryption),
        )
        .await?;

        transport.inject(inbound::ROOM_DELETED, sealed(0, json!({ "roomId": "r1" })));
        transport.inject("games:unknown", json!({}));
        transport.inject(inbound::ROOM_UPDATED, json!({ "room": 5 }));
        transport.inject(inbound::ROOM_DELETED, json!({ "roomId": "r1" }));

        let event = channel.next_event().await;
        assert_eq!(
            event,
            Some(InboundEvent::RoomDeleted { room_id: RoomId::new("r1") })
        );
        Ok(())
    }

    #[tokio::test]
    async fn close_unregisters_only_this_listener() -> anyhow::Result<()> {
        let transport = Arc::new(InMemoryChannel::new());
        transport.connect_now();
        let mut first = open(&transport, None).await;
        let second = open(&transport, None).await;
        assert_eq!(transport.listener_count(), 2);

        first.close();
        assert!(!first.is_open());
        assert_eq!(transport.listener_count(), 1);
        assert!(first.next_event().await.is_none());
        assert!(matches!(first.emit(outbound::DRAW, json!({})), Err(ChannelError::Closed)));

        drop(second);
        assert_eq!(transport.listener_count(), 0);
        assert!(transport.is_connected());
        Ok(())
    }
}
