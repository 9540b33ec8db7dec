use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::transport::{ChannelError, ChannelFrame, EventChannel};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const LOG_TARGET: &str = "realtime::websocket";

const HEARTBEAT_EVENT: &str = "heartbeat";

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: Url,
    pub handshake_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub broadcast_capacity: usize,
}

impl WebSocketConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
            broadcast_capacity: 64,
        }
    }
}

#[derive(serde::Serialize)]
struct OutgoingFrame<'a> {
    event: &'a str,
    data: &'a Value,
}

#[derive(Debug, serde::Deserialize)]
struct IncomingFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Process-wide websocket connection. A background task keeps it alive,
/// reconnecting after `reconnect_delay` until [`WebSocketChannel::shutdown`].
pub struct WebSocketChannel {
    inner: Arc<Inner>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

struct Inner {
    cfg: WebSocketConfig,
    frames: broadcast::Sender<ChannelFrame>,
    outbound: mpsc::UnboundedSender<String>,
    connected: AtomicBool,
    stop: CancellationToken,
}

impl WebSocketChannel {
    pub fn new(cfg: WebSocketConfig, stop: CancellationToken) -> Self {
        let (frames, _) = broadcast::channel(cfg.broadcast_capacity);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                cfg,
                frames,
                outbound,
                connected: AtomicBool::new(false),
                stop,
            }),
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    pub fn shutdown(&self) {
        self.inner.stop.cancel();
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.inner.stop.cancel();
    }
}

#[async_trait]
impl EventChannel for WebSocketChannel {
    /// Starts the background loop on first call and waits for its first
    /// connection. Later calls return once the connection is up again.
    async fn connect(&self) -> Result<(), ChannelError> {
        if self.inner.stop.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        if self.is_connected() {
            return Ok(());
        }
        let mut frames = self.inner.frames.subscribe();
        let not_started = self.outbound_rx.lock().take();
        if let Some(outbound_rx) = not_started {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run(outbound_rx).await });
        }

        let wait = async {
            loop {
                match frames.recv().await {
                    Ok(ChannelFrame::Connected) => return Ok(()),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Err(ChannelError::Closed),
                }
            }
        };
        match timeout(self.inner.cfg.handshake_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Connect(format!(
                "no connection to {} within {:?}",
                self.inner.cfg.url, self.inner.cfg.handshake_timeout
            ))),
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelFrame> {
        self.inner.frames.subscribe()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::Closed);
        }
        let text = encode_frame(event, &payload)?;
        self.inner.outbound.send(text).map_err(|_| ChannelError::Closed)
    }
}

impl Inner {
    async fn run(&self, mut outbound: mpsc::UnboundedReceiver<String>) {
        info!(target: LOG_TARGET, url = %self.cfg.url, "starting realtime client");
        while !self.stop.is_cancelled() {
            match self.connect().await {
                Ok(stream) => {
                    if let Err(err) = self.pump(stream, &mut outbound).await {
                        warn!(target: LOG_TARGET, error = %err, "realtime stream ended with error");
                    }
                    self.set_disconnected();
                }
                Err(err) => {
                    warn!(target: LOG_TARGET, error = %err, "failed to connect to realtime server");
                }
            }

            if self.stop.is_cancelled() {
                break;
            }

            debug!(
                target: LOG_TARGET,
                delay_secs = self.cfg.reconnect_delay.as_secs_f32(),
                "waiting before reconnect attempt"
            );
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = sleep(self.cfg.reconnect_delay) => {}
            }
        }

        info!(target: LOG_TARGET, "realtime client stopped");
    }

    async fn connect(&self) -> Result<WsStream> {
        let ws_url = self.cfg.url.to_string();
        let (stream, _) = timeout(self.cfg.handshake_timeout, connect_async(ws_url))
            .await
            .context("realtime handshake timed out")?
            .context("realtime handshake failed")?;
        Ok(stream)
    }

    fn set_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.frames.send(ChannelFrame::Disconnected);
        }
    }

    async fn pump(&self, stream: WsStream, outbound: &mut mpsc::UnboundedReceiver<String>) -> Result<()> {
        let (mut sink, mut source) = stream.split();

        // Anything queued against the previous socket is stale.
        let mut stale = 0usize;
        while outbound.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(target: LOG_TARGET, stale, "discarded frames queued while disconnected");
        }

        self.connected.store(true, Ordering::SeqCst);
        let _ = self.frames.send(ChannelFrame::Connected);
        info!(target: LOG_TARGET, "realtime connection established");

        let mut heartbeat = interval(self.cfg.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let heartbeat_msg = encode_frame(HEARTBEAT_EVENT, &Value::Null)?;

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => {
                    debug!(target: LOG_TARGET, "shutdown signal received");
                    break;
                }
                _ = heartbeat.tick() => {
                    if let Err(err) = sink.send(Message::Text(heartbeat_msg.clone())).await {
                        warn!(target: LOG_TARGET, error = %err, "heartbeat send failed, ending loop");
                        break;
                    }
                }
                Some(text) = outbound.recv() => {
                    sink.send(Message::Text(text))
                        .await
                        .context("failed to send outbound frame")?;
                }
                msg = source.next() => {
                    match msg {
                        Some(Ok(Message::Text(txt))) => {
                            if let Err(err) = self.handle_text(&txt) {
                                warn!(target: LOG_TARGET, error = %err, "failed to handle realtime message");
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload)).await.ok();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(target: LOG_TARGET, ?frame, "socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(target: LOG_TARGET, error = %err, "websocket error");
                            break;
                        }
                        None => {
                            debug!(target: LOG_TARGET, "websocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        let _ = sink.close().await;
        Ok(())
    }

    fn handle_text(&self, txt: &str) -> Result<()> {
        let frame: IncomingFrame =
            serde_json::from_str(txt).context("failed to deserialize realtime frame")?;
        if frame.event == HEARTBEAT_EVENT {
            return Ok(());
        }
        debug!(target: LOG_TARGET, event = %frame.event, "realtime frame received");
        let _ = self.frames.send(ChannelFrame::Message {
            event: frame.event,
            payload: frame.data,
        });
        Ok(())
    }
}

fn encode_frame(event: &str, data: &Value) -> Result<String, ChannelError> {
    Ok(serde_json::to_string(&OutgoingFrame { event, data })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frames_use_event_and_data_keys() {
        let text = encode_frame("games:room:watch", &json!({ "roomId": "r1" })).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({ "event": "games:room:watch", "data": { "roomId": "r1" } }));
    }

    #[tokio::test]
    async fn incoming_frames_are_broadcast_and_heartbeats_swallowed() -> anyhow::Result<()> {
        let channel = WebSocketChannel::new(
            WebSocketConfig::new(Url::parse("ws://127.0.0.1:9/socket")?),
            CancellationToken::new(),
        );
        let mut rx = channel.subscribe();
        channel.inner.handle_text(r#"{"event":"heartbeat","data":null}"#)?;
        channel
            .inner
            .handle_text(r#"{"event":"games:room:deleted","data":{"roomId":"r1"}}"#)?;
        assert_eq!(
            rx.recv().await?,
            ChannelFrame::Message {
                event: "games:room:deleted".into(),
                payload: json!({ "roomId": "r1" }),
            }
        );
        assert!(channel.inner.handle_text("not json").is_err());
        Ok(())
    }

    struct TargetRecorder(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TargetRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            self.0.lock().push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn frame_logs_are_filterable_by_module_target() -> anyhow::Result<()> {
        use tracing_subscriber::layer::SubscriberExt;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(TargetRecorder(seen.clone()));
        let channel = WebSocketChannel::new(
            WebSocketConfig::new(Url::parse("ws://127.0.0.1:9/socket")?),
            CancellationToken::new(),
        );
        tracing::subscriber::with_default(subscriber, || {
            channel
                .inner
                .handle_text(r#"{"event":"games:room:deleted","data":{"roomId":"r1"}}"#)
        })?;
        assert_eq!(*seen.lock(), vec!["realtime::websocket".to_string()]);
        Ok(())
    }

    #[test]
    fn emit_requires_a_live_connection() {
        let channel = WebSocketChannel::new(
            WebSocketConfig::new(Url::parse("ws://127.0.0.1:9/socket").unwrap()),
            CancellationToken::new(),
        );
        assert!(matches!(
            channel.emit("games:session:draw", json!({})),
            Err(ChannelError::Closed)
        ));
    }
}
