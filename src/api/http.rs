use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use super::error::{error_message, ApiError};
use super::types::{
    CreateRoomRequest, JoinRoomRequest, ListRoomsQuery, RoomEnvelope, RoomsEnvelope,
    SessionEnvelope, StartedRoom,
};
use super::RoomsApi;
use crate::domain::{EngineTag, Room, RoomId, Session};

const LOG_TARGET: &str = "api::http";

/// Supplies a fresh bearer token after the server answered 401.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Option<String>;
}

pub struct HttpRoomsApi {
    http: reqwest::Client,
    base: Url,
    token: RwLock<Option<String>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl HttpRoomsApi {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            token: RwLock::new(None),
            refresher: None,
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("`{}` cannot be used as a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(segments)?;
        let mut refreshed = false;
        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            let token = self.token.read().clone();
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(target: LOG_TARGET, %method, %url, "request");
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;

            if status == StatusCode::UNAUTHORIZED {
                if !refreshed {
                    if let Some(refresher) = &self.refresher {
                        refreshed = true;
                        if let Some(fresh) = refresher.refresh().await {
                            debug!(target: LOG_TARGET, %url, "token refreshed, retrying");
                            self.set_token(Some(fresh));
                            continue;
                        }
                    }
                }
                return Err(ApiError::Unauthenticated);
            }
            if !status.is_success() {
                let message = error_message(&text, status.canonical_reason());
                warn!(target: LOG_TARGET, %method, %url, status = status.as_u16(), %message, "request rejected");
                return Err(ApiError::Http {
                    status: status.as_u16(),
                    message,
                });
            }
            return Ok(text);
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let text = self.execute(method, segments, query, body).await?;
        serde_json::from_str(&text).map_err(|err| ApiError::Decode(err.to_string()))
    }

    fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
        serde_json::to_value(value).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RoomsApi for HttpRoomsApi {
    async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room, ApiError> {
        let body = Self::to_body(request)?;
        let envelope: RoomEnvelope = self
            .call(Method::POST, &["games", "rooms"], &[], Some(&body))
            .await?;
        Ok(envelope.room)
    }

    async fn list_rooms(&self, query: &ListRoomsQuery) -> Result<Vec<Room>, ApiError> {
        let envelope: RoomsEnvelope = self
            .call(Method::GET, &["games", "rooms"], &query.pairs(), None)
            .await?;
        Ok(envelope.rooms)
    }

    async fn fetch_room(&self, room_id: &RoomId) -> Result<Room, ApiError> {
        let envelope: RoomEnvelope = self
            .call(Method::GET, &["games", "rooms", room_id.as_str()], &[], None)
            .await?;
        Ok(envelope.room)
    }

    async fn fetch_session(&self, room_id: &RoomId) -> Result<Option<Session>, ApiError> {
        let envelope: SessionEnvelope = self
            .call(
                Method::GET,
                &["games", "rooms", room_id.as_str(), "session"],
                &[],
                None,
            )
            .await?;
        Ok(envelope.session)
    }

    async fn join_room(&self, request: &JoinRoomRequest) -> Result<Room, ApiError> {
        let body = Self::to_body(request)?;
        let envelope: RoomEnvelope = self
            .call(Method::POST, &["games", "rooms", "join"], &[], Some(&body))
            .await?;
        Ok(envelope.room)
    }

    async fn leave_room(&self, room_id: &RoomId) -> Result<(), ApiError> {
        let body = json!({ "roomId": room_id });
        self.execute(Method::POST, &["games", "rooms", "leave"], &[], Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), ApiError> {
        let body = json!({ "roomId": room_id });
        self.execute(Method::POST, &["games", "rooms", "delete"], &[], Some(&body))
            .await?;
        Ok(())
    }

    async fn start_room(&self, room_id: &RoomId, engine: EngineTag) -> Result<StartedRoom, ApiError> {
        let body = json!({ "roomId": room_id, "engine": engine });
        self.call(Method::POST, &["games", "rooms", "start"], &[], Some(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_extend_the_base_path() -> anyhow::Result<()> {
        let api = HttpRoomsApi::new(Url::parse("https://api.example.com/v1/")?, Duration::from_secs(5))?;
        assert_eq!(
            api.endpoint(&["games", "rooms", "r 1", "session"])?.as_str(),
            "https://api.example.com/v1/games/rooms/r%201/session"
        );
        let bare = HttpRoomsApi::new(Url::parse("https://api.example.com")?, Duration::from_secs(5))?;
        assert_eq!(
            bare.endpoint(&["games", "rooms"])?.as_str(),
            "https://api.example.com/games/rooms"
        );
        Ok(())
    }

    #[test]
    fn token_can_be_swapped() -> anyhow::Result<()> {
        let api = HttpRoomsApi::new(Url::parse("https://api.example.com")?, Duration::from_secs(5))?
            .with_token("t1");
        assert!(api.has_token());
        api.set_token(None);
        assert!(!api.has_token());
        Ok(())
    }
}
