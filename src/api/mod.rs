//! REST surface of the games service.

pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

pub use error::{error_message, ApiError};
pub use http::{HttpRoomsApi, TokenRefresher};
pub use types::{CreateRoomRequest, JoinRoomRequest, ListRoomsQuery, Participation, StartedRoom};

use crate::domain::{EngineTag, Room, RoomId, Session};

#[async_trait]
pub trait RoomsApi: Send + Sync {
    async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room, ApiError>;

    async fn list_rooms(&self, query: &ListRoomsQuery) -> Result<Vec<Room>, ApiError>;

    async fn fetch_room(&self, room_id: &RoomId) -> Result<Room, ApiError>;

    /// `Ok(None)` when no match exists for the room yet.
    async fn fetch_session(&self, room_id: &RoomId) -> Result<Option<Session>, ApiError>;

    async fn join_room(&self, request: &JoinRoomRequest) -> Result<Room, ApiError>;

    async fn leave_room(&self, room_id: &RoomId) -> Result<(), ApiError>;

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), ApiError>;

    async fn start_room(&self, room_id: &RoomId, engine: EngineTag) -> Result<StartedRoom, ApiError>;
}
