//! Client-side room and session sync for the tabletop games service.
//!
//! A room screen owns one [`RoomSessionController`], which merges REST
//! fetches with events from a room-scoped [`RealtimeChannel`]. Game screens
//! send player actions through an [`ActionDispatcher`] and render whatever
//! [`derive_view`] produces from the controller's current state.

pub mod api;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod domain;
pub mod logging;
pub mod messages;
pub mod presenter;
pub mod realtime;
pub mod snapshot;
pub mod view;

#[cfg(test)]
pub mod test_utils;

pub use api::{ApiError, HttpRoomsApi, RoomsApi};
pub use config::ClientConfig;
pub use controller::{FetchMode, RoomSessionController, RoomState};
pub use dispatch::{ActionDispatcher, ActionIntent, DispatchOutcome, GameIntegration};
pub use domain::{EngineTag, LocalIdentity, Room, RoomId, Session, SessionId, UserId};
pub use messages::{MessageCatalog, StaticCatalog};
pub use presenter::{Alert, ConfirmPrompt, Navigation, Presenter};
pub use realtime::{EventChannel, InMemoryChannel, RealtimeChannel, WebSocketChannel};
pub use view::{derive_view, TableView, ViewConfig, ViewModel};
