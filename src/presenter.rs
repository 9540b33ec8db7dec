//! Boundary to the UI layer. The crate never renders or localizes; it hands
//! structured prompts and destinations to a [`Presenter`].

use async_trait::async_trait;

use crate::domain::{RoomId, SessionId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Alert {
    SignInRequired,
    RoomDeleted,
    LeaveFailed(String),
    DeleteFailed(String),
    StartFailed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmPrompt {
    LeaveRoom,
    DeleteRoom,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Lobby,
    Game {
        room_id: RoomId,
        session_id: Option<SessionId>,
    },
}

#[async_trait]
pub trait Presenter: Send + Sync {
    /// Ask the user to confirm a destructive action.
    async fn confirm(&self, prompt: ConfirmPrompt) -> bool;

    /// Dismissible alert.
    fn alert(&self, alert: Alert);

    /// Alert that must be acknowledged before the caller continues.
    async fn blocking_alert(&self, alert: Alert);

    /// Short-lived notice, already localized.
    fn toast(&self, message: String);

    fn navigate(&self, to: Navigation);
}
