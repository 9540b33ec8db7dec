use tracing::debug;

use super::dispatcher::ActionDispatcher;
use crate::domain::Session;
use crate::realtime::{ActionCompletion, ExceptionPayload};

const LOG_TARGET: &str = "dispatch::integration";

/// Hooks the room controller calls so a game screen can release its busy
/// flags. Every hook has a default that only touches the dispatcher.
pub trait GameIntegration: Send + Sync {
    fn dispatcher(&self) -> &ActionDispatcher;

    /// The session was replaced, by snapshot or by a handshake reply.
    fn on_snapshot(&self, _session: Option<&Session>) {
        self.dispatcher().settle_action("snapshot");
    }

    fn on_started(&self, _session: &Session) {
        let dispatcher = self.dispatcher();
        dispatcher.settle_action("started");
        dispatcher.settle_start("started");
    }

    fn on_action_completed(&self, completion: ActionCompletion) {
        let dispatcher = self.dispatcher();
        if let Some(tag) = dispatcher.settle_action(completion.event_name()) {
            if tag.completion() != completion {
                debug!(
                    target: LOG_TARGET,
                    pending = %tag,
                    completed = completion.event_name(),
                    "completion for a different action released the flag"
                );
            }
        }
    }

    fn on_exception(&self, _exception: &ExceptionPayload) {
        self.dispatcher().clear_all("exception");
    }

    /// Leave, delete or room removal.
    fn reset(&self) {
        self.dispatcher().clear_all("reset");
    }
}
