//! Single-flight submission of player actions.

pub mod busy;
pub mod dispatcher;
pub mod integration;
pub mod intent;
pub mod tables;


pub use busy::{BusyError, BusyState};
pub use dispatcher::{ActionDispatcher, DispatchOutcome};
pub use integration::GameIntegration;
pub use intent::{ActionIntent, ActionTag, HoldemMove};
pub use tables::{HoldemTable, KittensTable};
