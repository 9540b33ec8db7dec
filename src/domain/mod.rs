pub mod identity;
pub mod ids;
pub mod room;
pub mod session;

pub use identity::{LocalIdentity, Membership};
pub use ids::{RoomId, SessionId, UserId};
pub use room::{Room, RoomMember, RoomStatus, Visibility};
pub use session::{EngineTag, Session, SessionStatus};
