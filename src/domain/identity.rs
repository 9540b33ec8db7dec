use super::ids::UserId;

/// The signed-in user on this device, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalIdentity {
    pub user_id: UserId,
}

impl LocalIdentity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// How this client attaches to a room's live channel. Decided once per
/// screen visit from the presence of a local identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    Participant,
    Spectator,
}

impl Membership {
    pub fn for_identity(identity: Option<&LocalIdentity>) -> Self {
        match identity {
            Some(_) => Membership::Participant,
            None => Membership::Spectator,
        }
    }
}
