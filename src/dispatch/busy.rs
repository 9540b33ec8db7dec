use std::time::{Duration, Instant};

/// Single-flight flag: at most one outstanding request per room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusyState<T> {
    Idle,
    Pending { tag: T, since: Instant },
}

impl<T> Default for BusyState<T> {
    fn default() -> Self {
        BusyState::Idle
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{pending} is still waiting for the server")]
pub struct BusyError<T> {
    pub pending: T,
}

impl<T> BusyState<T>
where
    T: Clone + std::fmt::Debug + std::fmt::Display,
{
    /// Move to `Pending(tag)` unless something is already pending.
    ///
    /// With `stale_after` set, a pending flag older than the threshold is
    /// treated as abandoned and replaced.
    pub fn try_begin(&mut self, tag: T, stale_after: Option<Duration>) -> Result<(), BusyError<T>> {
        if let BusyState::Pending { tag: pending, since } = self {
            let stale = stale_after.is_some_and(|limit| since.elapsed() >= limit);
            if !stale {
                return Err(BusyError {
                    pending: pending.clone(),
                });
            }
        }
        *self = BusyState::Pending {
            tag,
            since: Instant::now(),
        };
        Ok(())
    }

    /// Returns the tag that was pending, if any.
    pub fn clear(&mut self) -> Option<T> {
        match std::mem::take(self) {
            BusyState::Idle => None,
            BusyState::Pending { tag, .. } => Some(tag),
        }
    }

    pub fn pending(&self) -> Option<&T> {
        match self {
            BusyState::Idle => None,
            BusyState::Pending { tag, .. } => Some(tag),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending().is_some()
    }
}
