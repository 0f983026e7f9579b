//! Lifecycle states and their ordering.

/// Observable lifecycle state of one recyclable item.
///
/// The live states form a total order `Initialized < Created < Started <
/// Resumed`. `Destroyed` is terminal and absorbing: it is reachable from
/// every live state, is never left, and does not participate in the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Initialized,
    Created,
    Started,
    Resumed,
    Destroyed,
}

impl LifecycleState {
    /// Position in the live order. `Destroyed` has no rank.
    fn rank(self) -> Option<u8> {
        match self {
            LifecycleState::Initialized => Some(0),
            LifecycleState::Created => Some(1),
            LifecycleState::Started => Some(2),
            LifecycleState::Resumed => Some(3),
            LifecycleState::Destroyed => None,
        }
    }

    /// Whether this state is at or above `other` in the live order.
    ///
    /// `Destroyed` is never at least anything, and nothing is at least
    /// `Destroyed`; the terminal state only answers equality.
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }

    /// The lower of two states. `Destroyed` clamps everything, so a ceiling
    /// of `Destroyed` means the machine may not run at all.
    pub fn min_with(self, other: LifecycleState) -> LifecycleState {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => {
                if a <= b {
                    self
                } else {
                    other
                }
            }
            _ => LifecycleState::Destroyed,
        }
    }

    pub fn is_destroyed(self) -> bool {
        matches!(self, LifecycleState::Destroyed)
    }
}
