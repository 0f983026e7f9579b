//! Lifecycle events and the single-step transition table.

use crate::state::LifecycleState;

/// One step of a lifecycle. Every event moves the machine exactly one state
/// up or down; multi-state moves are expressed as event sequences so no
/// observer ever sees a skipped step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    /// The state the machine must be in for this event to apply.
    pub fn source_state(self) -> LifecycleState {
        match self {
            LifecycleEvent::Create => LifecycleState::Initialized,
            LifecycleEvent::Start => LifecycleState::Created,
            LifecycleEvent::Resume => LifecycleState::Started,
            LifecycleEvent::Pause => LifecycleState::Resumed,
            LifecycleEvent::Stop => LifecycleState::Started,
            LifecycleEvent::Destroy => LifecycleState::Created,
        }
    }

    /// The state this event yields.
    pub fn target_state(self) -> LifecycleState {
        match self {
            LifecycleEvent::Create => LifecycleState::Created,
            LifecycleEvent::Start => LifecycleState::Started,
            LifecycleEvent::Resume => LifecycleState::Resumed,
            LifecycleEvent::Pause => LifecycleState::Started,
            LifecycleEvent::Stop => LifecycleState::Created,
            LifecycleEvent::Destroy => LifecycleState::Destroyed,
        }
    }

    /// True for events that raise the state.
    pub fn is_forward(self) -> bool {
        matches!(
            self,
            LifecycleEvent::Create | LifecycleEvent::Start | LifecycleEvent::Resume
        )
    }

    /// The forward event leaving `state`, if one exists.
    pub fn up_from(state: LifecycleState) -> Option<LifecycleEvent> {
        match state {
            LifecycleState::Initialized => Some(LifecycleEvent::Create),
            LifecycleState::Created => Some(LifecycleEvent::Start),
            LifecycleState::Started => Some(LifecycleEvent::Resume),
            LifecycleState::Resumed | LifecycleState::Destroyed => None,
        }
    }

    /// The backward event leaving `state`, if one exists. Leaving `Created`
    /// downward is `Destroy` and is irreversible.
    pub fn down_from(state: LifecycleState) -> Option<LifecycleEvent> {
        match state {
            LifecycleState::Resumed => Some(LifecycleEvent::Pause),
            LifecycleState::Started => Some(LifecycleEvent::Stop),
            LifecycleState::Created => Some(LifecycleEvent::Destroy),
            LifecycleState::Initialized | LifecycleState::Destroyed => None,
        }
    }
}
