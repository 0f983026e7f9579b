//! Lifecycle synchronization for recycled list items.
//!
//! Virtualized list containers reuse a small pool of item slots while the
//! screen that owns them runs its own lifecycle. This crate gives each slot
//! a well-formed lifecycle of its own that follows the owning screen, never
//! outlives it, and is torn down and recreated whenever the slot is reused
//! for different data:
//!
//! - [`LifecycleRegistry`] - the per-item state machine with a ceiling clamp
//! - [`Lifecycle`] - the capability trait parent owners expose
//! - [`ParentLifecycleBridge`] - forwards parent events into a child machine
//! - [`ItemLifecycleController`] - owns one (registry, bridge) pair per slot
//!   and decides when it is renewed
//!
//! Everything here is single-owner and single-threaded; synchronization is
//! cooperative, driven by the container's synchronous callback dispatch.

mod bridge;
mod controller;
mod event;
mod registry;
mod state;

#[cfg(test)]
mod tests;

pub use bridge::ParentLifecycleBridge;
pub use controller::{AttachFn, BindFn, ContainerId, ItemLifecycleController};
pub use event::LifecycleEvent;
pub use registry::{Lifecycle, LifecycleRegistry, ObserverFn, ObserverId};
pub use state::LifecycleState;

/// Failures surfaced by the lifecycle core.
///
/// `InvalidTransition` marks a programming error (an event inconsistent with
/// the current state); given how bridges replay intermediate events it is
/// unreachable from forwarded parent events. `NotInitialized` is returned
/// when a slot's lifecycle is used before its first attach or after a
/// permanent recycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    InvalidTransition {
        event: LifecycleEvent,
        state: LifecycleState,
    },
    NotInitialized,
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::InvalidTransition { event, state } => {
                write!(f, "event {event:?} is invalid in state {state:?}")
            }
            LifecycleError::NotInitialized => {
                write!(f, "lifecycle accessed before first attach")
            }
        }
    }
}

impl std::error::Error for LifecycleError {}
