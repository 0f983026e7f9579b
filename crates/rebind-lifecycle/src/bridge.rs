//! Forwards parent lifecycle events into a child registry.

use std::any::Any;
use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::registry::{Lifecycle, LifecycleRegistry, ObserverId};
use crate::{LifecycleEvent, LifecycleState};

/// Subscription object tying one child [`LifecycleRegistry`] to a parent
/// lifecycle surface.
///
/// The bridge holds the owning component only weakly: if the owner has been
/// reclaimed by the time a parent event arrives, the bridge unsubscribes
/// itself instead of forwarding, leaving the child frozen in its last state.
/// The parent's observer list in turn only captures a `Weak` of the bridge,
/// so a parent never keeps its children alive.
/// Clones share the same subscription; it is released once when the last
/// clone drops or when [`unsubscribe`](Self::unsubscribe) is called.
#[derive(Clone)]
pub struct ParentLifecycleBridge {
    inner: Rc<BridgeInner>,
}

struct BridgeInner {
    parent: Rc<dyn Lifecycle>,
    child: LifecycleRegistry,
    owner: Weak<dyn Any>,
    observer: Cell<Option<ObserverId>>,
}

impl ParentLifecycleBridge {
    /// Subscribes to `parent` and synchronizes `child` up to
    /// `min(parent.current_state(), child ceiling)` by replaying the missing
    /// intermediate events.
    pub fn new(parent: Rc<dyn Lifecycle>, child: LifecycleRegistry, owner: Weak<dyn Any>) -> Self {
        let inner = Rc::new(BridgeInner {
            parent: parent.clone(),
            child,
            owner,
            observer: Cell::new(None),
        });
        let weak = Rc::downgrade(&inner);
        let id = parent.add_observer(
            LifecycleState::Initialized,
            Rc::new(move |event, _state| {
                // A dropped bridge already unsubscribed via Drop; nothing to do.
                if let Some(bridge) = weak.upgrade() {
                    bridge.on_parent_event(event);
                }
            }),
        );
        inner.observer.set(Some(id));
        let bridge = Self { inner };
        bridge.inner.sync_with_parent();
        bridge
    }

    /// Re-synchronizes the child to the parent's current state, clamped by
    /// the child's ceiling. Called after the ceiling is raised, since a
    /// ceiling raise on its own never advances the state.
    pub fn sync_with_parent(&self) {
        self.inner.sync_with_parent();
    }

    /// Stops observing the parent. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        self.inner.unsubscribe();
    }

    /// Whether the parent subscription is still live.
    pub fn is_subscribed(&self) -> bool {
        let id = self.inner.observer.take();
        self.inner.observer.set(id);
        id.is_some()
    }
}

impl BridgeInner {
    fn on_parent_event(&self, event: LifecycleEvent) {
        if self.owner.strong_count() == 0 {
            // Owner reclaimed: stop observing rather than act on a dangling
            // component. The child stays frozen until explicit teardown.
            self.unsubscribe();
            return;
        }
        if self.child.current_state().is_destroyed() {
            self.unsubscribe();
            return;
        }
        let target = event.target_state();
        self.child.transition_to(target);
        if target.is_destroyed() {
            self.unsubscribe();
        }
    }

    fn sync_with_parent(&self) {
        if self.owner.strong_count() == 0 {
            self.unsubscribe();
            return;
        }
        if self.child.current_state().is_destroyed() {
            self.unsubscribe();
            return;
        }
        let parent_state = self.parent.current_state();
        self.child.transition_to(parent_state);
        if parent_state.is_destroyed() {
            self.unsubscribe();
        }
    }

    fn unsubscribe(&self) {
        if let Some(id) = self.observer.take() {
            self.parent.remove_observer(id);
        }
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        if let Some(id) = self.observer.take() {
            self.parent.remove_observer(id);
        }
    }
}
