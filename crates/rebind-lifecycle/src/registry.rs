//! The per-item lifecycle state machine.
//!
//! [`LifecycleRegistry`] holds one observable lifecycle: the current state,
//! an ordered observer list, and a ceiling that caps how high the state may
//! climb regardless of what the parent lifecycle reports. All multi-state
//! moves are replayed one step at a time so observers never see a gap.
//!
//! Re-entrancy model: state is updated before any observer is notified, and
//! a walk already in flight absorbs re-entrant transition requests by
//! retargeting instead of recursing.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::{LifecycleError, LifecycleEvent, LifecycleState};

/// Handle identifying one registered observer.
pub type ObserverId = u64;

/// Observer callback: receives each applied event and the state it yielded.
pub type ObserverFn = Rc<dyn Fn(LifecycleEvent, LifecycleState)>;

/// Capability surface of something that owns an observable lifecycle.
///
/// Implemented by [`LifecycleRegistry`] and by anything standing in for a
/// parent screen. Bridges consume this trait rather than a concrete type, so
/// parent owners are shared as `Rc<dyn Lifecycle>`.
pub trait Lifecycle {
    fn current_state(&self) -> LifecycleState;

    /// Registers an observer with a minimum-state requirement.
    ///
    /// The observer fires for every step whose source or target state
    /// satisfies the requirement, so `LifecycleState::Initialized` observes
    /// the full event stream. Registering while the requirement is already
    /// satisfied does not fire retroactively; only future transitions do.
    fn add_observer(&self, min_state: LifecycleState, callback: ObserverFn) -> ObserverId;

    fn remove_observer(&self, id: ObserverId);
}

struct ObserverEntry {
    id: ObserverId,
    min_state: LifecycleState,
    callback: ObserverFn,
}

struct RegistryInner {
    state: LifecycleState,
    ceiling: LifecycleState,
    /// Where the in-flight walk is headed. Only meaningful while `walking`.
    target: LifecycleState,
    walking: bool,
    observers: SmallVec<[ObserverEntry; 4]>,
    next_observer_id: ObserverId,
}

/// One observable lifecycle. Clones share the same underlying machine.
#[derive(Clone)]
pub struct LifecycleRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

enum WalkAction {
    Step(LifecycleEvent),
    /// `Initialized -> Destroyed` has no event to emit; the state flips
    /// directly and nothing is notified.
    DirectDestroy,
    Done,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::with_ceiling(LifecycleState::Resumed)
    }

    pub fn with_ceiling(ceiling: LifecycleState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                state: LifecycleState::Initialized,
                ceiling,
                target: LifecycleState::Initialized,
                walking: false,
                observers: SmallVec::new(),
                next_observer_id: 1,
            })),
        }
    }

    pub fn current_state(&self) -> LifecycleState {
        self.inner.borrow().state
    }

    pub fn ceiling(&self) -> LifecycleState {
        self.inner.borrow().ceiling
    }

    /// Number of currently registered observers. Useful for leak checks.
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Whether two handles refer to the same underlying machine.
    pub fn same_registry(&self, other: &LifecycleRegistry) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Applies one event, validating that it leaves the current state.
    ///
    /// A forward event whose target lies above the ceiling is absorbed as a
    /// clamped no-op; an event whose source state does not match the current
    /// state fails with [`LifecycleError::InvalidTransition`], as does any
    /// event applied after destruction.
    pub fn handle_event(&self, event: LifecycleEvent) -> Result<(), LifecycleError> {
        {
            let inner = self.inner.borrow();
            if inner.state != event.source_state() {
                return Err(LifecycleError::InvalidTransition {
                    event,
                    state: inner.state,
                });
            }
            if event.is_forward() {
                let target = event.target_state();
                if target.min_with(inner.ceiling) != target {
                    return Ok(());
                }
            }
        }
        self.apply_step(event);
        Ok(())
    }

    /// Updates the ceiling.
    ///
    /// If the current state now exceeds the ceiling the machine walks itself
    /// backward synchronously, one event per step. Raising the ceiling never
    /// advances the state; upward motion only happens through forwarded
    /// events (see [`transition_to`](Self::transition_to)). A ceiling of
    /// `Destroyed` is the irreversible teardown request.
    pub fn set_ceiling(&self, ceiling: LifecycleState) {
        let walk_target = {
            let mut inner = self.inner.borrow_mut();
            inner.ceiling = ceiling;
            if inner.state.is_destroyed() {
                return;
            }
            if ceiling.is_destroyed() {
                Some(LifecycleState::Destroyed)
            } else if !ceiling.is_at_least(inner.state) {
                Some(ceiling)
            } else {
                None
            }
        };
        if let Some(target) = walk_target {
            self.transition_to(target);
        }
    }

    /// Walks the machine to `min(target, ceiling)`, replaying every missing
    /// intermediate event in order.
    ///
    /// This is the only upward driver: bridges call it when forwarding
    /// parent events, and teardown calls it with `Destroyed`. A request made
    /// from within an observer notification retargets the walk already in
    /// flight instead of recursing.
    pub fn transition_to(&self, target: LifecycleState) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_destroyed() {
                return;
            }
            let clamped = if target.is_destroyed() {
                target
            } else {
                target.min_with(inner.ceiling)
            };
            inner.target = clamped;
            if inner.walking {
                return;
            }
            inner.walking = true;
        }
        self.run_walk();
        self.inner.borrow_mut().walking = false;
    }

    fn run_walk(&self) {
        loop {
            let action = {
                let inner = self.inner.borrow();
                Self::next_action(inner.state, inner.target)
            };
            match action {
                WalkAction::Step(event) => self.apply_step(event),
                WalkAction::DirectDestroy => {
                    let mut inner = self.inner.borrow_mut();
                    inner.state = LifecycleState::Destroyed;
                    inner.observers.clear();
                }
                WalkAction::Done => return,
            }
        }
    }

    fn next_action(state: LifecycleState, target: LifecycleState) -> WalkAction {
        if state == target || state.is_destroyed() {
            return WalkAction::Done;
        }
        if target.is_destroyed() {
            return match LifecycleEvent::down_from(state) {
                Some(event) => WalkAction::Step(event),
                None => WalkAction::DirectDestroy,
            };
        }
        if target.is_at_least(state) {
            match LifecycleEvent::up_from(state) {
                Some(event) => WalkAction::Step(event),
                None => WalkAction::Done,
            }
        } else {
            // Walking down toward a live target; `Created` is the floor, the
            // only way below is destruction.
            if state == LifecycleState::Created {
                return WalkAction::Done;
            }
            match LifecycleEvent::down_from(state) {
                Some(event) => WalkAction::Step(event),
                None => WalkAction::Done,
            }
        }
    }

    /// Applies exactly one event and notifies observers. State is committed
    /// before any callback runs, so re-entrant reads observe the new state.
    fn apply_step(&self, event: LifecycleEvent) {
        let (new_state, pending) = {
            let mut inner = self.inner.borrow_mut();
            debug_assert_eq!(
                inner.state,
                event.source_state(),
                "lifecycle step applied out of order"
            );
            let prev = inner.state;
            let new_state = event.target_state();
            inner.state = new_state;
            let pending: SmallVec<[(ObserverId, ObserverFn); 4]> = inner
                .observers
                .iter()
                .filter(|entry| {
                    prev.is_at_least(entry.min_state) || new_state.is_at_least(entry.min_state)
                })
                .map(|entry| (entry.id, entry.callback.clone()))
                .collect();
            (new_state, pending)
        };
        for (id, callback) in pending {
            // An observer removed by an earlier callback in this same step
            // must not fire; removal never affects other observers.
            let still_registered = self
                .inner
                .borrow()
                .observers
                .iter()
                .any(|entry| entry.id == id);
            if still_registered {
                callback(event, new_state);
            }
        }
        if new_state.is_destroyed() {
            // Drop observer closures so nothing dangles off a dead machine.
            self.inner.borrow_mut().observers.clear();
        }
    }
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for LifecycleRegistry {
    fn current_state(&self) -> LifecycleState {
        LifecycleRegistry::current_state(self)
    }

    fn add_observer(&self, min_state: LifecycleState, callback: ObserverFn) -> ObserverId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_observer_id;
        inner.next_observer_id += 1;
        inner.observers.push(ObserverEntry {
            id,
            min_state,
            callback,
        });
        id
    }

    fn remove_observer(&self, id: ObserverId) {
        self.inner
            .borrow_mut()
            .observers
            .retain(|entry| entry.id != id);
    }
}
