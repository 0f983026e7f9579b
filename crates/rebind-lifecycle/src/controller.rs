//! Per-slot ownership of one (registry, bridge) pair.
//!
//! An [`ItemLifecycleController`] decides when the pair for a recyclable
//! item slot is created, renewed (destroy + recreate) and destroyed, driven
//! by the container's attach/detach/recycle stream and by data-identity
//! changes on bind. Every walk - teardown, setup and detach alike - is
//! synchronous and non-reentrant: bookkeeping is mutated before
//! notifications fire, and structural calls made from inside any in-flight
//! notification are rejected.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::bridge::ParentLifecycleBridge;
use crate::registry::{Lifecycle, LifecycleRegistry};
use crate::{LifecycleError, LifecycleState};

/// Identity of the virtualization container a slot is attached to. Used to
/// discard stale detach/recycle notifications after the slot has been
/// recycled into a different container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

/// Invoked once per renewal with the freshly created lifecycle handle.
/// The data reference is `None` only if nothing has been bound yet.
pub type AttachFn<T> = Rc<dyn Fn(Option<&T>, &LifecycleRegistry)>;

/// Invoked on every bind, renewal or not.
pub type BindFn<T> = Rc<dyn Fn(&T)>;

struct Pair {
    registry: LifecycleRegistry,
    bridge: Option<ParentLifecycleBridge>,
}

struct ControllerInner<T> {
    pair: Option<Pair>,
    last_parent: Option<Rc<dyn Lifecycle>>,
    last_container: Option<ContainerId>,
    last_data: Option<Rc<T>>,
    /// Set by `on_recycled`; binds are rejected until the next attach.
    recycled: bool,
    /// A lifecycle walk is in flight; re-entrant structural calls bounce.
    busy: bool,
}

/// Controller for one recyclable item slot.
pub struct ItemLifecycleController<T> {
    inner: Rc<RefCell<ControllerInner<T>>>,
    owner: Weak<dyn Any>,
    same_identity: Rc<dyn Fn(&T, &T) -> bool>,
    attach: AttachFn<T>,
    bind: BindFn<T>,
}

impl<T: 'static> ItemLifecycleController<T> {
    /// `owner` is the component (view holder, slot) whose reclamation should
    /// sever the parent subscription; it is probed weakly at dispatch time.
    pub fn new(
        owner: Weak<dyn Any>,
        same_identity: Rc<dyn Fn(&T, &T) -> bool>,
        attach: AttachFn<T>,
        bind: BindFn<T>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                pair: None,
                last_parent: None,
                last_container: None,
                last_data: None,
                recycled: false,
                busy: false,
            })),
            owner,
            same_identity,
            attach,
            bind,
        }
    }

    /// The live lifecycle handle, or `NotInitialized` before the first
    /// attach and after a permanent recycle.
    pub fn lifecycle(&self) -> Result<LifecycleRegistry, LifecycleError> {
        self.inner
            .borrow()
            .pair
            .as_ref()
            .map(|pair| pair.registry.clone())
            .ok_or(LifecycleError::NotInitialized)
    }

    /// Container this slot last attached to, if any.
    pub fn last_container(&self) -> Option<ContainerId> {
        self.inner.borrow().last_container
    }

    /// The slot entered the container's visible window.
    ///
    /// Re-attachment under the same parent keeps the live pair and only
    /// raises the ceiling back to `Resumed`; a new parent (or no pair)
    /// triggers a full renewal. Either way the item ends up synchronized to
    /// `min(parent state, Resumed)` through explicitly forwarded events.
    pub fn on_attached(&self, parent: Rc<dyn Lifecycle>, container: ContainerId) {
        let same_parent = {
            let mut inner = self.inner.borrow_mut();
            if inner.busy {
                log::warn!("attach during an in-flight lifecycle walk; ignoring");
                return;
            }
            inner.recycled = false;
            inner.last_container = Some(container);
            let same = inner.pair.is_some()
                && inner
                    .last_parent
                    .as_ref()
                    .is_some_and(|last| Rc::ptr_eq(last, &parent));
            if !same {
                inner.last_parent = Some(parent.clone());
            }
            same
        };
        if same_parent {
            self.reactivate();
        } else {
            self.renew(parent, None);
        }
    }

    /// The slot left the visible window. Lowers the ceiling to `Created`
    /// (walking `Pause`, `Stop`); the pair stays alive for re-attachment.
    pub fn on_detached(&self, container: ContainerId) {
        let registry = {
            let mut inner = self.inner.borrow_mut();
            if inner.busy {
                log::warn!("detach during an in-flight lifecycle walk; ignoring");
                return;
            }
            if inner.last_container != Some(container) {
                // Stale notification from a container this slot has since
                // left; an expected race in virtualization.
                log::trace!("ignoring detach from stale container {container:?}");
                return;
            }
            let registry = inner.pair.as_ref().map(|pair| pair.registry.clone());
            if registry.is_some() {
                inner.busy = true;
            }
            registry
        };
        if let Some(registry) = registry {
            registry.set_ceiling(LifecycleState::Created);
            self.inner.borrow_mut().busy = false;
        }
    }

    /// New data bound to the slot. An identity change while a parent is
    /// known renews the pair before the bind callback runs with the new
    /// data; identity-equal data skips straight to the bind callback.
    pub fn on_data_bound(&self, data: Rc<T>) -> Result<(), LifecycleError> {
        let renew_parent = {
            let inner = self.inner.borrow();
            if inner.recycled {
                return Err(LifecycleError::NotInitialized);
            }
            if inner.busy {
                log::warn!("bind during an in-flight lifecycle walk; ignoring");
                return Ok(());
            }
            let identity_changed = match &inner.last_data {
                Some(last) => !(self.same_identity)(last, &data),
                None => true,
            };
            if identity_changed {
                inner.last_parent.clone()
            } else {
                None
            }
        };
        if let Some(parent) = renew_parent {
            self.renew(parent, Some(data.clone()));
        }
        (self.bind)(&data);
        self.inner.borrow_mut().last_data = Some(data);
        Ok(())
    }

    /// The slot was permanently recycled: destroy the pair and forget all
    /// bookkeeping. Subsequent binds fail until the next attach.
    pub fn on_recycled(&self) {
        if !self.teardown_guarded() {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        inner.last_parent = None;
        inner.last_container = None;
        inner.last_data = None;
        inner.recycled = true;
    }

    /// Destroys the current pair without touching attach bookkeeping.
    /// Idempotent; used by whole-container teardown broadcasts.
    pub fn destroy(&self) {
        self.teardown_guarded();
    }

    /// Destroy-then-recreate of the pair against `parent`. The old pair's
    /// teardown notifications are fully delivered before any setup call for
    /// the new pair begins; the busy flag is held across the whole renewal,
    /// including the setup walk, so nothing can interleave a second pair.
    fn renew(&self, parent: Rc<dyn Lifecycle>, fresh_data: Option<Rc<T>>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.busy {
                log::warn!("renewal during an in-flight lifecycle walk; ignoring");
                return;
            }
            inner.busy = true;
        }
        self.teardown_pair();

        // New machine starts capped at Created so a recycled view cannot
        // shoot straight to Resumed before its setup callbacks ran.
        let registry = LifecycleRegistry::with_ceiling(LifecycleState::Created);
        self.inner.borrow_mut().pair = Some(Pair {
            registry: registry.clone(),
            bridge: None,
        });

        let data = fresh_data.or_else(|| self.inner.borrow().last_data.clone());
        (self.attach)(data.as_deref(), &registry);

        let bridge = ParentLifecycleBridge::new(parent, registry.clone(), self.owner.clone());
        if let Some(pair) = self.inner.borrow_mut().pair.as_mut() {
            pair.bridge = Some(bridge.clone());
        }

        registry.set_ceiling(LifecycleState::Resumed);
        bridge.sync_with_parent();
        self.inner.borrow_mut().busy = false;
    }

    /// Raises the ceiling to `Resumed` and replays the parent's state
    /// through the bridge. The ceiling raise itself never moves the state;
    /// the bridge sync is the explicit forward driver. Holds the busy flag
    /// so the setup walk rejects structural re-entry like teardown does.
    fn reactivate(&self) {
        let handles = {
            let mut inner = self.inner.borrow_mut();
            let handles = inner
                .pair
                .as_ref()
                .map(|pair| (pair.registry.clone(), pair.bridge.clone()));
            if handles.is_some() {
                inner.busy = true;
            }
            handles
        };
        let Some((registry, bridge)) = handles else {
            return;
        };
        registry.set_ceiling(LifecycleState::Resumed);
        if let Some(bridge) = bridge {
            bridge.sync_with_parent();
        }
        self.inner.borrow_mut().busy = false;
    }

    /// Busy-guarded teardown. Returns false when rejected re-entrantly.
    fn teardown_guarded(&self) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.busy {
                log::warn!("teardown during an in-flight lifecycle walk; ignoring");
                return false;
            }
            inner.busy = true;
        }
        self.teardown_pair();
        self.inner.borrow_mut().busy = false;
        true
    }

    /// Unsubscribes the bridge and walks the registry down to `Destroyed`.
    /// The pair reference is dropped before notifications are emitted, so
    /// re-entrant reads observe an already-torn-down controller.
    fn teardown_pair(&self) {
        let pair = self.inner.borrow_mut().pair.take();
        let Some(pair) = pair else {
            return;
        };
        if let Some(bridge) = &pair.bridge {
            bridge.unsubscribe();
        }
        pair.registry.set_ceiling(LifecycleState::Destroyed);
    }
}
