//! Coordination between the committed data snapshot and live item slots.
//!
//! The [`ListCoordinator`] owns the committed item list, mints [`ItemSlot`]s
//! on demand and routes the container's attach/detach/bind/recycle callbacks
//! to the right slot controller. Slots are tracked weakly; a slot the
//! container stopped referencing drops its own lifecycle wiring without the
//! coordinator's involvement.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use rebind_lifecycle::{
    AttachFn, BindFn, ContainerId, ItemLifecycleController, Lifecycle, LifecycleError,
    LifecycleRegistry,
};

use crate::binder::{BinderSlots, ViewSource};
use crate::diff::{diff, ListUpdate};
use crate::scope::{ListConfig, ViewType};
use crate::{ConfigError, ListError};

pub type SlotKey = u64;
pub type UpdateListener = Rc<dyn Fn(&ListUpdate)>;

struct SlotInner<T> {
    key: SlotKey,
    view: ViewSource,
    position: Rc<Cell<Option<usize>>>,
    bind_error: Rc<RefCell<Option<ConfigError>>>,
    controller: ItemLifecycleController<T>,
}

/// One recyclable item slot: a view plus the controller that owns its
/// lifecycle. Cloning shares the slot.
pub struct ItemSlot<T> {
    inner: Rc<SlotInner<T>>,
}

impl<T> Clone for ItemSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> ItemSlot<T> {
    pub fn key(&self) -> SlotKey {
        self.inner.key
    }

    /// Position inside the committed list, while bound.
    pub fn position(&self) -> Option<usize> {
        self.inner.position.get()
    }

    /// The slot's concrete view.
    pub fn view<V: 'static>(&self) -> Result<Rc<V>, ConfigError> {
        self.inner.view.downcast_rc::<V>()
    }

    /// The slot's live lifecycle handle.
    pub fn lifecycle(&self) -> Result<LifecycleRegistry, LifecycleError> {
        self.inner.controller.lifecycle()
    }
}

/// Drives every slot of one virtualized list.
pub struct ListCoordinator<T> {
    config: ListConfig<T>,
    items: RefCell<Vec<Rc<T>>>,
    /// Last full submission, unaffected by filtered submits.
    unfiltered: RefCell<Vec<Rc<T>>>,
    slots: RefCell<FxHashMap<SlotKey, Weak<SlotInner<T>>>>,
    next_slot_key: Cell<SlotKey>,
    update_listener: RefCell<Option<UpdateListener>>,
}

impl<T: 'static> ListCoordinator<T> {
    pub fn new(config: ListConfig<T>) -> Self {
        Self {
            config,
            items: RefCell::new(Vec::new()),
            unfiltered: RefCell::new(Vec::new()),
            slots: RefCell::new(FxHashMap::default()),
            next_slot_key: Cell::new(0),
            update_listener: RefCell::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn item(&self, index: usize) -> Option<Rc<T>> {
        self.items.borrow().get(index).cloned()
    }

    /// Shared handles to the committed snapshot, in order.
    pub fn current_list(&self) -> Vec<Rc<T>> {
        self.items.borrow().clone()
    }

    /// The last full submission. Filtered submits narrow what is displayed
    /// without touching this snapshot, so a filter can always be widened
    /// back from it.
    pub fn unfiltered_list(&self) -> Vec<Rc<T>> {
        self.unfiltered.borrow().clone()
    }

    /// View type the container should mint a slot with for `index`.
    pub fn view_type_at(&self, index: usize) -> Result<ViewType, ListError> {
        let items = self.items.borrow();
        let item = items.get(index).ok_or(ListError::IndexOutOfBounds {
            index,
            len: items.len(),
        })?;
        Ok(self.config.view_type_of(item, index))
    }

    /// Receives every positional update produced by [`submit`](Self::submit).
    pub fn set_update_listener(&self, listener: impl Fn(&ListUpdate) + 'static) {
        *self.update_listener.borrow_mut() = Some(Rc::new(listener));
    }

    /// Commits a new snapshot. The snapshot is swapped in before the
    /// update listener or `on_commit` observe anything, so both read the
    /// new list. `on_commit` runs exactly once, after all updates.
    pub fn submit(&self, data: Vec<T>) {
        self.submit_with(data, || {});
    }

    pub fn submit_with(&self, data: Vec<T>, on_commit: impl FnOnce()) {
        let new: Vec<Rc<T>> = data.into_iter().map(Rc::new).collect();
        *self.unfiltered.borrow_mut() = new.clone();
        self.commit(new, on_commit);
    }

    /// Commits a narrowed view of the data without replacing the
    /// unfiltered snapshot; used to display filter results while keeping
    /// the full list recoverable.
    pub fn submit_filtered(&self, data: Vec<T>) {
        self.submit_filtered_with(data, || {});
    }

    pub fn submit_filtered_with(&self, data: Vec<T>, on_commit: impl FnOnce()) {
        let new: Vec<Rc<T>> = data.into_iter().map(Rc::new).collect();
        self.commit(new, on_commit);
    }

    fn commit(&self, new: Vec<Rc<T>>, on_commit: impl FnOnce()) {
        let updates = {
            let old = self.items.borrow();
            diff(
                &old,
                &new,
                self.config.same_identity.as_ref(),
                self.config.same_content.as_ref(),
            )
        };
        *self.items.borrow_mut() = new;
        let listener = self.update_listener.borrow().clone();
        if let Some(listener) = listener {
            for update in &updates {
                listener(update);
            }
        }
        on_commit();
    }

    /// Mints a fresh slot for `view_type`, running the binder's view
    /// factory. The slot starts unattached and unbound.
    pub fn create_item(&self, view_type: ViewType) -> ItemSlot<T> {
        let binder = self.config.binder_for(view_type);
        let view = {
            let create = binder.borrow().create.clone();
            create()
        };
        let key = self.next_slot_key.get();
        self.next_slot_key.set(key + 1);

        let position = Rc::new(Cell::new(None));
        let bind_error = Rc::new(RefCell::new(None));
        let attach = Self::attach_fn(binder.clone(), view.clone());
        let bind = Self::bind_fn(binder, view.clone(), position.clone(), bind_error.clone());

        let inner = Rc::new_cyclic(|weak: &Weak<SlotInner<T>>| {
            // The slot itself is the weak owner probed by the bridge: once
            // the container drops its last handle, the next parent event
            // severs the subscription.
            let owner: Weak<dyn Any> = weak.clone();
            SlotInner {
                key,
                view,
                position,
                bind_error,
                controller: ItemLifecycleController::new(
                    owner,
                    self.config.same_identity.clone(),
                    attach,
                    bind,
                ),
            }
        });

        let mut slots = self.slots.borrow_mut();
        slots.retain(|_, slot| slot.strong_count() > 0);
        slots.insert(key, Rc::downgrade(&inner));
        ItemSlot { inner }
    }

    fn attach_fn(binder: Rc<RefCell<BinderSlots<T>>>, view: ViewSource) -> AttachFn<T> {
        let warned = Cell::new(false);
        Rc::new(move |data, lifecycle| {
            let setup = binder.borrow().attach.clone();
            match setup {
                Some(setup) => {
                    if let Err(err) = setup(data, &view, lifecycle) {
                        log::error!("lifecycle setup failed: {err}");
                    }
                }
                None => {
                    if !warned.replace(true) {
                        log::warn!("no with_lifecycle() configured; attach does nothing");
                    }
                }
            }
        })
    }

    fn bind_fn(
        binder: Rc<RefCell<BinderSlots<T>>>,
        view: ViewSource,
        position: Rc<Cell<Option<usize>>>,
        bind_error: Rc<RefCell<Option<ConfigError>>>,
    ) -> BindFn<T> {
        let warned = Cell::new(false);
        Rc::new(move |data| {
            let bind = binder.borrow().bind.clone();
            match bind {
                Some(bind) => {
                    if let Err(err) = bind(position.get(), data, &view) {
                        *bind_error.borrow_mut() = Some(err);
                    }
                }
                None => {
                    if !warned.replace(true) {
                        log::warn!("no bind() configured; binding does nothing");
                    }
                }
            }
        })
    }

    /// Binds the committed item at `index` into `slot`.
    pub fn bind(&self, slot: &ItemSlot<T>, index: usize) -> Result<(), ListError> {
        let item = {
            let items = self.items.borrow();
            items
                .get(index)
                .cloned()
                .ok_or(ListError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                })?
        };
        slot.inner.position.set(Some(index));
        slot.inner.controller.on_data_bound(item)?;
        if let Some(err) = slot.inner.bind_error.borrow_mut().take() {
            return Err(err.into());
        }
        Ok(())
    }

    /// The container moved `slot` into its visible window.
    pub fn item_attached(
        &self,
        slot: &ItemSlot<T>,
        parent: Rc<dyn Lifecycle>,
        container: ContainerId,
    ) {
        slot.inner.controller.on_attached(parent, container);
    }

    /// The container moved `slot` out of its visible window.
    pub fn item_detached(&self, slot: &ItemSlot<T>, container: ContainerId) {
        slot.inner.controller.on_detached(container);
    }

    /// The container recycled `slot`. A recycle reported by a container
    /// the slot has since left is stale and ignored.
    pub fn item_recycled(&self, slot: &ItemSlot<T>, container: ContainerId) {
        match slot.inner.controller.last_container() {
            Some(last) if last != container => {
                log::trace!("ignoring recycle from stale container {container:?}");
            }
            _ => {
                slot.inner.controller.on_recycled();
                slot.inner.position.set(None);
            }
        }
    }

    /// Destroys the lifecycle of every still-reachable slot. The list and
    /// its configuration stay usable; new slots can be minted afterwards.
    pub fn dispose(&self) {
        let live: Vec<Rc<SlotInner<T>>> = {
            let mut slots = self.slots.borrow_mut();
            let live = slots.values().filter_map(Weak::upgrade).collect();
            slots.clear();
            live
        };
        for slot in live {
            slot.controller.destroy();
            slot.position.set(None);
        }
    }
}
