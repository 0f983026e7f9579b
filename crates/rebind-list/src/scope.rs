//! The list configuration DSL.
//!
//! A [`ListScope`] collects identity/content comparators, an optional view
//! type mapper and one binder per view type, then freezes into a validated
//! [`ListConfig`]. Validation happens once at `build`; dispatch never has to
//! re-check that a binder exists for the default view type.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::binder::{Binder, BinderSlots, ViewSource};
use crate::ConfigError;

/// Discriminator for heterogeneous item views. Lists with a single view
/// type never see it; it defaults to [`DEFAULT_VIEW_TYPE`].
pub type ViewType = u32;

pub const DEFAULT_VIEW_TYPE: ViewType = 0;

pub(crate) type IdentityFn<T> = Rc<dyn Fn(&T, &T) -> bool>;
pub(crate) type ViewTypeFn<T> = Rc<dyn Fn(&T, usize) -> ViewType>;

/// Mutable collection stage of the DSL.
pub struct ListScope<T> {
    same_identity: IdentityFn<T>,
    same_content: IdentityFn<T>,
    view_types: Option<ViewTypeFn<T>>,
    default_binder: Option<Rc<RefCell<BinderSlots<T>>>>,
    typed_binders: FxHashMap<ViewType, Rc<RefCell<BinderSlots<T>>>>,
}

impl<T: 'static> ListScope<T> {
    pub fn new(
        same_identity: impl Fn(&T, &T) -> bool + 'static,
        same_content: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self {
            same_identity: Rc::new(same_identity),
            same_content: Rc::new(same_content),
            view_types: None,
            default_binder: None,
            typed_binders: FxHashMap::default(),
        }
    }

    /// Replaces the identity comparator.
    pub fn item_equals(&mut self, same_identity: impl Fn(&T, &T) -> bool + 'static) {
        self.same_identity = Rc::new(same_identity);
    }

    /// Replaces the content comparator.
    pub fn content_equals(&mut self, same_content: impl Fn(&T, &T) -> bool + 'static) {
        self.same_content = Rc::new(same_content);
    }

    /// Maps items to view types. Required as soon as any binder is
    /// registered through [`create_for`](Self::create_for).
    pub fn view_types(&mut self, mapper: impl Fn(&T, usize) -> ViewType + 'static) {
        self.view_types = Some(Rc::new(mapper));
    }

    /// Registers the default binder, used for every item whose view type
    /// has no dedicated binder.
    pub fn create<V: 'static>(&mut self, make_view: impl Fn() -> V + 'static) -> Binder<T, V> {
        let slots = Self::slots_for(make_view);
        self.default_binder = Some(slots.clone());
        Binder::new(slots)
    }

    /// Registers a binder for one specific view type.
    pub fn create_for<V: 'static>(
        &mut self,
        view_type: ViewType,
        make_view: impl Fn() -> V + 'static,
    ) -> Binder<T, V> {
        let slots = Self::slots_for(make_view);
        self.typed_binders.insert(view_type, slots.clone());
        Binder::new(slots)
    }

    fn slots_for<V: 'static>(
        make_view: impl Fn() -> V + 'static,
    ) -> Rc<RefCell<BinderSlots<T>>> {
        Rc::new(RefCell::new(BinderSlots::new(Rc::new(move || {
            ViewSource::new(make_view())
        }))))
    }

    /// Validates and freezes the configuration.
    pub fn build(self) -> Result<ListConfig<T>, ConfigError> {
        let default_binder = self.default_binder.ok_or(ConfigError::MissingBinder)?;
        if !self.typed_binders.is_empty() && self.view_types.is_none() {
            return Err(ConfigError::MissingViewTypeMapper);
        }
        Ok(ListConfig {
            same_identity: self.same_identity,
            same_content: self.same_content,
            view_types: self.view_types,
            default_binder,
            typed_binders: self.typed_binders,
        })
    }
}

impl<T: PartialEq + 'static> ListScope<T> {
    /// Comparators from `PartialEq`: every content change is also an
    /// identity change, so each update renews the item lifecycle.
    pub fn with_eq() -> Self {
        Self::new(|a, b| a == b, |a, b| a == b)
    }
}

/// Frozen list configuration; consumed by the coordinator.
pub struct ListConfig<T> {
    pub(crate) same_identity: IdentityFn<T>,
    pub(crate) same_content: IdentityFn<T>,
    view_types: Option<ViewTypeFn<T>>,
    default_binder: Rc<RefCell<BinderSlots<T>>>,
    typed_binders: FxHashMap<ViewType, Rc<RefCell<BinderSlots<T>>>>,
}

impl<T> ListConfig<T> {
    pub(crate) fn view_type_of(&self, item: &T, index: usize) -> ViewType {
        match &self.view_types {
            Some(mapper) => mapper(item, index),
            None => DEFAULT_VIEW_TYPE,
        }
    }

    /// Dedicated binder for `view_type`, falling back to the default.
    pub(crate) fn binder_for(&self, view_type: ViewType) -> Rc<RefCell<BinderSlots<T>>> {
        self.typed_binders
            .get(&view_type)
            .unwrap_or(&self.default_binder)
            .clone()
    }
}
