//! Typed binder handles over a type-erased view payload.
//!
//! A [`Binder`] is handed out by the list DSL for one view type. Its `bind`
//! and `with_lifecycle` closures see the concrete view type `V`; internally
//! everything is erased to [`ViewSource`] so the coordinator can dispatch
//! without knowing `V`. The erasure boundary is where a mismatched view
//! surfaces as [`ConfigError::ViewTypeMismatch`] instead of a panic.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use rebind_lifecycle::LifecycleRegistry;

use crate::ConfigError;

/// Type-erased view produced by a binder's view factory.
#[derive(Clone)]
pub struct ViewSource {
    view: Rc<dyn Any>,
    type_name: &'static str,
}

impl ViewSource {
    pub fn new<V: 'static>(view: V) -> Self {
        Self {
            view: Rc::new(view),
            type_name: type_name::<V>(),
        }
    }

    /// Borrow the concrete view back out of the erased payload.
    pub fn downcast_ref<V: 'static>(&self) -> Result<&V, ConfigError> {
        self.view
            .downcast_ref::<V>()
            .ok_or(ConfigError::ViewTypeMismatch {
                expected: type_name::<V>(),
                actual: self.type_name,
            })
    }

    /// Shared handle to the concrete view.
    pub fn downcast_rc<V: 'static>(&self) -> Result<Rc<V>, ConfigError> {
        self.view
            .clone()
            .downcast::<V>()
            .map_err(|_| ConfigError::ViewTypeMismatch {
                expected: type_name::<V>(),
                actual: self.type_name,
            })
    }

    pub fn view_type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Everything a bind closure gets to see: the item, its view and the
/// position inside the committed list (`None` for an off-list bind).
pub struct BindScope<'a, T, V> {
    pub index: Option<usize>,
    pub data: &'a T,
    pub view: &'a V,
}

/// Arguments to a lifecycle setup closure. `data` is `None` when the slot
/// is attached before anything was bound to it.
pub struct AttachScope<'a, T, V> {
    pub data: Option<&'a T>,
    pub view: &'a V,
}

pub(crate) type ViewFactoryFn = Rc<dyn Fn() -> ViewSource>;
pub(crate) type ErasedBindFn<T> =
    Rc<dyn Fn(Option<usize>, &T, &ViewSource) -> Result<(), ConfigError>>;
pub(crate) type ErasedAttachFn<T> =
    Rc<dyn Fn(Option<&T>, &ViewSource, &LifecycleRegistry) -> Result<(), ConfigError>>;

/// Erased closures collected for one view type.
pub(crate) struct BinderSlots<T> {
    pub(crate) create: ViewFactoryFn,
    pub(crate) bind: Option<ErasedBindFn<T>>,
    pub(crate) attach: Option<ErasedAttachFn<T>>,
}

impl<T> BinderSlots<T> {
    pub(crate) fn new(create: ViewFactoryFn) -> Self {
        Self {
            create,
            bind: None,
            attach: None,
        }
    }
}

/// Builder handle for the closures of one view type. Obtained from
/// [`ListScope::create`](crate::ListScope::create); methods chain.
pub struct Binder<T, V> {
    slots: Rc<RefCell<BinderSlots<T>>>,
    _view: PhantomData<V>,
}

impl<T: 'static, V: 'static> Binder<T, V> {
    pub(crate) fn new(slots: Rc<RefCell<BinderSlots<T>>>) -> Self {
        Self {
            slots,
            _view: PhantomData,
        }
    }

    /// Runs on every bind of an item that resolved to this view type.
    pub fn bind(self, bind_view: impl Fn(BindScope<'_, T, V>) + 'static) -> Self {
        let erased: ErasedBindFn<T> = Rc::new(move |index, data, source| {
            let view = source.downcast_ref::<V>()?;
            bind_view(BindScope { index, data, view });
            Ok(())
        });
        self.slots.borrow_mut().bind = Some(erased);
        self
    }

    /// Runs once per lifecycle renewal, before the fresh machine leaves
    /// `Initialized`. Subscriptions registered here are scoped to the
    /// renewed lifecycle and die with it.
    pub fn with_lifecycle(
        self,
        setup: impl Fn(AttachScope<'_, T, V>, &LifecycleRegistry) + 'static,
    ) -> Self {
        let erased: ErasedAttachFn<T> = Rc::new(move |data, source, lifecycle| {
            let view = source.downcast_ref::<V>()?;
            setup(AttachScope { data, view }, lifecycle);
            Ok(())
        });
        self.slots.borrow_mut().attach = Some(erased);
        self
    }
}
