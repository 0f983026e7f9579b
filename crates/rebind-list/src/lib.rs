//! Lifecycle-aware virtualized lists.
//!
//! Glue between a virtualization container and the lifecycle core: a small
//! DSL ([`ListScope`]) configures per-view-type binders, [`ListCoordinator`]
//! owns the committed snapshot and diffs new submissions into positional
//! updates, and every minted [`ItemSlot`] carries its own
//! [`ItemLifecycleController`](rebind_lifecycle::ItemLifecycleController)
//! wired to the owning screen's lifecycle.
//!
//! Like the core crate, everything is single-threaded and callback-driven.

mod binder;
mod coordinator;
mod diff;
mod scope;

#[cfg(test)]
mod tests;

pub use binder::{AttachScope, Binder, BindScope, ViewSource};
pub use coordinator::{ItemSlot, ListCoordinator, SlotKey, UpdateListener};
pub use diff::ListUpdate;
pub use scope::{ListConfig, ListScope, ViewType, DEFAULT_VIEW_TYPE};

pub use rebind_lifecycle::{ContainerId, Lifecycle, LifecycleError, LifecycleState};

/// Configuration mistakes caught at build time or at the erasure boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `build` was called without a default binder.
    MissingBinder,
    /// Typed binders were registered but no `view_types` mapper was set.
    MissingViewTypeMapper,
    /// A binder closure asked for a view type the slot was not created with.
    ViewTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingBinder => write!(f, "no default binder registered"),
            ConfigError::MissingViewTypeMapper => {
                write!(f, "typed binders registered without a view type mapper")
            }
            ConfigError::ViewTypeMismatch { expected, actual } => {
                write!(f, "expected view of type {expected}, slot holds {actual}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failures surfaced by list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    Lifecycle(LifecycleError),
    Config(ConfigError),
    IndexOutOfBounds { index: usize, len: usize },
}

impl From<LifecycleError> for ListError {
    fn from(err: LifecycleError) -> Self {
        ListError::Lifecycle(err)
    }
}

impl From<ConfigError> for ListError {
    fn from(err: ConfigError) -> Self {
        ListError::Config(err)
    }
}

impl std::fmt::Display for ListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListError::Lifecycle(err) => err.fmt(f),
            ListError::Config(err) => err.fmt(f),
            ListError::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for a list of {len}")
            }
        }
    }
}

impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListError::Lifecycle(err) => Some(err),
            ListError::Config(err) => Some(err),
            ListError::IndexOutOfBounds { .. } => None,
        }
    }
}
