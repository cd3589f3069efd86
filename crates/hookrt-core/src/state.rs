use std::fmt;

use crate::error::Result;
use crate::instance::InstanceId;
use crate::reducer::Dispatch;

/// Queued change to a state slot.
pub enum Update<T> {
    /// Replace the state outright.
    Replace(T),
    /// Derive the next state from the most recent pending one.
    Apply(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Update<T> {
    pub(crate) fn reduce(state: &T, update: Update<T>) -> T {
        match update {
            Update::Replace(value) => value,
            Update::Apply(f) => f(state),
        }
    }
}

impl<T> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Replace(_) => f.write_str("Update::Replace(..)"),
            Update::Apply(_) => f.write_str("Update::Apply(..)"),
        }
    }
}

/// Setter returned by [`Scope::use_state`](crate::Scope::use_state).
///
/// Updates are queued and applied in call order on the next render, so
/// several [`update`](Self::update) calls in one batch compose:
///
/// ```ignore
/// set_count.update(|n| n + 1);
/// set_count.update(|n| n + 1); // sees the first increment
/// ```
pub struct Setter<T> {
    dispatch: Dispatch<Update<T>>,
}

impl<T: 'static> Setter<T> {
    pub(crate) fn new(dispatch: Dispatch<Update<T>>) -> Self {
        Self { dispatch }
    }

    pub fn set(&self, value: T) {
        self.dispatch.dispatch(Update::Replace(value));
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.dispatch.dispatch(Update::Apply(Box::new(f)));
    }

    pub fn try_set(&self, value: T) -> Result<()> {
        self.dispatch.try_dispatch(Update::Replace(value))
    }

    pub fn try_update(&self, f: impl FnOnce(&T) -> T + 'static) -> Result<()> {
        self.dispatch.try_dispatch(Update::Apply(Box::new(f)))
    }

    pub fn instance(&self) -> InstanceId {
        self.dispatch.instance()
    }

    pub fn is_active(&self) -> bool {
        self.dispatch.is_active()
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<T> PartialEq for Setter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dispatch == other.dispatch
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Setter").field(&self.dispatch).finish()
    }
}
