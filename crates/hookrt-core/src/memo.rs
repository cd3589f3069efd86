use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::deps::Deps;

/// Cached value plus the deps it was computed with.
pub(crate) struct MemoSlot {
    deps: Option<Deps>,
    value: Option<Box<dyn Any>>,
}

impl MemoSlot {
    pub(crate) fn empty() -> Self {
        Self {
            deps: None,
            value: None,
        }
    }

    /// Returns the cached value, recomputing it iff `deps` changed.
    ///
    /// `None` means the slot caches a different type.
    pub(crate) fn get_or_compute<T: Clone + 'static>(
        &mut self,
        deps: Deps,
        compute: impl FnOnce() -> T,
    ) -> Option<T> {
        if let Some(value) = &self.value {
            if !value.is::<T>() {
                return None;
            }
            if !deps.changed_since(self.deps.as_ref()) {
                return value.downcast_ref::<T>().cloned();
            }
        }
        let value = compute();
        self.value = Some(Box::new(value.clone()));
        self.deps = Some(deps);
        Some(value)
    }
}

/// Reference-counted function whose identity survives re-renders while the
/// deps given to [`Scope::use_callback`](crate::Scope::use_callback) are
/// unchanged.
///
/// Equality is pointer identity, which is what lets a memoized child compare
/// callback props cheaply.
pub struct Callback<A = (), R = ()> {
    inner: Rc<dyn Fn(A) -> R>,
}

impl<A, R> Callback<A, R> {
    pub fn new(f: impl Fn(A) -> R + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    pub fn call(&self, args: A) -> R {
        (self.inner)(args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R> Callback<(), R> {
    pub fn invoke(&self) -> R {
        (self.inner)(())
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, R> PartialEq for Callback<A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.inner) as *const ())
    }
}
