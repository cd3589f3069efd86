//! Dependency arrays for memoized values, callbacks and effects.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

trait DepValue: Any + fmt::Debug {
    fn dep_eq(&self, other: &dyn DepValue) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + PartialEq + fmt::Debug> DepValue for T {
    fn dep_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, PartialEq)]
struct Identity {
    addr: usize,
    type_id: TypeId,
}

/// One element of a dependency array.
///
/// Values compare with `PartialEq`, shared pointers made with
/// [`DepKey::identity`] compare by address. Keys of different types are never
/// equal.
#[derive(Clone)]
pub struct DepKey(Rc<dyn DepValue>);

impl DepKey {
    pub fn value<T: PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        DepKey(Rc::new(value))
    }

    pub fn identity<T: ?Sized + 'static>(value: &Rc<T>) -> Self {
        DepKey(Rc::new(Identity {
            addr: Rc::as_ptr(value) as *const () as usize,
            type_id: TypeId::of::<T>(),
        }))
    }
}

impl PartialEq for DepKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.dep_eq(&*other.0)
    }
}

impl fmt::Debug for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Controls when guarded work re-runs.
#[derive(Clone, Debug, PartialEq)]
pub enum Deps {
    /// No dependency array: run on every render.
    Always,
    /// Run when any element differs from the last run. Empty runs once.
    Keys(SmallVec<[DepKey; 4]>),
}

impl Deps {
    pub fn always() -> Self {
        Deps::Always
    }

    pub fn once() -> Self {
        Deps::Keys(SmallVec::new())
    }

    pub fn keys(keys: impl IntoIterator<Item = DepKey>) -> Self {
        Deps::Keys(keys.into_iter().collect())
    }

    /// Whether guarded work must run again given the deps of its last run.
    pub fn changed_since(&self, previous: Option<&Deps>) -> bool {
        match (self, previous) {
            (_, None) | (Deps::Always, _) | (Deps::Keys(_), Some(Deps::Always)) => true,
            (Deps::Keys(next), Some(Deps::Keys(prev))) => {
                next.len() != prev.len() || next.iter().zip(prev.iter()).any(|(a, b)| a != b)
            }
        }
    }
}

/// Builds [`Deps::Keys`] from values compared with `PartialEq`.
///
/// `deps![]` is the run-once array.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::once()
    };
    ($($dep:expr),+ $(,)?) => {
        $crate::Deps::keys([$($crate::DepKey::value($dep)),+])
    };
}
