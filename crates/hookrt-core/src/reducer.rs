//! Action queues behind `use_reducer` and `use_state`.
//!
//! Dispatching never touches the state: it appends to a queue shared with
//! the slot and marks the instance dirty. The queued actions are folded
//! through the reducer, in dispatch order, the next time the owning instance
//! renders.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::instance::InstanceId;
use crate::runtime::RuntimeHandle;

type ActionQueue<A> = RefCell<VecDeque<A>>;

pub(crate) struct ReducerSlot<S, A> {
    state: S,
    queue: Rc<ActionQueue<A>>,
}

impl<S, A> ReducerSlot<S, A> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state,
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub(crate) fn state(&self) -> &S {
        &self.state
    }

    /// Folds every queued action into the state; returns how many were applied.
    pub(crate) fn apply_pending(&mut self, reducer: impl Fn(&S, A) -> S) -> usize {
        let actions: Vec<A> = self.queue.borrow_mut().drain(..).collect();
        let applied = actions.len();
        for action in actions {
            self.state = reducer(&self.state, action);
        }
        applied
    }

    pub(crate) fn dispatcher(&self, runtime: RuntimeHandle, instance: InstanceId) -> Dispatch<A> {
        Dispatch {
            queue: Rc::downgrade(&self.queue),
            runtime,
            instance,
        }
    }
}

/// Queues actions for a reducer slot.
///
/// Handles stay valid across renders and compare equal for the same slot.
/// Once the owning instance is unmounted, dispatching is a logged no-op.
pub struct Dispatch<A> {
    queue: Weak<ActionQueue<A>>,
    runtime: RuntimeHandle,
    instance: InstanceId,
}

impl<A> Dispatch<A> {
    pub fn dispatch(&self, action: A) {
        if let Err(err) = self.try_dispatch(action) {
            log::warn!("ignoring stale update: {err}");
        }
    }

    /// Like [`dispatch`](Self::dispatch) but reports a stale handle.
    pub fn try_dispatch(&self, action: A) -> Result<()> {
        let queue = self.queue.upgrade().ok_or(Error::Unmounted {
            instance: self.instance,
        })?;
        queue.borrow_mut().push_back(action);
        if !self.runtime.invalidate(self.instance) {
            return Err(Error::Unmounted {
                instance: self.instance,
            });
        }
        Ok(())
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn is_active(&self) -> bool {
        self.queue.strong_count() > 0 && self.runtime.is_alive()
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            queue: Weak::clone(&self.queue),
            runtime: self.runtime.clone(),
            instance: self.instance,
        }
    }
}

impl<A> PartialEq for Dispatch<A> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.queue, &other.queue)
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("instance", &self.instance)
            .field("active", &self.is_active())
            .finish()
    }
}
