use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::collections::map::HashSet;
use crate::instance::InstanceId;
use crate::platform::RuntimeScheduler;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    dirty: RefCell<Vec<InstanceId>>, // insertion ordered; `dirty_set` deduplicates.
    dirty_set: RefCell<HashSet<InstanceId>>,
    batch_depth: Cell<usize>,
    render_requested: Cell<bool>,
    effect_flush_requested: Cell<bool>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            dirty: RefCell::new(Vec::new()),
            dirty_set: RefCell::new(HashSet::default()),
            batch_depth: Cell::new(0),
            render_requested: Cell::new(false),
            effect_flush_requested: Cell::new(false),
        }
    }

    fn invalidate(&self, instance: InstanceId) {
        if !self.dirty_set.borrow_mut().insert(instance) {
            return;
        }
        self.dirty.borrow_mut().push(instance);
        log::trace!("{instance} invalidated");
        if self.batch_depth.get() == 0 && !self.render_requested.replace(true) {
            self.scheduler.schedule_render();
        }
    }

    fn forget(&self, instance: InstanceId) -> bool {
        if !self.dirty_set.borrow_mut().remove(&instance) {
            return false;
        }
        self.dirty.borrow_mut().retain(|id| *id != instance);
        true
    }
}

/// Update queue shared by the render tree and every setter it hands out.
///
/// Setters, dispatchers and context providers only mark instances dirty here;
/// the tree renders them later, once per batch.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn has_dirty(&self) -> bool {
        !self.inner.dirty.borrow().is_empty()
    }

    pub fn is_dirty(&self, instance: InstanceId) -> bool {
        self.inner.dirty_set.borrow().contains(&instance)
    }

    /// Dirty instances in invalidation order.
    pub fn dirty_instances(&self) -> Vec<InstanceId> {
        self.inner.dirty.borrow().clone()
    }

    pub fn invalidate(&self, instance: InstanceId) {
        self.inner.invalidate(instance);
    }

    /// Clears the dirty mark of `instance`; returns whether it was set.
    pub(crate) fn forget(&self, instance: InstanceId) -> bool {
        self.inner.forget(instance)
    }

    pub fn in_batch(&self) -> bool {
        self.inner.batch_depth.get() > 0
    }

    pub(crate) fn begin_batch(&self) {
        self.inner.batch_depth.set(self.inner.batch_depth.get() + 1);
    }

    pub(crate) fn end_batch(&self) {
        let depth = self.inner.batch_depth.get();
        debug_assert!(depth > 0, "batch depth underflowed");
        self.inner.batch_depth.set(depth.saturating_sub(1));
    }

    pub(crate) fn clear_render_request(&self) {
        self.inner.render_requested.set(false);
    }

    pub(crate) fn request_effect_flush(&self) {
        if !self.inner.effect_flush_requested.replace(true) {
            self.inner.scheduler.schedule_effect_flush();
        }
    }

    pub(crate) fn clear_effect_flush_request(&self) {
        self.inner.effect_flush_requested.set(false);
    }
}

/// Non-owning runtime reference held by setters and dispatchers.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    /// Marks `instance` for re-render; returns `false` once the runtime is gone.
    pub fn invalidate(&self, instance: InstanceId) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                inner.invalidate(instance);
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Scheduler for hosts that drive the tree manually.
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_render(&self) {}

    fn schedule_effect_flush(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct TestScheduler {
    pub(crate) renders: std::sync::atomic::AtomicUsize,
    pub(crate) effect_flushes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn schedule_render(&self) {
        self.renders.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn schedule_effect_flush(&self) {
        self.effect_flushes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
