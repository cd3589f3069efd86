use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::component::ErasedComponent;
use crate::error::Error;
use crate::hook_store::HookStore;

static NEXT_INSTANCE_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of one mounted occurrence of a component.
///
/// Ids are never reused, so a stale id can always be told apart from the
/// instance that later occupies the same tree position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance #{}", self.0)
    }
}

/// Position of a child under its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildKey {
    /// Nth unkeyed child declared by the render body.
    Index(usize),
    /// Hash of an explicit key.
    Keyed(u64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Allocated but its first render has not completed.
    Created,
    Mounted,
    Unmounted,
}

#[derive(Clone, Debug)]
pub(crate) struct ChildRecord {
    pub(crate) key: ChildKey,
    pub(crate) id: InstanceId,
    pub(crate) name: &'static str,
    pub(crate) props_type: TypeId,
}

impl ChildRecord {
    pub(crate) fn matches(&self, key: ChildKey, name: &'static str, props_type: TypeId) -> bool {
        self.key == key && self.name == name && self.props_type == props_type
    }
}

pub(crate) struct ComponentInstance {
    pub(crate) parent: Option<InstanceId>,
    pub(crate) depth: usize,
    pub(crate) component: Rc<dyn ErasedComponent>,
    pub(crate) props: Rc<dyn Any>,
    pub(crate) hooks: HookStore,
    pub(crate) children: Vec<ChildRecord>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) render_count: u32,
    /// Set while an error boundary shows its fallback.
    pub(crate) boundary_fault: Option<Error>,
}

impl ComponentInstance {
    pub(crate) fn new(
        id: InstanceId,
        parent: Option<InstanceId>,
        depth: usize,
        component: Rc<dyn ErasedComponent>,
        props: Rc<dyn Any>,
    ) -> Self {
        Self {
            parent,
            depth,
            component,
            props,
            hooks: HookStore::new(id),
            children: Vec::new(),
            lifecycle: Lifecycle::Created,
            render_count: 0,
            boundary_fault: None,
        }
    }

    /// Boundaries that already show a fallback do not catch again.
    pub(crate) fn is_armed_boundary(&self) -> bool {
        self.component.is_error_boundary() && self.boundary_fault.is_none()
    }
}
