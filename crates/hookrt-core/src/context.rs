//! Tree-scoped ambient values.
//!
//! A [`Context`] is a process-wide identity with an optional default. Any
//! instance may attach a provider node for it; reads walk parent links to the
//! nearest node. Reads also subscribe the reader, so a provider whose value
//! changes can invalidate exactly the instances that resolved to it during
//! their last render.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::collections::map::{HashMap, HashSet};
use crate::error::{Error, Result};
use crate::instance::InstanceId;

static NEXT_CONTEXT_KEY: AtomicUsize = AtomicUsize::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey(usize);

impl ContextKey {
    fn next() -> Self {
        Self(NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context #{}", self.0)
    }
}

pub struct Context<T> {
    key: ContextKey,
    default: Option<Rc<dyn Fn() -> T>>,
}

impl<T: Clone + PartialEq + 'static> Context<T> {
    pub fn new(default: T) -> Self {
        Self::with_default(move || default.clone())
    }

    pub fn with_default(default: impl Fn() -> T + 'static) -> Self {
        Self {
            key: ContextKey::next(),
            default: Some(Rc::new(default)),
        }
    }

    /// Context whose reads fail with [`Error::MissingContext`] outside a provider.
    pub fn without_default() -> Self {
        Self {
            key: ContextKey::next(),
            default: None,
        }
    }

    pub fn key(&self) -> ContextKey {
        self.key
    }

    pub fn default_value(&self) -> Option<T> {
        self.default.as_ref().map(|default| default())
    }
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: self.default.clone(),
        }
    }
}

impl<T> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Context<T> {}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("key", &self.key)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Provided {
    Attached,
    Changed,
    Unchanged,
}

#[derive(Default)]
pub(crate) struct ContextRegistry {
    parents: HashMap<InstanceId, Option<InstanceId>>,
    nodes: HashMap<InstanceId, HashMap<ContextKey, Box<dyn Any>>>,
    subscribers: HashMap<ContextKey, HashSet<InstanceId>>,
    subscriptions: HashMap<InstanceId, HashSet<ContextKey>>,
}

impl ContextRegistry {
    pub(crate) fn attach(&mut self, instance: InstanceId, parent: Option<InstanceId>) {
        self.parents.insert(instance, parent);
    }

    /// Drops the provider nodes and subscriptions owned by `instance`.
    pub(crate) fn release(&mut self, instance: InstanceId) {
        self.clear_subscriptions(instance);
        self.nodes.remove(&instance);
        self.parents.remove(&instance);
    }

    /// Attaches or updates, in place, the node for `context` on `instance`.
    pub(crate) fn provide<T: Clone + PartialEq + 'static>(
        &mut self,
        instance: InstanceId,
        context: &Context<T>,
        value: T,
    ) -> Provided {
        let nodes = self.nodes.entry(instance).or_default();
        match nodes
            .get_mut(&context.key)
            .and_then(|node| node.downcast_mut::<T>())
        {
            Some(current) if *current == value => Provided::Unchanged,
            Some(current) => {
                *current = value;
                Provided::Changed
            }
            None => {
                nodes.insert(context.key, Box::new(value));
                Provided::Attached
            }
        }
    }

    /// Nearest value for `context`, starting at `instance` itself.
    pub(crate) fn read<T: Clone + PartialEq + 'static>(
        &self,
        instance: InstanceId,
        context: &Context<T>,
    ) -> Result<T> {
        let found = self
            .nearest_provider(instance, context.key)
            .and_then(|provider| self.nodes.get(&provider)?.get(&context.key))
            .and_then(|node| node.downcast_ref::<T>())
            .cloned();
        found
            .or_else(|| context.default_value())
            .ok_or(Error::MissingContext {
                instance,
                context: context.key,
            })
    }

    pub(crate) fn nearest_provider(
        &self,
        instance: InstanceId,
        key: ContextKey,
    ) -> Option<InstanceId> {
        let mut cursor = Some(instance);
        while let Some(current) = cursor {
            if self
                .nodes
                .get(&current)
                .is_some_and(|nodes| nodes.contains_key(&key))
            {
                return Some(current);
            }
            cursor = self.parents.get(&current).copied().flatten();
        }
        None
    }

    pub(crate) fn subscribe(&mut self, instance: InstanceId, key: ContextKey) {
        self.subscribers.entry(key).or_default().insert(instance);
        self.subscriptions.entry(instance).or_default().insert(key);
    }

    /// Forgets what `instance` read; called before each of its renders.
    pub(crate) fn clear_subscriptions(&mut self, instance: InstanceId) {
        let Some(keys) = self.subscriptions.remove(&instance) else {
            return;
        };
        for key in keys {
            if let Some(set) = self.subscribers.get_mut(&key) {
                set.remove(&instance);
                if set.is_empty() {
                    self.subscribers.remove(&key);
                }
            }
        }
    }

    /// Subscribers of `key` that resolve to the node on `provider`.
    pub(crate) fn dependents(&self, provider: InstanceId, key: ContextKey) -> Vec<InstanceId> {
        let Some(set) = self.subscribers.get(&key) else {
            return Vec::new();
        };
        let mut dependents: Vec<InstanceId> = set
            .iter()
            .copied()
            .filter(|subscriber| self.nearest_provider(*subscriber, key) == Some(provider))
            .collect();
        dependents.sort();
        dependents
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self, key: ContextKey) -> usize {
        self.subscribers.get(&key).map_or(0, |set| set.len())
    }
}
