//! The API render bodies are written against.

use std::any::{type_name, Any};
use std::hash::Hash;
use std::rc::Rc;

use crate::component::{Component, ErasedComponent, Props};
use crate::context::{Context, ContextRegistry, Provided};
use crate::deps::Deps;
use crate::effect::{EffectRecord, IntoCleanup, PendingEffect};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::hash::hash_key;
use crate::hook_store::{HookSlot, HookStore, SlotKind};
use crate::instance::{ChildKey, ChildRecord, InstanceId};
use crate::memo::{Callback, MemoSlot};
use crate::owned::Owned;
use crate::reducer::{Dispatch, ReducerSlot};
use crate::runtime::{Runtime, RuntimeHandle};
use crate::state::{Setter, Update};

pub(crate) struct ChildRequest {
    pub(crate) key: ChildKey,
    pub(crate) id: InstanceId,
    pub(crate) component: Rc<dyn ErasedComponent>,
    pub(crate) props: Rc<dyn Any>,
}

impl ChildRequest {
    pub(crate) fn record(&self) -> ChildRecord {
        ChildRecord {
            key: self.key,
            id: self.id,
            name: self.component.name(),
            props_type: self.component.props_type(),
        }
    }
}

/// Everything a finished render body left behind besides its output.
pub(crate) struct RenderOutput {
    pub(crate) children: Vec<ChildRequest>,
    pub(crate) effects: Vec<PendingEffect>,
    /// Effect slots whose deps matched their last run.
    pub(crate) settled: Vec<usize>,
}

fn slot_type<T>(instance: InstanceId, slot: usize) -> Error {
    Error::SlotType {
        instance,
        slot,
        expected: type_name::<T>(),
    }
}

/// Hook access for one render of one instance.
///
/// Every `use_*` call claims the next hook slot of the instance, so calls
/// must happen unconditionally and in the same order on every render.
/// Violations surface as [`Error::HookOrder`] or [`Error::HookCount`].
pub struct Scope<'a> {
    instance: InstanceId,
    hooks: &'a mut HookStore,
    contexts: &'a mut ContextRegistry,
    runtime: &'a Runtime,
    previous_children: &'a [ChildRecord],
    children: Vec<ChildRequest>,
    next_child_index: usize,
    effects: Vec<PendingEffect>,
    settled: Vec<usize>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        hooks: &'a mut HookStore,
        contexts: &'a mut ContextRegistry,
        runtime: &'a Runtime,
        previous_children: &'a [ChildRecord],
    ) -> Self {
        Self {
            instance: hooks.instance(),
            hooks,
            contexts,
            runtime,
            previous_children,
            children: Vec::new(),
            next_child_index: 0,
            effects: Vec::new(),
            settled: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> RenderOutput {
        RenderOutput {
            children: self.children,
            effects: self.effects,
            settled: self.settled,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    pub fn runtime(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// State slot initialised by `init` on the first render.
    ///
    /// Updates queued through the setter since the last render are applied
    /// here, in call order, before the value is returned.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, Setter<T>)> {
        let instance = self.instance;
        let runtime = self.runtime.handle();
        let (index, slot) = self.hooks.next_slot(SlotKind::State, || {
            HookSlot::State(Box::new(ReducerSlot::<T, Update<T>>::new(init())))
        })?;
        let cell = match slot {
            HookSlot::State(cell) => cell.downcast_mut::<ReducerSlot<T, Update<T>>>(),
            _ => None,
        }
        .ok_or_else(|| slot_type::<T>(instance, index))?;
        cell.apply_pending(Update::reduce);
        let setter = Setter::new(cell.dispatcher(runtime, instance));
        Ok((cell.state().clone(), setter))
    }

    /// Reducer slot; actions dispatched since the last render are folded
    /// through `reducer` in FIFO order before the state is returned.
    pub fn use_reducer<S: Clone + 'static, A: 'static>(
        &mut self,
        reducer: impl Fn(&S, A) -> S,
        init: impl FnOnce() -> S,
    ) -> Result<(S, Dispatch<A>)> {
        let instance = self.instance;
        let runtime = self.runtime.handle();
        let (index, slot) = self.hooks.next_slot(SlotKind::Reducer, || {
            HookSlot::Reducer(Box::new(ReducerSlot::<S, A>::new(init())))
        })?;
        let cell = match slot {
            HookSlot::Reducer(cell) => cell.downcast_mut::<ReducerSlot<S, A>>(),
            _ => None,
        }
        .ok_or_else(|| slot_type::<S>(instance, index))?;
        let applied = cell.apply_pending(reducer);
        if applied > 0 {
            log::trace!("{instance}: applied {applied} queued actions to slot {index}");
        }
        let dispatch = cell.dispatcher(runtime, instance);
        Ok((cell.state().clone(), dispatch))
    }

    /// Mutable cell that persists across renders without causing any.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Result<Owned<T>> {
        let instance = self.instance;
        let (index, slot) = self
            .hooks
            .next_slot(SlotKind::Ref, || HookSlot::Ref(Box::new(Owned::new(init()))))?;
        match slot {
            HookSlot::Ref(cell) => cell.downcast_ref::<Owned<T>>().cloned(),
            _ => None,
        }
        .ok_or_else(|| slot_type::<T>(instance, index))
    }

    /// Cached `compute()`, re-evaluated only when `deps` change.
    pub fn use_memo<T: Clone + 'static>(
        &mut self,
        deps: Deps,
        compute: impl FnOnce() -> T,
    ) -> Result<T> {
        let instance = self.instance;
        let (index, slot) = self
            .hooks
            .next_slot(SlotKind::Memo, || HookSlot::Memo(MemoSlot::empty()))?;
        match slot {
            HookSlot::Memo(memo) => memo.get_or_compute(deps, compute),
            _ => None,
        }
        .ok_or_else(|| slot_type::<T>(instance, index))
    }

    /// Callback whose identity only changes when `deps` change.
    pub fn use_callback<A: 'static, R: 'static>(
        &mut self,
        deps: Deps,
        f: impl Fn(A) -> R + 'static,
    ) -> Result<Callback<A, R>> {
        let instance = self.instance;
        let (index, slot) = self
            .hooks
            .next_slot(SlotKind::Callback, || HookSlot::Callback(MemoSlot::empty()))?;
        match slot {
            HookSlot::Callback(memo) => memo.get_or_compute(deps, || Callback::new(f)),
            _ => None,
        }
        .ok_or_else(|| slot_type::<Callback<A, R>>(instance, index))
    }

    /// Registers `body` to run after the render commits, when `deps` changed.
    ///
    /// The body may return `()`, a [`Cleanup`](crate::Cleanup), or a
    /// `Result` of either; the cleanup runs before the next body of this slot
    /// and at unmount.
    pub fn use_effect<C: IntoCleanup + 'static>(
        &mut self,
        deps: Deps,
        body: impl FnOnce() -> C + 'static,
    ) -> Result<()> {
        let instance = self.instance;
        let (index, slot) = self
            .hooks
            .next_slot(SlotKind::Effect, || HookSlot::Effect(EffectRecord::new()))?;
        let HookSlot::Effect(record) = slot else {
            return Err(slot_type::<EffectRecord>(instance, index));
        };
        if record.schedule(&deps) {
            self.effects.push(PendingEffect {
                slot: index,
                deps,
                body: Box::new(move || body().into_cleanup()),
            });
        } else {
            self.settled.push(index);
        }
        Ok(())
    }

    /// Value of the nearest provider of `context`, or its default.
    ///
    /// The read subscribes this instance: a later change of that provider's
    /// value re-renders it.
    pub fn use_context<T: Clone + PartialEq + 'static>(
        &mut self,
        context: &Context<T>,
    ) -> Result<T> {
        let instance = self.instance;
        let key = context.key();
        let (index, slot) = self
            .hooks
            .next_slot(SlotKind::ContextRead, || HookSlot::ContextRead(key))?;
        match slot {
            HookSlot::ContextRead(stored) if *stored == key => {}
            _ => return Err(slot_type::<Context<T>>(instance, index)),
        }
        self.contexts.subscribe(instance, key);
        self.contexts.read(instance, context)
    }

    /// Provides `value` for `context` to this instance and its descendants.
    pub fn provide_context<T: Clone + PartialEq + 'static>(
        &mut self,
        context: &Context<T>,
        value: T,
    ) {
        if self.contexts.provide(self.instance, context, value) == Provided::Unchanged {
            return;
        }
        for dependent in self.contexts.dependents(self.instance, context.key()) {
            if dependent != self.instance {
                self.runtime.invalidate(dependent);
            }
        }
    }

    /// Declares the next unkeyed child; children match previous ones by position.
    pub fn child<P: Props>(&mut self, component: &Component<P>, props: P) -> Result<Element> {
        let key = ChildKey::Index(self.next_child_index);
        self.next_child_index += 1;
        self.push_child(key, component, props)
    }

    /// Declares a child identified by `key` instead of its position.
    pub fn child_keyed<K: Hash + ?Sized, P: Props>(
        &mut self,
        key: &K,
        component: &Component<P>,
        props: P,
    ) -> Result<Element> {
        self.push_child(ChildKey::Keyed(hash_key(key)), component, props)
    }

    fn push_child<P: Props>(
        &mut self,
        key: ChildKey,
        component: &Component<P>,
        props: P,
    ) -> Result<Element> {
        if self.children.iter().any(|request| request.key == key) {
            return Err(Error::DuplicateKey {
                instance: self.instance,
                key,
            });
        }
        let component: Rc<dyn ErasedComponent> = Rc::new(component.clone());
        let id = self
            .previous_children
            .iter()
            .find(|record| record.matches(key, component.name(), component.props_type()))
            .map_or_else(InstanceId::next, |record| record.id);
        self.children.push(ChildRequest {
            key,
            id,
            component,
            props: Rc::new(props),
        });
        Ok(Element::Child(id))
    }
}
