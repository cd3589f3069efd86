//! Instance tree driver.
//!
//! A [`RenderTree`] owns every mounted [`ComponentInstance`] and moves them
//! through render, commit and effect flush. Renders are synchronous and run
//! ancestors first; outputs are committed to the [`Host`] in post-order, which
//! is also the order their effects are queued in. Effects only run when the
//! host calls [`RenderTree::flush_effects`].

use std::any::TypeId;
use std::rc::Rc;
use std::sync::Arc;

use crate::collections::map::HashMap;
use crate::component::{Component, Props};
use crate::config::RuntimeConfig;
use crate::context::{Context, ContextRegistry, Provided};
use crate::effect::{EffectScheduler, EffectState};
use crate::error::{Error, Result};
use crate::hook_store::SlotKind;
use crate::instance::{ComponentInstance, InstanceId, Lifecycle};
use crate::platform::Host;
use crate::runtime::{DefaultScheduler, Runtime};
use crate::scope::{ChildRequest, RenderOutput, Scope};

pub struct RenderTree<H: Host> {
    host: H,
    runtime: Runtime,
    config: RuntimeConfig,
    instances: HashMap<InstanceId, ComponentInstance>,
    roots: Vec<InstanceId>,
    contexts: ContextRegistry,
    effects: EffectScheduler,
}

impl<H: Host> RenderTree<H> {
    /// Tree driven manually by the host; nothing is scheduled on its behalf.
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_runtime(host: H, runtime: Runtime) -> Self {
        Self {
            host,
            runtime,
            config: RuntimeConfig::default(),
            instances: HashMap::default(),
            roots: Vec::new(),
            contexts: ContextRegistry::default(),
            effects: EffectScheduler::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Creates a root instance and renders it, including its first commit.
    ///
    /// A root whose first render fails is unmounted again before the error
    /// is returned.
    pub fn mount<P: Props>(&mut self, component: &Component<P>, props: P) -> Result<InstanceId> {
        let id = InstanceId::next();
        log::debug!("mounting root {id} ({})", component.name());
        self.contexts.attach(id, None);
        self.instances.insert(
            id,
            ComponentInstance::new(id, None, 0, Rc::new(component.clone()), Rc::new(props)),
        );
        self.roots.push(id);
        if let Err(err) = self.render_instance(id) {
            log::error!("{id} failed to mount: {err}");
            self.remove_root(id);
            return Err(err);
        }
        self.settle()?;
        Ok(id)
    }

    /// Replaces the props of `id` and re-renders it.
    ///
    /// Memoized components ignore props equal to the current ones. For a
    /// non-root instance the props only last until its parent renders again.
    pub fn update<P: Props>(&mut self, id: InstanceId, props: P) -> Result<()> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(Error::Unmounted { instance: id })?;
        if instance.component.props_type() != TypeId::of::<P>() {
            return Err(Error::PropsType {
                instance: id,
                component: instance.component.name(),
            });
        }
        if instance.component.is_memo()
            && instance.component.props_equal(instance.props.as_ref(), &props)
        {
            log::trace!("{id}: props unchanged, skipping update");
            return Ok(());
        }
        instance.props = Rc::new(props);
        self.runtime.invalidate(id);
        self.settle()
    }

    /// Unmounts `id` and its subtree, running every remaining cleanup.
    pub fn unmount(&mut self, id: InstanceId) -> Result<()> {
        let parent = self
            .instances
            .get(&id)
            .ok_or(Error::Unmounted { instance: id })?
            .parent;
        match parent.and_then(|parent| self.instances.get_mut(&parent)) {
            Some(parent) => parent.children.retain(|record| record.id != id),
            None => self.roots.retain(|root| *root != id),
        }
        self.unmount_instance(id);
        Ok(())
    }

    /// Runs `f` with scheduling suspended, then renders every instance it
    /// invalidated exactly once.
    pub fn batched_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R> {
        self.runtime.begin_batch();
        let value = f(self);
        self.runtime.end_batch();
        self.settle()?;
        Ok(value)
    }

    /// Renders dirty instances until none are left.
    ///
    /// Each pass renders the current dirty set ancestors first; updates
    /// queued during a pass are picked up by the next one. Returns whether
    /// anything rendered.
    pub fn process_updates(&mut self) -> Result<bool> {
        self.runtime.clear_render_request();
        let mut rendered = false;
        let mut passes = 0;
        while self.runtime.has_dirty() {
            if passes == self.config.max_update_passes {
                log::error!("updates still pending after {passes} passes");
                return Err(Error::UpdateLoop { passes });
            }
            passes += 1;
            let mut dirty = self.runtime.dirty_instances();
            let depth = |id: &InstanceId| self.instances.get(id).map_or(0, |node| node.depth);
            dirty.sort_by_key(|id| (depth(id), *id));
            log::trace!("update pass {passes}: {} dirty", dirty.len());
            for id in dirty {
                // Already rendered as part of an ancestor, or gone.
                if !self.runtime.is_dirty(id) {
                    continue;
                }
                if !self.instances.contains_key(&id) {
                    self.runtime.forget(id);
                    continue;
                }
                rendered = true;
                if let Err(err) = self.render_instance(id) {
                    self.recover_from_fault(id, err)?;
                }
            }
        }
        if !self.effects.is_empty() {
            self.runtime.request_effect_flush();
        }
        Ok(rendered)
    }

    /// Runs the effects of every committed render; returns how many ran.
    ///
    /// Within an instance effects run in declaration order, each preceded by
    /// the cleanup of its previous run. Faults go to
    /// [`Host::report_effect_fault`].
    pub fn flush_effects(&mut self) -> usize {
        self.runtime.clear_effect_flush_request();
        let mut ran = 0;
        for (id, effects) in self.effects.take() {
            let Some(instance) = self.instances.get_mut(&id) else {
                continue;
            };
            for effect in effects {
                let Some(record) = instance.hooks.effect_mut(effect.slot) else {
                    continue;
                };
                for fault in record.run(effect.deps, effect.body) {
                    self.host.report_effect_fault(id, &fault);
                }
                ran += 1;
            }
        }
        log::trace!("flushed {ran} effects");
        ran
    }

    /// Alternates renders and effect flushes until both queues are empty.
    pub fn run_until_idle(&mut self) -> Result<()> {
        let mut flushes = 0;
        loop {
            self.process_updates()?;
            if self.effects.is_empty() {
                return Ok(());
            }
            if flushes == self.config.max_update_passes {
                return Err(Error::UpdateLoop { passes: flushes });
            }
            flushes += 1;
            self.flush_effects();
        }
    }

    /// Provides `value` for `context` on `id` from outside any render.
    pub fn provide_context<T: Clone + PartialEq + 'static>(
        &mut self,
        id: InstanceId,
        context: &Context<T>,
        value: T,
    ) -> Result<()> {
        if !self.instances.contains_key(&id) {
            return Err(Error::Unmounted { instance: id });
        }
        if self.contexts.provide(id, context, value) != Provided::Unchanged {
            for dependent in self.contexts.dependents(id, context.key()) {
                self.runtime.invalidate(dependent);
            }
        }
        self.settle()
    }

    /// Clears the fault of a boundary and renders its children again.
    ///
    /// Returns whether the boundary was showing its fallback.
    pub fn reset_error_boundary(&mut self, id: InstanceId) -> Result<bool> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(Error::Unmounted { instance: id })?;
        if instance.boundary_fault.take().is_none() {
            return Ok(false);
        }
        log::debug!("{id}: error boundary reset");
        self.runtime.invalidate(id);
        self.settle()?;
        Ok(true)
    }

    pub fn roots(&self) -> &[InstanceId] {
        &self.roots
    }

    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.lifecycle(id) == Lifecycle::Mounted
    }

    /// Ids are never reused, so any id this tree does not hold is unmounted.
    pub fn lifecycle(&self, id: InstanceId) -> Lifecycle {
        self.instances
            .get(&id)
            .map_or(Lifecycle::Unmounted, |instance| instance.lifecycle)
    }

    pub fn render_count(&self, id: InstanceId) -> Option<u32> {
        self.instances.get(&id).map(|instance| instance.render_count)
    }

    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.instances.get(&id)?.parent
    }

    pub fn children(&self, id: InstanceId) -> Vec<InstanceId> {
        self.instances
            .get(&id)
            .map(|instance| instance.children.iter().map(|record| record.id).collect())
            .unwrap_or_default()
    }

    pub fn component_name(&self, id: InstanceId) -> Option<&'static str> {
        self.instances.get(&id).map(|instance| instance.component.name())
    }

    pub fn hook_kinds(&self, id: InstanceId) -> Vec<SlotKind> {
        self.instances
            .get(&id)
            .map(|instance| instance.hooks.kinds())
            .unwrap_or_default()
    }

    pub fn effect_state(&self, id: InstanceId, slot: usize) -> Option<EffectState> {
        self.instances.get(&id)?.hooks.effect(slot).map(|record| record.state())
    }

    /// Fault currently shown by the boundary `id`.
    pub fn boundary_error(&self, id: InstanceId) -> Option<&Error> {
        self.instances.get(&id)?.boundary_fault.as_ref()
    }

    pub fn pending_effects(&self) -> usize {
        self.effects.len()
    }

    fn settle(&mut self) -> Result<()> {
        if self.runtime.in_batch() {
            return Ok(());
        }
        self.process_updates().map(|_| ())
    }

    fn render_instance(&mut self, id: InstanceId) -> Result<()> {
        let Some(instance) = self.instances.get_mut(&id) else {
            self.runtime.forget(id);
            return Ok(());
        };
        if instance.depth >= self.config.max_render_depth {
            return Err(Error::RenderDepth {
                instance: id,
                limit: self.config.max_render_depth,
            });
        }
        self.runtime.forget(id);
        if let Some(fault) = &instance.boundary_fault {
            let fallback = instance.component.fallback(fault);
            instance.lifecycle = Lifecycle::Mounted;
            self.host.commit(id, &fallback);
            return Ok(());
        }

        self.contexts.clear_subscriptions(id);
        instance.hooks.begin_render();
        let component = Rc::clone(&instance.component);
        let props = Rc::clone(&instance.props);
        let mut scope = Scope::new(
            &mut instance.hooks,
            &mut self.contexts,
            &self.runtime,
            &instance.children,
        );
        let rendered = component.render(&mut scope, props.as_ref());
        let RenderOutput {
            children,
            effects,
            settled,
        } = scope.finish();
        let rendered = rendered.and_then(|element| instance.hooks.end_render().map(|()| element));
        let element = match rendered {
            Ok(element) => element,
            Err(err) => {
                instance.hooks.abort_render();
                return Err(err.located(id, component.name()));
            }
        };
        instance.render_count += 1;
        log::trace!("rendered {id} ({}), pass #{}", component.name(), instance.render_count);

        let depth = instance.depth;
        let next = children.iter().map(ChildRequest::record).collect();
        let previous = std::mem::replace(&mut instance.children, next);
        for record in previous.iter().rev() {
            if !children.iter().any(|request| request.id == record.id) {
                log::debug!("{id}: child {} ({}) removed", record.id, record.name);
                self.unmount_instance(record.id);
            }
        }

        if let Err(err) = self.render_children(id, depth, children) {
            let catches = err.is_render_fault()
                && self
                    .instances
                    .get(&id)
                    .is_some_and(ComponentInstance::is_armed_boundary);
            if catches {
                // The boundary's own render stands; only its output is replaced.
                self.trip_boundary(id, err);
                self.effects.enqueue(id, effects, &settled);
                return Ok(());
            }
            return Err(err);
        }

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.lifecycle = Lifecycle::Mounted;
        }
        self.host.commit(id, &element);
        self.effects.enqueue(id, effects, &settled);
        Ok(())
    }

    fn render_children(
        &mut self,
        parent: InstanceId,
        depth: usize,
        children: Vec<ChildRequest>,
    ) -> Result<()> {
        for ChildRequest {
            id,
            component,
            props,
            ..
        } in children
        {
            match self.instances.get_mut(&id) {
                Some(instance) => {
                    let skip = component.is_memo()
                        && component.props_equal(instance.props.as_ref(), props.as_ref())
                        && !self.runtime.is_dirty(id);
                    if skip {
                        log::trace!("{id}: memoized props unchanged");
                        continue;
                    }
                    instance.component = component;
                    instance.props = props;
                }
                None => {
                    log::debug!("mounting {id} ({}) under {parent}", component.name());
                    self.contexts.attach(id, Some(parent));
                    self.instances.insert(
                        id,
                        ComponentInstance::new(id, Some(parent), depth + 1, component, props),
                    );
                }
            }
            self.render_instance(id)?;
        }
        Ok(())
    }

    /// Hands a render fault raised under `id` to the nearest armed boundary
    /// above it; without one the whole root is unmounted.
    fn recover_from_fault(&mut self, id: InstanceId, err: Error) -> Result<()> {
        if !err.is_render_fault() {
            return Err(err);
        }
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            if self
                .instances
                .get(&current)
                .is_some_and(ComponentInstance::is_armed_boundary)
            {
                self.trip_boundary(current, err);
                return Ok(());
            }
            cursor = self.parent(current);
        }
        let mut root = id;
        while let Some(parent) = self.parent(root) {
            root = parent;
        }
        log::error!("uncaught render fault, unmounting {root}: {err}");
        self.remove_root(root);
        Err(err)
    }

    fn trip_boundary(&mut self, id: InstanceId, err: Error) {
        let Some(instance) = self.instances.get_mut(&id) else {
            return;
        };
        log::warn!("{id} ({}) caught: {err}", instance.component.name());
        let fallback = instance.component.fallback(&err);
        let children = std::mem::take(&mut instance.children);
        instance.boundary_fault = Some(err);
        instance.lifecycle = Lifecycle::Mounted;
        for child in children.iter().rev() {
            self.unmount_instance(child.id);
        }
        self.host.commit(id, &fallback);
    }

    fn remove_root(&mut self, root: InstanceId) {
        self.roots.retain(|id| *id != root);
        self.unmount_instance(root);
    }

    /// Cleanups of `id` run before those of its children.
    fn unmount_instance(&mut self, id: InstanceId) {
        let Some(mut instance) = self.instances.remove(&id) else {
            return;
        };
        log::trace!("unmounting {id} ({})", instance.component.name());
        instance.lifecycle = Lifecycle::Unmounted;
        for fault in instance.hooks.dispose_effects() {
            self.host.report_effect_fault(id, &fault);
        }
        self.effects.discard(id);
        self.contexts.release(id);
        self.runtime.forget(id);
        self.host.release(id);
        for child in instance.children.iter().rev() {
            self.unmount_instance(child.id);
        }
    }
}
