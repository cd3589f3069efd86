//! Post-commit side effects.
//!
//! Render bodies only record effects. Each effect slot owns an
//! [`EffectRecord`] that remembers the deps of its last run and the cleanup
//! that run returned. When deps change, the render stages a
//! [`PendingEffect`]; once the host has committed the output and calls the
//! flush, the previous cleanup runs and then the new body.
//!
//! Record states:
//!
//! ```text
//! Unregistered --deps differ--> Pending --flush--> Active
//!                                  ^                 |
//!                                  +---deps differ---+--unmount--> Cleaned
//! ```

use std::fmt;

use crate::collections::map::HashMap;
use crate::deps::Deps;
use crate::error::{Error, Result};
use crate::instance::InstanceId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EffectState {
    Unregistered,
    Pending,
    Active,
    Cleaned,
}

/// Teardown returned by an effect body.
#[derive(Default)]
pub struct Cleanup {
    teardown: Option<Box<dyn FnOnce() -> Result<()>>>,
}

impl Cleanup {
    pub fn none() -> Self {
        Self { teardown: None }
    }

    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self::fallible(move || {
            teardown();
            Ok(())
        })
    }

    /// Teardown whose failure is reported to the host.
    pub fn fallible(teardown: impl FnOnce() -> Result<()> + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn is_none(&self) -> bool {
        self.teardown.is_none()
    }

    fn run(self) -> Result<()> {
        match self.teardown {
            Some(teardown) => teardown(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("present", &self.teardown.is_some())
            .finish()
    }
}

/// Values an effect body may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Result<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Result<Cleanup> {
        Ok(Cleanup::none())
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Result<Cleanup> {
        Ok(self)
    }
}

impl IntoCleanup for Result<Cleanup> {
    fn into_cleanup(self) -> Result<Cleanup> {
        self
    }
}

impl IntoCleanup for Result<()> {
    fn into_cleanup(self) -> Result<Cleanup> {
        self.map(|()| Cleanup::none())
    }
}

pub(crate) type EffectBody = Box<dyn FnOnce() -> Result<Cleanup>>;

pub(crate) struct EffectRecord {
    deps: Option<Deps>,
    cleanup: Option<Cleanup>,
    state: EffectState,
    // State to return to when a later render withdraws the pending run.
    resting: EffectState,
    runs: u32,
}

impl EffectRecord {
    pub(crate) fn new() -> Self {
        Self {
            deps: None,
            cleanup: None,
            state: EffectState::Unregistered,
            resting: EffectState::Unregistered,
            runs: 0,
        }
    }

    pub(crate) fn state(&self) -> EffectState {
        self.state
    }

    /// Render-time check against the deps of the last run.
    ///
    /// A render whose deps match the last run again withdraws a run staged by
    /// an earlier, not yet flushed render.
    pub(crate) fn schedule(&mut self, deps: &Deps) -> bool {
        if deps.changed_since(self.deps.as_ref()) {
            if self.state != EffectState::Pending {
                self.resting = self.state;
            }
            self.state = EffectState::Pending;
            true
        } else {
            if self.state == EffectState::Pending {
                self.state = self.resting;
            }
            false
        }
    }

    /// Runs the previous cleanup, then `body`; returns the faults of both.
    pub(crate) fn run(&mut self, deps: Deps, body: EffectBody) -> Vec<Error> {
        let mut faults = Vec::new();
        if let Some(fault) = self.dispose() {
            faults.push(fault);
        }
        self.deps = Some(deps);
        self.runs += 1;
        match body() {
            Ok(cleanup) => {
                self.cleanup = Some(cleanup).filter(|cleanup| !cleanup.is_none());
                self.state = EffectState::Active;
            }
            Err(fault) => {
                self.state = EffectState::Cleaned;
                faults.push(fault);
            }
        }
        faults
    }

    /// Runs the stored cleanup, if any, and marks the record cleaned.
    pub(crate) fn dispose(&mut self) -> Option<Error> {
        let cleanup = self.cleanup.take();
        if self.runs > 0 {
            self.state = EffectState::Cleaned;
        }
        cleanup.and_then(|cleanup| cleanup.run().err())
    }
}

pub(crate) struct PendingEffect {
    pub(crate) slot: usize,
    pub(crate) deps: Deps,
    pub(crate) body: EffectBody,
}

/// Effects waiting for the host's flush, grouped per instance in commit order.
#[derive(Default)]
pub(crate) struct EffectScheduler {
    order: Vec<InstanceId>,
    pending: HashMap<InstanceId, Vec<PendingEffect>>,
}

impl EffectScheduler {
    /// Queues the effects staged by one committed render of `instance`.
    ///
    /// A slot that is still waiting from an earlier render is replaced by the
    /// newer body, or dropped when the newer render left it `settled`.
    pub(crate) fn enqueue(
        &mut self,
        instance: InstanceId,
        effects: Vec<PendingEffect>,
        settled: &[usize],
    ) {
        let Some(queued) = self.pending.get_mut(&instance) else {
            if !effects.is_empty() {
                self.order.push(instance);
                self.pending.insert(instance, effects);
            }
            return;
        };
        queued.retain(|queued| !settled.contains(&queued.slot));
        for effect in effects {
            match queued.iter_mut().find(|queued| queued.slot == effect.slot) {
                Some(existing) => *existing = effect,
                None => queued.push(effect),
            }
        }
        queued.sort_by_key(|effect| effect.slot);
        if queued.is_empty() {
            log::trace!("{instance}: staged effects withdrawn");
            self.discard(instance);
        }
    }

    pub(crate) fn discard(&mut self, instance: InstanceId) {
        if self.pending.remove(&instance).is_some() {
            self.order.retain(|id| *id != instance);
        }
    }

    pub(crate) fn take(&mut self) -> Vec<(InstanceId, Vec<PendingEffect>)> {
        let mut pending = std::mem::take(&mut self.pending);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| pending.remove(&id).map(|effects| (id, effects)))
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}
