//! Per-instance ordered hook storage.
//!
//! Hook calls are positionless in the render body, so every instance keeps
//! an index-addressed slot vector and a cursor that is reset at the start of
//! each render. The n-th hook call always lands on slot n; the kind recorded
//! on the first render must match on every later render.

use std::any::Any;
use std::fmt;

use crate::context::ContextKey;
use crate::effect::EffectRecord;
use crate::error::{Error, Result};
use crate::instance::InstanceId;
use crate::memo::MemoSlot;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    State,
    Ref,
    Memo,
    Callback,
    Reducer,
    Effect,
    ContextRead,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::State => "state",
            SlotKind::Ref => "ref",
            SlotKind::Memo => "memo",
            SlotKind::Callback => "callback",
            SlotKind::Reducer => "reducer",
            SlotKind::Effect => "effect",
            SlotKind::ContextRead => "context",
        };
        f.write_str(name)
    }
}

pub(crate) enum HookSlot {
    /// `ReducerSlot<T, Update<T>>`
    State(Box<dyn Any>),
    /// `Owned<T>`
    Ref(Box<dyn Any>),
    Memo(MemoSlot),
    Callback(MemoSlot),
    /// `ReducerSlot<S, A>`
    Reducer(Box<dyn Any>),
    Effect(EffectRecord),
    ContextRead(ContextKey),
}

impl HookSlot {
    pub(crate) fn kind(&self) -> SlotKind {
        match self {
            HookSlot::State(_) => SlotKind::State,
            HookSlot::Ref(_) => SlotKind::Ref,
            HookSlot::Memo(_) => SlotKind::Memo,
            HookSlot::Callback(_) => SlotKind::Callback,
            HookSlot::Reducer(_) => SlotKind::Reducer,
            HookSlot::Effect(_) => SlotKind::Effect,
            HookSlot::ContextRead(_) => SlotKind::ContextRead,
        }
    }
}

pub(crate) struct HookStore {
    instance: InstanceId,
    slots: Vec<HookSlot>,
    cursor: usize,
    /// Set once a render has completed; from then on the slot count is fixed.
    sealed: bool,
}

impl HookStore {
    pub(crate) fn new(instance: InstanceId) -> Self {
        Self {
            instance,
            slots: Vec::new(),
            cursor: 0,
            sealed: false,
        }
    }

    pub(crate) fn instance(&self) -> InstanceId {
        self.instance
    }

    pub(crate) fn begin_render(&mut self) {
        self.cursor = 0;
    }

    /// Advances the cursor, returning the slot at the previous position.
    ///
    /// On the first render the slot is allocated with `init`; afterwards the
    /// stored kind must equal `kind` and the cursor may not run past the
    /// recorded slot count.
    pub(crate) fn next_slot(
        &mut self,
        kind: SlotKind,
        init: impl FnOnce() -> HookSlot,
    ) -> Result<(usize, &mut HookSlot)> {
        let index = self.cursor;
        match self.slots.get(index) {
            Some(slot) if slot.kind() != kind => {
                return Err(Error::HookOrder {
                    instance: self.instance,
                    slot: index,
                    expected: slot.kind(),
                    found: kind,
                });
            }
            Some(_) => {}
            None if self.sealed => {
                return Err(Error::HookCount {
                    instance: self.instance,
                    expected: self.slots.len(),
                    found: index + 1,
                });
            }
            None => self.slots.push(init()),
        }
        self.cursor += 1;
        Ok((index, &mut self.slots[index]))
    }

    /// Verifies the render consumed exactly the recorded number of slots.
    pub(crate) fn end_render(&mut self) -> Result<()> {
        if self.sealed && self.cursor != self.slots.len() {
            return Err(Error::HookCount {
                instance: self.instance,
                expected: self.slots.len(),
                found: self.cursor,
            });
        }
        self.sealed = true;
        Ok(())
    }

    /// Drops slots allocated by a first render that did not complete.
    pub(crate) fn abort_render(&mut self) {
        if !self.sealed {
            self.slots.clear();
        }
        self.cursor = 0;
    }

    pub(crate) fn kinds(&self) -> Vec<SlotKind> {
        self.slots.iter().map(HookSlot::kind).collect()
    }

    pub(crate) fn effect(&self, index: usize) -> Option<&EffectRecord> {
        match self.slots.get(index) {
            Some(HookSlot::Effect(record)) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn effect_mut(&mut self, index: usize) -> Option<&mut EffectRecord> {
        match self.slots.get_mut(index) {
            Some(HookSlot::Effect(record)) => Some(record),
            _ => None,
        }
    }

    /// Runs every pending cleanup in reverse declaration order.
    pub(crate) fn dispose_effects(&mut self) -> Vec<Error> {
        self.slots
            .iter_mut()
            .rev()
            .filter_map(|slot| match slot {
                HookSlot::Effect(record) => record.dispose(),
                _ => None,
            })
            .collect()
    }
}
