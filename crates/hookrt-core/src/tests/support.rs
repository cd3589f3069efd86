use std::cell::RefCell;
use std::rc::Rc;

use crate::{Element, Error, Host, InstanceId, RenderTree};

#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) commits: Vec<(InstanceId, Element)>,
    pub(crate) released: Vec<InstanceId>,
    pub(crate) faults: Vec<(InstanceId, Error)>,
}

impl RecordingHost {
    pub(crate) fn last_output(&self, id: InstanceId) -> Option<&Element> {
        self.commits
            .iter()
            .rev()
            .find(|(committed, _)| *committed == id)
            .map(|(_, output)| output)
    }

    pub(crate) fn text(&self, id: InstanceId) -> String {
        self.last_output(id)
            .map(Element::text_content)
            .unwrap_or_default()
    }
}

impl Host for RecordingHost {
    fn commit(&mut self, instance: InstanceId, output: &Element) {
        self.commits.push((instance, output.clone()));
    }

    fn release(&mut self, instance: InstanceId) {
        self.released.push(instance);
    }

    fn report_effect_fault(&mut self, instance: InstanceId, error: &Error) {
        self.faults.push((instance, error.clone()));
    }
}

pub(crate) fn tree() -> RenderTree<RecordingHost> {
    RenderTree::new(RecordingHost::default())
}

/// Shared event log written by render bodies, effects and cleanups.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub(crate) fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// Slot a render body stores a handle in so the test can reach it.
pub(crate) struct Captured<T>(Rc<RefCell<Option<T>>>);

impl<T> Clone for Captured<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> Default for Captured<T> {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }
}

impl<T: Clone> Captured<T> {
    pub(crate) fn store(&self, value: T) {
        *self.0.borrow_mut() = Some(value);
    }

    pub(crate) fn get(&self) -> T {
        self.0
            .borrow()
            .clone()
            .expect("render body did not capture a value")
    }
}
