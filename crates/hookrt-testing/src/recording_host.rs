//! In-memory [`Host`] that keeps every commit for later assertions.

use std::collections::HashMap;

use hookrt_core::{Element, Error, Host, InstanceId};

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub instance: InstanceId,
    pub output: Element,
}

/// Host that records commits, releases and effect faults.
///
/// It also plays the host's reconciliation role in miniature: it keeps the
/// latest output per live instance and can splice child outputs into their
/// parent's [`Element::Child`] placeholders.
#[derive(Debug, Default)]
pub struct RecordingHost {
    commits: Vec<Commit>,
    released: Vec<InstanceId>,
    effect_faults: Vec<(InstanceId, Error)>,
    outputs: HashMap<InstanceId, Element>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn commit_count(&self, instance: InstanceId) -> usize {
        self.commits
            .iter()
            .filter(|commit| commit.instance == instance)
            .count()
    }

    pub fn released(&self) -> &[InstanceId] {
        &self.released
    }

    pub fn effect_faults(&self) -> &[(InstanceId, Error)] {
        &self.effect_faults
    }

    /// Latest output of a live instance.
    pub fn output(&self, instance: InstanceId) -> Option<&Element> {
        self.outputs.get(&instance)
    }

    /// Output of `instance` with every child placeholder replaced by that
    /// child's composed output.
    pub fn composed(&self, instance: InstanceId) -> Element {
        self.outputs
            .get(&instance)
            .map_or(Element::Empty, |output| self.splice(output))
    }

    /// Text content of [`composed`](Self::composed).
    pub fn text(&self, instance: InstanceId) -> String {
        self.composed(instance).text_content()
    }

    /// Forgets the recorded history but keeps the live outputs.
    pub fn clear_log(&mut self) {
        self.commits.clear();
        self.released.clear();
        self.effect_faults.clear();
    }

    fn splice(&self, element: &Element) -> Element {
        match element {
            Element::Child(id) => self.composed(*id),
            Element::Node {
                tag,
                attrs,
                children,
            } => Element::Node {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: children.iter().map(|child| self.splice(child)).collect(),
            },
            Element::Fragment(children) => {
                Element::Fragment(children.iter().map(|child| self.splice(child)).collect())
            }
            other => other.clone(),
        }
    }
}

impl Host for RecordingHost {
    fn commit(&mut self, instance: InstanceId, output: &Element) {
        log::trace!("commit {instance}: {output:?}");
        self.outputs.insert(instance, output.clone());
        self.commits.push(Commit {
            instance,
            output: output.clone(),
        });
    }

    fn release(&mut self, instance: InstanceId) {
        self.outputs.remove(&instance);
        self.released.push(instance);
    }

    fn report_effect_fault(&mut self, instance: InstanceId, error: &Error) {
        log::warn!("effect of {instance} failed: {error}");
        self.effect_faults.push((instance, error.clone()));
    }
}
