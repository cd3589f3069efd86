use hookrt_core::{Component, Error, InstanceId, Props, RenderTree, Result, RuntimeConfig};
use hookrt_runtime_std::StdRuntime;

use crate::recording_host::RecordingHost;

/// Headless harness for exercising render trees in tests.
///
/// `HookTestRule` owns a [`RenderTree`] on top of a [`StdRuntime`] and a
/// [`RecordingHost`], mounts one root component and exposes helpers for
/// driving renders and effect flushes until the tree is idle.
pub struct HookTestRule {
    tree: RenderTree<RecordingHost>,
    runtime: StdRuntime,
    root: Option<InstanceId>,
}

impl HookTestRule {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let runtime = StdRuntime::new();
        let tree = RenderTree::with_runtime(RecordingHost::new(), runtime.runtime())
            .with_config(config);
        Self {
            tree,
            runtime,
            root: None,
        }
    }

    /// Mount `component` as the root, replacing any previous root, and drive
    /// the tree until idle.
    pub fn set_content<P: Props>(
        &mut self,
        component: &Component<P>,
        props: P,
    ) -> Result<InstanceId> {
        if let Some(previous) = self.root.take() {
            self.tree.unmount(previous)?;
        }
        let root = self.tree.mount(component, props)?;
        self.root = Some(root);
        self.pump_until_idle()?;
        Ok(root)
    }

    /// Replace the props of the root and drive the tree until idle.
    pub fn set_props<P: Props>(&mut self, props: P) -> Result<()> {
        let root = self.require_root()?;
        self.tree.update(root, props)?;
        self.pump_until_idle()
    }

    /// Run `f` as one host callback: every update it makes lands in a single
    /// render per instance.
    pub fn batch<R>(&mut self, f: impl FnOnce() -> R) -> Result<R> {
        let value = self.tree.batched_updates(|_| f())?;
        self.pump_until_idle()?;
        Ok(value)
    }

    /// Serve render and effect flush requests until none are left.
    pub fn pump_until_idle(&mut self) -> Result<()> {
        self.runtime.pump(&mut self.tree)?;
        self.tree.run_until_idle()?;
        // run_until_idle may leave requests the scheduler already saw.
        self.runtime.take_render_request();
        self.runtime.take_effect_flush_request();
        Ok(())
    }

    /// Unmount the root, running every remaining cleanup.
    pub fn unmount(&mut self) -> Result<()> {
        let root = self.require_root()?;
        self.root = None;
        self.tree.unmount(root)
    }

    pub fn root(&self) -> Option<InstanceId> {
        self.root
    }

    pub fn tree(&self) -> &RenderTree<RecordingHost> {
        &self.tree
    }

    /// Gain mutable access to the tree for advanced scenarios.
    pub fn tree_mut(&mut self) -> &mut RenderTree<RecordingHost> {
        &mut self.tree
    }

    pub fn host(&self) -> &RecordingHost {
        self.tree.host()
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    /// Composed text of `instance`, children included.
    pub fn text(&self, instance: InstanceId) -> String {
        self.host().text(instance)
    }

    /// Composed text of the root.
    pub fn root_text(&self) -> String {
        self.root.map(|root| self.text(root)).unwrap_or_default()
    }

    pub fn render_count(&self, instance: InstanceId) -> u32 {
        self.tree.render_count(instance).unwrap_or(0)
    }

    /// Mounted instances of the component called `name`, in tree order.
    pub fn find(&self, name: &str) -> Vec<InstanceId> {
        let mut found = Vec::new();
        let mut stack: Vec<InstanceId> = self.tree.roots().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.tree.component_name(id) == Some(name) {
                found.push(id);
            }
            stack.extend(self.tree.children(id).into_iter().rev());
        }
        found
    }

    /// The single mounted instance called `name`.
    pub fn find_one(&self, name: &str) -> Option<InstanceId> {
        match self.find(name).as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Dump the instance tree as indented text for debugging.
    pub fn dump_tree(&self) -> String {
        let mut out = String::new();
        for root in self.tree.roots() {
            self.dump_instance(*root, 0, &mut out);
        }
        out
    }

    fn dump_instance(&self, id: InstanceId, depth: usize, out: &mut String) {
        let name = self.tree.component_name(id).unwrap_or("?");
        let text = self
            .host()
            .output(id)
            .map(|output| output.text_content())
            .unwrap_or_default();
        out.push_str(&format!(
            "{:indent$}{name} [{id}] renders={} {text:?}\n",
            "",
            self.render_count(id),
            indent = depth * 2
        ));
        for child in self.tree.children(id) {
            self.dump_instance(child, depth + 1, out);
        }
    }

    fn require_root(&self) -> Result<InstanceId> {
        self.root.ok_or_else(|| Error::fault("no content installed"))
    }
}

impl Default for HookTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `HookTestRule`.
pub fn run_test_tree<R>(f: impl FnOnce(&mut HookTestRule) -> R) -> R {
    let mut rule = HookTestRule::new();
    f(&mut rule)
}

#[cfg(test)]
#[path = "tests/testing_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/scenario_tests.rs"]
mod scenario_tests;
