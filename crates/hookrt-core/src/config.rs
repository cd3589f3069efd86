//! Runtime tuning knobs.

/// Limits applied by [`RenderTree`](crate::RenderTree) while it drives updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Render rounds (and render/effect cycles in `run_until_idle`) allowed
    /// before the runtime gives up with [`Error::UpdateLoop`](crate::Error::UpdateLoop).
    pub max_update_passes: usize,
    /// Deepest component nesting accepted before
    /// [`Error::RenderDepth`](crate::Error::RenderDepth) is raised.
    pub max_render_depth: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_UPDATE_PASSES: usize = 50;
    pub const DEFAULT_MAX_RENDER_DEPTH: usize = 512;

    pub fn new() -> Self {
        Self {
            max_update_passes: Self::DEFAULT_MAX_UPDATE_PASSES,
            max_render_depth: Self::DEFAULT_MAX_RENDER_DEPTH,
        }
    }

    pub fn with_max_update_passes(mut self, passes: usize) -> Self {
        self.max_update_passes = passes.max(1);
        self
    }

    pub fn with_max_render_depth(mut self, depth: usize) -> Self {
        self.max_render_depth = depth.max(1);
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
