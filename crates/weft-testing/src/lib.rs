//! Testing utilities and harness for Weft.
//!
//! The in-memory host and the deadline helpers live in `weft-core` (they
//! carry no extra dependencies and the core's own tests need them); this
//! crate re-exports them and adds [`TestHarness`], which bundles a host, a
//! runtime, and a container node, and drains the scheduler deterministically.

pub use weft_core::memory_host::{HostMutation, MemoryHost};
pub use weft_core::platform::{BoundedDeadline, UnboundedDeadline};

use weft_core::{Element, HostBackend, HostNodeId, RenderError, Runtime};

/// A mounted runtime over a [`MemoryHost`] with a ready-made container.
pub struct TestHarness {
    runtime: Runtime<MemoryHost>,
    container: HostNodeId,
}

impl TestHarness {
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        Self {
            runtime: Runtime::new(host),
            container,
        }
    }

    /// Mounts `element` (diffing against any previously committed tree) and
    /// drains the scheduler to idle.
    pub fn mount(&mut self, element: Element) -> Result<(), RenderError> {
        self.runtime.render(element, self.container);
        self.settle()
    }

    /// Runs the work loop until no work remains.
    pub fn settle(&mut self) -> Result<(), RenderError> {
        while self.runtime.needs_work() {
            self.runtime.work_loop(&UnboundedDeadline)?;
        }
        Ok(())
    }

    /// Fires the click handler on `node` and settles the resulting pass.
    pub fn click(&mut self, node: HostNodeId) -> Result<(), RenderError> {
        let fired = self.runtime.host().dispatch(node, "click");
        assert!(fired, "no click listener registered on node {node}");
        self.settle()
    }

    pub fn container(&self) -> HostNodeId {
        self.container
    }

    pub fn runtime(&self) -> &Runtime<MemoryHost> {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime<MemoryHost> {
        &mut self.runtime
    }

    pub fn host(&self) -> &MemoryHost {
        self.runtime.host()
    }

    pub fn take_journal(&mut self) -> Vec<HostMutation> {
        self.runtime.host_mut().take_journal()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
