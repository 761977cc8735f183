//! Host renderer capability set.
//!
//! The runtime never touches a display surface directly; the commit phase
//! drives whatever implements [`HostBackend`]. Hosts hand out stable node
//! handles and perform the actual node creation and mutation.

use crate::element::{EventHandler, PropValue};
use crate::RenderError;

/// Stable handle of a node owned by the host.
pub type HostNodeId = usize;

/// Node creation and mutation primitives supplied by the host.
///
/// Creation is infallible (the host allocates a fresh node); mutations can
/// fail when a handle no longer refers to a live node.
pub trait HostBackend {
    /// Creates a detached host node for the given tag.
    fn create_node(&mut self, tag: &str) -> HostNodeId;

    /// Creates a detached text node with the given content.
    fn create_text(&mut self, text: &str) -> HostNodeId;

    fn set_attribute(
        &mut self,
        node: HostNodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), RenderError>;

    fn clear_attribute(&mut self, node: HostNodeId, name: &str) -> Result<(), RenderError>;

    /// Registers `handler` for `event` on `node`. At most one handler per
    /// event name is registered at a time; the commit phase unregisters a
    /// changed handler before re-registering.
    fn add_listener(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), RenderError>;

    fn remove_listener(&mut self, node: HostNodeId, event: &str) -> Result<(), RenderError>;

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId)
        -> Result<(), RenderError>;

    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId)
        -> Result<(), RenderError>;
}
