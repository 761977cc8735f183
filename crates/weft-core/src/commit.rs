//! Atomic commit phase.
//!
//! Runs only when a work-in-progress pass has fully completed, and applies
//! every accumulated mutation in one uninterruptible step: deletions first,
//! then a depth-first walk placing new nodes and patching changed props.
//! Afterwards the work-in-progress tree becomes the committed tree and the
//! superseded generation is swept from the arena.

use std::collections::HashSet;

use log::debug;

use crate::element::{Props, EVENT_PREFIX};
use crate::fiber::{EffectTag, FiberArena, FiberId};
use crate::host::{HostBackend, HostNodeId};
use crate::scheduler::Runtime;
use crate::RenderError;

impl<H: HostBackend> Runtime<H> {
    pub(crate) fn commit_root(&mut self) -> Result<(), RenderError> {
        let deletions = std::mem::take(&mut self.state.borrow_mut().deletions);
        for deleted in deletions {
            self.commit_deletion(deleted)?;
        }

        let first = {
            let state = self.state.borrow();
            let wip = state.wip_root.expect("commit requires a finished pass");
            state.arena[wip].child
        };
        self.commit_work(first)?;

        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        state.current_root = state.wip_root.take();

        // The committed tree is the new baseline: effect tags are spent and
        // alternate links would otherwise chain a third generation, so both
        // are cleared before the dead generation is swept.
        let mut reachable: HashSet<FiberId> = HashSet::new();
        let mut stack: Vec<FiberId> = state.current_root.into_iter().collect();
        while let Some(id) = stack.pop() {
            reachable.insert(id);
            let fiber = &mut state.arena[id];
            fiber.alternate = None;
            fiber.effect = EffectTag::None;
            stack.extend(fiber.child);
            stack.extend(fiber.sibling);
        }
        let before = state.arena.len();
        state.arena.retain(|id, _| reachable.contains(&id));
        debug!(
            "commit complete: {} fibers live, {} reclaimed",
            state.arena.len(),
            before - state.arena.len()
        );
        Ok(())
    }

    /// Removes the host content of a deleted subtree: descends through
    /// component fibers to the first host-node-bearing fiber and detaches
    /// that node from the nearest host-bearing ancestor.
    fn commit_deletion(&mut self, deleted: FiberId) -> Result<(), RenderError> {
        let removal = {
            let state = self.state.borrow();
            let parent = host_parent(&state.arena, deleted)?;
            let mut cursor = deleted;
            loop {
                if let Some(node) = state.arena[cursor].host_node {
                    break Some((parent, node));
                }
                match state.arena[cursor].child {
                    Some(child) => cursor = child,
                    // Component subtree that never produced a host node.
                    None => break None,
                }
            }
        };
        match removal {
            Some((parent, node)) => self.host.remove_child(parent, node),
            None => Ok(()),
        }
    }

    fn commit_work(&mut self, fiber: Option<FiberId>) -> Result<(), RenderError> {
        let Some(id) = fiber else {
            return Ok(());
        };

        enum Mutation {
            Append(HostNodeId, HostNodeId),
            Patch(HostNodeId, Props, Props),
            None,
        }

        let (mutation, child, sibling) = {
            let state = self.state.borrow();
            let fiber = &state.arena[id];
            let mutation = match (fiber.effect, fiber.host_node) {
                (EffectTag::Placement, Some(node)) => {
                    Mutation::Append(host_parent(&state.arena, id)?, node)
                }
                (EffectTag::Update, Some(node)) => {
                    let alternate = fiber.alternate.expect("update fibers carry an alternate");
                    Mutation::Patch(node, state.arena[alternate].props.clone(), fiber.props.clone())
                }
                _ => Mutation::None,
            };
            (mutation, fiber.child, fiber.sibling)
        };

        match mutation {
            Mutation::Append(parent, node) => self.host.append_child(parent, node)?,
            Mutation::Patch(node, prev, next) => {
                update_host_props(&mut self.host, node, &prev, &next)?
            }
            Mutation::None => {}
        }

        self.commit_work(child)?;
        self.commit_work(sibling)
    }
}

/// Nearest ancestor host node, climbing `parent` links past component
/// fibers. The true root always owns a host node, so a climb that falls off
/// the tree is a fatal invariant violation.
fn host_parent(arena: &FiberArena, id: FiberId) -> Result<HostNodeId, RenderError> {
    let mut cursor = arena[id].parent;
    while let Some(ancestor) = cursor {
        if let Some(node) = arena[ancestor].host_node {
            return Ok(node);
        }
        cursor = arena[ancestor].parent;
    }
    Err(RenderError::NoHostAncestor)
}

fn is_event(name: &str) -> bool {
    name.starts_with(EVENT_PREFIX)
}

/// Host event name for an `on*` prop: prefix stripped, lowercased.
fn event_name(prop: &str) -> String {
    prop[EVENT_PREFIX.len()..].to_ascii_lowercase()
}

/// Applies the prop delta between `prev` and `next` to a host node. Used by
/// updates and, against an empty `prev`, by initial node creation.
///
/// Plain attributes are cleared or set; `on*` handlers are unregistered and
/// re-registered through the host's listener primitives, keyed by callback
/// identity.
pub(crate) fn update_host_props<H: HostBackend>(
    host: &mut H,
    node: HostNodeId,
    prev: &Props,
    next: &Props,
) -> Result<(), RenderError> {
    // Removed or replaced event listeners.
    for (name, value) in prev {
        if !is_event(name) || !value.is_handler() {
            continue;
        }
        let replaced = next.get(name).map(|new| new != value).unwrap_or(true);
        if replaced {
            host.remove_listener(node, &event_name(name))?;
        }
    }

    // Removed plain attributes.
    for (name, _) in prev {
        if is_event(name) {
            continue;
        }
        if !next.contains_key(name) {
            host.clear_attribute(node, name)?;
        }
    }

    // New or changed plain attributes.
    for (name, value) in next {
        if is_event(name) {
            continue;
        }
        if prev.get(name) != Some(value) {
            host.set_attribute(node, name, value)?;
        }
    }

    // New or replaced event listeners.
    for (name, value) in next {
        let Some(handler) = value.as_handler() else {
            continue;
        };
        if !is_event(name) {
            continue;
        }
        if prev.get(name) != Some(value) {
            host.add_listener(node, &event_name(name), handler.clone())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::PropValue;

    #[test]
    fn event_names_strip_prefix_and_lowercase() {
        assert_eq!(event_name("onClick"), "click");
        assert_eq!(event_name("onMouseDown"), "mousedown");
        assert!(is_event("onClick"));
        assert!(!is_event("id"));
        // "on" prefix check is purely lexical, matching prop conventions.
        assert!(is_event("once"));
    }

    #[test]
    fn prop_values_diff_by_value_handlers_by_identity() {
        let a = PropValue::from("x");
        let b = PropValue::from("x");
        assert_eq!(a, b);
        let h = PropValue::handler(|| {});
        assert_eq!(h.clone(), h);
    }
}
