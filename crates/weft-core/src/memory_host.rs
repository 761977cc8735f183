//! In-memory host backend.
//!
//! [`MemoryHost`] implements [`HostBackend`] over a plain node store and
//! records every mutation in an ordered journal, so tests and demos can
//! assert not just the final host tree but the order in which the commit
//! phase produced it.

use std::fmt::Write as _;

use crate::element::{EventHandler, PropValue, Props, NODE_VALUE};
use crate::host::{HostBackend, HostNodeId};
use crate::RenderError;

/// One recorded host mutation, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMutation {
    CreateNode { node: HostNodeId, tag: String },
    CreateText { node: HostNodeId, text: String },
    SetAttribute { node: HostNodeId, name: String, value: PropValue },
    ClearAttribute { node: HostNodeId, name: String },
    AddListener { node: HostNodeId, event: String },
    RemoveListener { node: HostNodeId, event: String },
    AppendChild { parent: HostNodeId, child: HostNodeId },
    RemoveChild { parent: HostNodeId, child: HostNodeId },
}

struct MemoryNode {
    tag: Option<String>,
    attrs: Props,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<HostNodeId>,
}

impl MemoryNode {
    fn element(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_owned()),
            attrs: Props::default(),
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }

    fn text(text: &str) -> Self {
        let mut attrs = Props::default();
        attrs.insert(NODE_VALUE.to_owned(), PropValue::Text(text.to_owned()));
        Self {
            tag: None,
            attrs,
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// In-memory host-node store with a mutation journal.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    journal: Vec<HostMutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: HostNodeId) -> Result<&MemoryNode, RenderError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(RenderError::MissingNode { node: id })
    }

    fn node_mut(&mut self, id: HostNodeId) -> Result<&mut MemoryNode, RenderError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(RenderError::MissingNode { node: id })
    }

    /// Mutations applied so far, oldest first.
    pub fn journal(&self) -> &[HostMutation] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<HostMutation> {
        std::mem::take(&mut self.journal)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tag_of(&self, id: HostNodeId) -> Option<&str> {
        self.node(id).ok()?.tag.as_deref()
    }

    pub fn attr(&self, id: HostNodeId, name: &str) -> Option<&PropValue> {
        self.node(id).ok()?.attrs.get(name)
    }

    /// Text content of a text node (its `nodeValue`).
    pub fn text_of(&self, id: HostNodeId) -> Option<&str> {
        let node = self.node(id).ok()?;
        if node.tag.is_some() {
            return None;
        }
        node.attrs.get(NODE_VALUE)?.as_text()
    }

    pub fn children_of(&self, id: HostNodeId) -> &[HostNodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_listener(&self, id: HostNodeId, event: &str) -> bool {
        self.node(id)
            .map(|node| node.listeners.iter().any(|(name, _)| name == event))
            .unwrap_or(false)
    }

    /// First live node with the given tag, in creation order.
    pub fn find_by_tag(&self, tag: &str) -> Option<HostNodeId> {
        self.find_all_by_tag(tag).into_iter().next()
    }

    pub fn find_all_by_tag(&self, tag: &str) -> Vec<HostNodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                slot.as_ref()
                    .filter(|node| node.tag.as_deref() == Some(tag))
                    .map(|_| id)
            })
            .collect()
    }

    /// Invokes the handler registered for `event` on `node`, if any.
    /// Returns whether a handler fired.
    pub fn dispatch(&self, node: HostNodeId, event: &str) -> bool {
        let handler = self.node(node).ok().and_then(|n| {
            n.listeners
                .iter()
                .find(|(name, _)| name == event)
                .map(|(_, handler)| handler.clone())
        });
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Renders the subtree under `root` as an indented listing.
    pub fn dump_tree(&self, root: HostNodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: HostNodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id) {
            Ok(node) => {
                match &node.tag {
                    Some(tag) => {
                        let _ = write!(output, "{indent}[{id}] <{tag}");
                        for (name, value) in &node.attrs {
                            let _ = write!(output, " {name}={value}");
                        }
                        let _ = writeln!(output, ">");
                    }
                    None => {
                        let text = node
                            .attrs
                            .get(NODE_VALUE)
                            .map(|value| value.to_string())
                            .unwrap_or_default();
                        let _ = writeln!(output, "{indent}[{id}] {text:?}");
                    }
                }
                for child in &node.children {
                    self.dump_node(output, *child, depth + 1);
                }
            }
            Err(_) => {
                let _ = writeln!(output, "{indent}[{id}] (missing)");
            }
        }
    }

    fn drop_subtree(&mut self, id: HostNodeId) {
        let children = match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => node.children,
            None => return,
        };
        for child in children {
            self.drop_subtree(child);
        }
    }
}

impl HostBackend for MemoryHost {
    fn create_node(&mut self, tag: &str) -> HostNodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode::element(tag)));
        self.journal.push(HostMutation::CreateNode {
            node: id,
            tag: tag.to_owned(),
        });
        id
    }

    fn create_text(&mut self, text: &str) -> HostNodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode::text(text)));
        self.journal.push(HostMutation::CreateText {
            node: id,
            text: text.to_owned(),
        });
        id
    }

    fn set_attribute(
        &mut self,
        node: HostNodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), RenderError> {
        self.node_mut(node)?
            .attrs
            .insert(name.to_owned(), value.clone());
        self.journal.push(HostMutation::SetAttribute {
            node,
            name: name.to_owned(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_attribute(&mut self, node: HostNodeId, name: &str) -> Result<(), RenderError> {
        self.node_mut(node)?.attrs.shift_remove(name);
        self.journal.push(HostMutation::ClearAttribute {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), RenderError> {
        let listeners = &mut self.node_mut(node)?.listeners;
        listeners.retain(|(name, _)| name != event);
        listeners.push((event.to_owned(), handler));
        self.journal.push(HostMutation::AddListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_listener(&mut self, node: HostNodeId, event: &str) -> Result<(), RenderError> {
        self.node_mut(node)?
            .listeners
            .retain(|(name, _)| name != event);
        self.journal.push(HostMutation::RemoveListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn append_child(
        &mut self,
        parent: HostNodeId,
        child: HostNodeId,
    ) -> Result<(), RenderError> {
        self.node(child)?;
        self.node_mut(parent)?.children.push(child);
        self.journal.push(HostMutation::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: HostNodeId,
        child: HostNodeId,
    ) -> Result<(), RenderError> {
        let children = &mut self.node_mut(parent)?.children;
        let index = children
            .iter()
            .position(|id| *id == child)
            .ok_or(RenderError::MissingNode { node: child })?;
        children.remove(index);
        self.journal.push(HostMutation::RemoveChild { parent, child });
        // Detached subtrees are dropped outright; handles into them go dead.
        self.drop_subtree(child);
        Ok(())
    }
}
