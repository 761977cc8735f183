//! Immutable element descriptors.
//!
//! Elements are the declarative input to the runtime: a tree of plain values
//! produced fresh on every render pass and diffed against the retained fiber
//! tree. Nothing here touches the host; elements only describe what the
//! committed tree should look like.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::scope::Scope;

/// Ordered property map. Insertion order is preserved so prop diffs walk
/// attributes in a stable order.
pub type Props = IndexMap<String, PropValue, ahash::RandomState>;

/// A component render function. Receives the evaluation scope carrying the
/// fiber's props, children, and hook cursor, and returns the single child
/// element for this position.
pub type ComponentFn = fn(&mut Scope) -> Element;

/// Callback invoked by the host when an event fires on a node.
pub type EventHandler = Rc<dyn Fn()>;

/// Prop name reserved for the text content of a text element.
pub const NODE_VALUE: &str = "nodeValue";

/// Prefix marking a prop as an event handler ("onClick", "onInput", ...).
pub const EVENT_PREFIX: &str = "on";

/// What an element (and the fiber built from it) renders as.
#[derive(Clone, Copy)]
pub enum ElementKind {
    /// A concrete host node with the given tag.
    Host(&'static str),
    /// A component function evaluated to produce a single child element.
    Component(ComponentFn),
    /// A host text node; the text lives in the `nodeValue` prop.
    Text,
}

impl ElementKind {
    /// Positional type match used by the reconciler: same host tag, same
    /// component function, or both text.
    pub fn same_kind(&self, other: &ElementKind) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Component(a), ElementKind::Component(b)) => {
                *a as usize == *b as usize
            }
            (ElementKind::Text, ElementKind::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Host(tag) => write!(f, "Host({tag})"),
            ElementKind::Component(func) => write!(f, "Component({:#x})", *func as usize),
            ElementKind::Text => write!(f, "Text"),
        }
    }
}

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Event handler; diffed by callback identity, not by value.
    Handler(EventHandler),
}

impl PropValue {
    pub fn handler(f: impl Fn() + 'static) -> Self {
        PropValue::Handler(Rc::new(f))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn is_handler(&self) -> bool {
        matches!(self, PropValue::Handler(_))
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            PropValue::Number(number) => f.debug_tuple("Number").field(number).finish(),
            PropValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            PropValue::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(text) => write!(f, "{text}"),
            PropValue::Number(number) => write!(f, "{number}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Handler(_) => write!(f, "<handler>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

/// An immutable element descriptor: a kind, its props, and its ordered
/// children. Created fresh each render pass.
#[derive(Clone, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub props: Props,
    pub children: Vec<Element>,
}

impl Element {
    pub fn host(tag: &'static str) -> Self {
        Self {
            kind: ElementKind::Host(tag),
            props: Props::default(),
            children: Vec::new(),
        }
    }

    pub fn component(func: ComponentFn) -> Self {
        Self {
            kind: ElementKind::Component(func),
            props: Props::default(),
            children: Vec::new(),
        }
    }

    /// Wraps raw text into a text element carrying it as the `nodeValue`
    /// prop. Non-element children go through this.
    pub fn text(value: impl Into<String>) -> Self {
        let mut props = Props::default();
        props.insert(NODE_VALUE.to_owned(), PropValue::Text(value.into()));
        Self {
            kind: ElementKind::Text,
            props,
            children: Vec::new(),
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Attaches an event handler under an `on*`-prefixed prop name, e.g.
    /// `"onClick"`.
    pub fn with_handler(mut self, name: impl Into<String>, f: impl Fn() + 'static) -> Self {
        self.props.insert(name.into(), PropValue::handler(f));
        self
    }

    pub fn with_child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::text(value)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::text(value.to_string())
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::text(value.to_string())
    }
}

/// Builds an element from a kind, a prepared prop map, and child elements.
pub fn create_element(kind: ElementKind, props: Props, children: Vec<Element>) -> Element {
    Element {
        kind,
        props,
        children,
    }
}

#[allow(non_snake_case)]
pub fn createElement(kind: ElementKind, props: Props, children: Vec<Element>) -> Element {
    create_element(kind, props, children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(_scope: &mut Scope) -> Element {
        Element::host("div")
    }

    fn other(_scope: &mut Scope) -> Element {
        Element::host("span")
    }

    #[test]
    fn text_wrapping_carries_node_value() {
        let element = Element::text("hello");
        assert!(matches!(element.kind, ElementKind::Text));
        assert_eq!(
            element.props.get(NODE_VALUE).and_then(PropValue::as_text),
            Some("hello")
        );
        assert!(element.children.is_empty());
    }

    #[test]
    fn non_element_children_are_wrapped() {
        let element = Element::host("div").with_child("plain").with_child(7i64);
        assert!(matches!(element.children[0].kind, ElementKind::Text));
        assert_eq!(
            element.children[1]
                .props
                .get(NODE_VALUE)
                .and_then(PropValue::as_text),
            Some("7")
        );
    }

    #[test]
    fn kind_matching_is_by_tag_function_or_text() {
        assert!(ElementKind::Host("div").same_kind(&ElementKind::Host("div")));
        assert!(!ElementKind::Host("div").same_kind(&ElementKind::Host("span")));
        assert!(ElementKind::Component(blank).same_kind(&ElementKind::Component(blank)));
        assert!(!ElementKind::Component(blank).same_kind(&ElementKind::Component(other)));
        assert!(ElementKind::Text.same_kind(&ElementKind::Text));
        assert!(!ElementKind::Text.same_kind(&ElementKind::Host("div")));
    }

    #[test]
    fn handlers_compare_by_identity() {
        let handler = PropValue::handler(|| {});
        assert_eq!(handler, handler.clone());
        assert_ne!(handler, PropValue::handler(|| {}));
    }
}
