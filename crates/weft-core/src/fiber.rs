//! The retained fiber tree.
//!
//! Fibers live in a slotmap arena and reference each other by key:
//! `child`/`sibling` are the structural links of one generation, while
//! `parent` and `alternate` are plain back-references. `alternate` ties a
//! work-in-progress fiber to the fiber at the same position in the last
//! committed generation and is cleared on commit, so the link is never more
//! than one hop deep.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::element::{Element, ElementKind, Props};
use crate::host::HostNodeId;

new_key_type! {
    /// Stable handle of a fiber in the arena.
    pub struct FiberId;
}

pub type FiberArena = SlotMap<FiberId, Fiber>;

/// Host mutation a fiber requires at commit time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectTag {
    #[default]
    None,
    Placement,
    Update,
    Deletion,
}

/// State-folding action queued by a setter: old state in, new state out.
pub type HookAction = Rc<dyn Fn(Rc<dyn Any>) -> Rc<dyn Any>>;

/// One positional state cell of a component fiber.
///
/// The queue is shared with the setter returned for this position, so
/// actions enqueued after the render pass land in the committed fiber and
/// are folded when the alternate chain carries this hook into the next
/// render.
#[derive(Clone)]
pub struct Hook {
    pub state: Rc<dyn Any>,
    pub queue: Rc<RefCell<Vec<HookAction>>>,
}

/// One unit of rendering work and its retained host-tree position.
pub struct Fiber {
    pub kind: ElementKind,
    pub props: Props,
    /// Element children pending reconciliation when this fiber is visited.
    pub children: Vec<Element>,
    /// Present only for host/text fibers once the node has been created.
    pub host_node: Option<HostNodeId>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub alternate: Option<FiberId>,
    pub effect: EffectTag,
    /// Ordered state cells; component fibers only.
    pub hooks: Vec<Hook>,
}

impl Fiber {
    pub fn is_component(&self) -> bool {
        matches!(self.kind, ElementKind::Component(_))
    }
}

/// Next fiber in depth-first pre-order: the child if present, otherwise the
/// sibling of the nearest ancestor that has one.
pub fn next_fiber(arena: &FiberArena, id: FiberId) -> Option<FiberId> {
    if let Some(child) = arena[id].child {
        return Some(child);
    }
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        if let Some(sibling) = arena[current].sibling {
            return Some(sibling);
        }
        cursor = arena[current].parent;
    }
    None
}
