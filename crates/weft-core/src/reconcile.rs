//! Positional child diffing.
//!
//! New element children are walked in lockstep with the previous
//! generation's child fibers (reached through the parent's alternate).
//! Matching positions become updates, unmatched elements become placements,
//! and leftover old fibers are tagged for deletion. Children are positional
//! only: a reordered list is expressed as deletions plus placements, never
//! as a move.

use log::trace;

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};

/// Diffs `elements` against the previous children of `wip` and links the
/// produced fibers as `child`/`sibling` under it. Old fibers without a
/// type-matching element are appended to `deletions`.
///
/// O(max(|old|, |new|)) in the two child counts.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    wip: FiberId,
    elements: &[Element],
    deletions: &mut Vec<FiberId>,
) {
    let mut old_fiber = arena[wip].alternate.and_then(|alt| arena[alt].child);
    let mut prev_sibling: Option<FiberId> = None;
    let mut index = 0;

    while index < elements.len() || old_fiber.is_some() {
        let element = elements.get(index);
        let same_kind = match (old_fiber, element) {
            (Some(old), Some(element)) => arena[old].kind.same_kind(&element.kind),
            _ => false,
        };

        let mut new_fiber = None;
        if same_kind {
            // Position kept its type: reuse the host node, diff props later.
            let old = old_fiber.expect("matched fiber");
            let element = element.expect("matched element");
            let (kind, host_node) = (arena[old].kind, arena[old].host_node);
            new_fiber = Some(arena.insert(Fiber {
                kind,
                props: element.props.clone(),
                children: element.children.clone(),
                host_node,
                parent: Some(wip),
                child: None,
                sibling: None,
                alternate: Some(old),
                effect: EffectTag::Update,
                hooks: Vec::new(),
            }));
        } else if let Some(element) = element {
            new_fiber = Some(arena.insert(Fiber {
                kind: element.kind,
                props: element.props.clone(),
                children: element.children.clone(),
                host_node: None,
                parent: Some(wip),
                child: None,
                sibling: None,
                alternate: None,
                effect: EffectTag::Placement,
                hooks: Vec::new(),
            }));
        }
        if let Some(old) = old_fiber {
            if !same_kind {
                arena[old].effect = EffectTag::Deletion;
                deletions.push(old);
                trace!("reconcile: deletion at index {index} ({:?})", arena[old].kind);
            }
            old_fiber = arena[old].sibling;
        }

        if let Some(id) = new_fiber {
            match prev_sibling {
                None => arena[wip].child = Some(id),
                Some(prev) => arena[prev].sibling = Some(id),
            }
            prev_sibling = Some(id);
        }
        index += 1;
    }
}
