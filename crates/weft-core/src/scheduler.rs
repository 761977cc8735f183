//! Cooperative work scheduler and render session.
//!
//! A [`Runtime`] is one mounted tree: it owns the fiber arena, the host
//! backend, and the double-buffered root pointers. Rendering is split into
//! interruptible units of work (one fiber each) driven by [`work_loop`]
//! under a host-supplied deadline; when a pass completes the commit phase
//! applies the accumulated mutations in one uninterruptible step.
//!
//! [`work_loop`]: Runtime::work_loop

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, trace, warn};

use crate::element::{Element, ElementKind, Props, NODE_VALUE};
use crate::fiber::{next_fiber, EffectTag, Fiber, FiberArena, FiberId};
use crate::host::{HostBackend, HostNodeId};
use crate::platform::Deadline;
use crate::reconcile::reconcile_children;
use crate::scope::Scope;
use crate::RenderError;

pub(crate) struct RuntimeState {
    pub(crate) arena: FiberArena,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    waker: Option<Rc<dyn Fn()>>,
}

impl RuntimeState {
    fn new() -> Self {
        Self {
            arena: FiberArena::default(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            waker: None,
        }
    }

    fn needs_work(&self) -> bool {
        self.next_unit.is_some() || self.wip_root.is_some()
    }
}

/// A render session for one mounted tree.
///
/// Created once per mount; lives for as long as the tree is mounted. All
/// scheduler state is per-session, so independent mounts never interfere.
pub struct Runtime<H: HostBackend> {
    pub(crate) state: Rc<RefCell<RuntimeState>>,
    pub(crate) host: H,
}

impl<H: HostBackend> Runtime<H> {
    pub fn new(host: H) -> Self {
        Self {
            state: Rc::new(RefCell::new(RuntimeState::new())),
            host,
        }
    }

    /// Mounts (or remounts) `element` under the given host container node.
    ///
    /// Builds a fresh work-in-progress root referencing the last committed
    /// root as its alternate and schedules it as the next unit of work,
    /// discarding any partially built pass still in flight.
    pub fn render(&mut self, element: Element, container: HostNodeId) {
        let waker = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let alternate = state.current_root;
            let root = state.arena.insert(Fiber {
                kind: ElementKind::Host("#root"),
                props: Props::default(),
                children: vec![element],
                host_node: Some(container),
                parent: None,
                child: None,
                sibling: None,
                alternate,
                effect: EffectTag::None,
                hooks: Vec::new(),
            });
            state.wip_root = Some(root);
            state.next_unit = Some(root);
            state.deletions.clear();
            debug!("render scheduled (remount: {})", alternate.is_some());
            state.waker.clone()
        };
        if let Some(waker) = waker {
            waker();
        }
    }

    /// Runs units of work until the deadline expires or no work remains,
    /// committing the finished tree when the pass completes. At least one
    /// unit is processed per call when work is pending.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<(), RenderError> {
        loop {
            let Some(unit) = self.state.borrow().next_unit else {
                break;
            };
            let next = self.perform_unit_of_work(unit)?;
            self.state.borrow_mut().next_unit = next;
            if deadline.time_remaining().is_zero() {
                break;
            }
        }
        let pass_complete = {
            let state = self.state.borrow();
            state.next_unit.is_none() && state.wip_root.is_some()
        };
        if pass_complete {
            self.commit_root()?;
        }
        Ok(())
    }

    /// True while a pass is in flight or scheduled.
    pub fn needs_work(&self) -> bool {
        self.state.borrow().needs_work()
    }

    /// Weak handle for setters and drivers.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Registers a callback invoked whenever new work is scheduled. The
    /// callback must not re-enter the runtime.
    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        self.state.borrow_mut().waker = Some(Rc::new(waker));
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Root fiber of the last committed tree, if any pass has committed.
    pub fn current_root(&self) -> Option<FiberId> {
        self.state.borrow().current_root
    }

    /// Committed host node at the root position under the container, walking
    /// past component fibers. Mostly useful to tests and demos.
    pub fn committed_host_root(&self) -> Option<HostNodeId> {
        let state = self.state.borrow();
        let mut cursor = state.arena[state.current_root?].child;
        while let Some(id) = cursor {
            if let Some(node) = state.arena[id].host_node {
                return Some(node);
            }
            cursor = state.arena[id].child;
        }
        None
    }

    fn perform_unit_of_work(&mut self, unit: FiberId) -> Result<Option<FiberId>, RenderError> {
        let kind = self.state.borrow().arena[unit].kind;
        match kind {
            ElementKind::Component(func) => self.update_component(unit, func),
            ElementKind::Host(_) | ElementKind::Text => self.update_host(unit)?,
        }
        Ok(next_fiber(&self.state.borrow().arena, unit))
    }

    /// Evaluates a component fiber: runs its function against a fresh scope
    /// and reconciles the single child element it returns.
    fn update_component(&mut self, unit: FiberId, func: crate::element::ComponentFn) {
        let (props, children, old_hooks) = {
            let state = self.state.borrow();
            let fiber = &state.arena[unit];
            let old_hooks = fiber
                .alternate
                .map(|alt| state.arena[alt].hooks.clone())
                .unwrap_or_default();
            (fiber.props.clone(), fiber.children.clone(), old_hooks)
        };

        // The scope owns everything the evaluation needs, so no borrow of
        // the session state is held while user code runs; setters invoked
        // synchronously during evaluation re-borrow safely.
        let mut scope = Scope::new(self.handle(), props, children, old_hooks);
        let child = func(&mut scope);
        let hooks = scope.into_hooks();

        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        state.arena[unit].hooks = hooks;
        reconcile_children(
            &mut state.arena,
            unit,
            std::slice::from_ref(&child),
            &mut state.deletions,
        );
    }

    /// Ensures a host fiber owns a host node, then reconciles its element
    /// children.
    fn update_host(&mut self, unit: FiberId) -> Result<(), RenderError> {
        let pending = {
            let state = self.state.borrow();
            let fiber = &state.arena[unit];
            fiber
                .host_node
                .is_none()
                .then(|| (fiber.kind, fiber.props.clone()))
        };
        if let Some((kind, props)) = pending {
            let node = match kind {
                ElementKind::Host(tag) => self.host.create_node(tag),
                ElementKind::Text => {
                    let text = props
                        .get(NODE_VALUE)
                        .and_then(|value| value.as_text())
                        .unwrap_or_default();
                    self.host.create_text(text)
                }
                ElementKind::Component(_) => unreachable!("component fibers own no host node"),
            };
            // Initial prop application shares the commit-phase diff rule,
            // diffing against an empty prop set.
            crate::commit::update_host_props(&mut self.host, node, &Props::default(), &props)?;
            self.state.borrow_mut().arena[unit].host_node = Some(node);
            trace!("created host node {node} for {kind:?}");
        }

        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let children = std::mem::take(&mut state.arena[unit].children);
        reconcile_children(&mut state.arena, unit, &children, &mut state.deletions);
        state.arena[unit].children = children;
        Ok(())
    }
}

#[cfg(test)]
impl<H: HostBackend> Runtime<H> {
    pub(crate) fn fiber_count(&self) -> usize {
        self.state.borrow().arena.len()
    }
}

/// Weak reference to a render session.
///
/// Held by setters and drivers; every operation silently no-ops once the
/// session has been dropped.
#[derive(Clone)]
pub struct RuntimeHandle {
    state: Weak<RefCell<RuntimeState>>,
}

impl RuntimeHandle {
    /// Schedules a re-render of the committed tree: a new work-in-progress
    /// root whose alternate is the current root, reusing its props and host
    /// node. Replaces any in-flight pass outright.
    pub fn request_render(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let waker = {
            let mut state = state.borrow_mut();
            let state = &mut *state;
            let Some(current) = state.current_root else {
                // A setter fired before anything committed; the action stays
                // queued and folds into whichever render happens next.
                warn!("state update before first commit; nothing to re-render");
                return;
            };
            let committed = &state.arena[current];
            let (kind, props, children, host_node) = (
                committed.kind,
                committed.props.clone(),
                committed.children.clone(),
                committed.host_node,
            );
            let root = state.arena.insert(Fiber {
                kind,
                props,
                children,
                host_node,
                parent: None,
                child: None,
                sibling: None,
                alternate: Some(current),
                effect: EffectTag::None,
                hooks: Vec::new(),
            });
            state.wip_root = Some(root);
            state.next_unit = Some(root);
            state.deletions.clear();
            trace!("re-render scheduled from state update");
            state.waker.clone()
        };
        if let Some(waker) = waker {
            waker();
        }
    }

    /// True while the session is alive and has pending work.
    pub fn needs_work(&self) -> bool {
        self.state
            .upgrade()
            .map(|state| state.borrow().needs_work())
            .unwrap_or(false)
    }

    pub fn is_alive(&self) -> bool {
        self.state.strong_count() > 0
    }
}
