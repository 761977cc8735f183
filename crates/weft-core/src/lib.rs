#![doc = r"Core fiber runtime pieces for Weft.

Weft is a minimal retained-mode UI runtime: declarative element trees go in,
a retained fiber tree is diffed incrementally under a cooperative scheduler,
and a minimal set of mutations is committed to a host tree supplied by the
embedder. Per-component local state survives re-renders through positional
hooks carried across generations of the fiber tree."]

pub mod element;
pub mod fiber;
pub mod host;
pub mod memory_host;
pub mod platform;
pub mod scheduler;
pub mod scope;

mod commit;
mod reconcile;

pub use element::{
    createElement, create_element, ComponentFn, Element, ElementKind, EventHandler, PropValue,
    Props, EVENT_PREFIX, NODE_VALUE,
};
pub use fiber::{EffectTag, FiberId, Hook};
pub use host::{HostBackend, HostNodeId};
pub use memory_host::{HostMutation, MemoryHost};
pub use platform::{BoundedDeadline, Deadline, UnboundedDeadline};
pub use scheduler::{Runtime, RuntimeHandle};
pub use scope::{Scope, Setter};

use std::fmt;

/// Errors surfaced by the commit phase and host mutations.
///
/// The runtime has no partial-failure recovery: scheduling and commit errors
/// propagate to the driver and are never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A host handle no longer refers to a live node.
    MissingNode { node: HostNodeId },
    /// The commit-time ancestor climb for a host node fell off the tree.
    /// Construction guarantees the true root owns a host node, so this is
    /// fatal and non-recoverable.
    NoHostAncestor,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingNode { node } => write!(f, "host node {node} missing"),
            RenderError::NoHostAncestor => {
                write!(f, "no host-bearing ancestor for committed fiber")
            }
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::thread_local;

    thread_local! {
        static CAPTURED_SETTER: RefCell<Option<Setter<i64>>> = RefCell::new(None);
    }

    fn static_page(_scope: &mut Scope) -> Element {
        Element::host("div")
            .with_child(Element::host("h1").with_child("hello"))
            .with_child(Element::host("p").with_child("world"))
    }

    fn counter(scope: &mut Scope) -> Element {
        let (count, set_count) = scope.use_state(1i64);
        CAPTURED_SETTER.with(|slot| *slot.borrow_mut() = Some(set_count.clone()));
        let on_click = {
            let set = set_count.clone();
            move || {
                set.update(|i| i + 1);
                set.update(|i| i + 1);
            }
        };
        Element::host("div")
            .with_child(Element::host("h1").with_child(count.to_string()))
            .with_child(
                Element::host("button")
                    .with_handler("onClick", on_click)
                    .with_child("+1"),
            )
    }

    fn shifting_counter(scope: &mut Scope) -> Element {
        let (shift, set_shift) = scope.use_state(1i64);
        CAPTURED_SETTER.with(|slot| *slot.borrow_mut() = Some(set_shift.clone()));
        let on_click = {
            let set = set_shift.clone();
            move || {
                set.update(|i| i + 1);
                set.update(|i| i * 2);
            }
        };
        Element::host("div")
            .with_child(Element::host("h1").with_child(shift.to_string()))
            .with_child(Element::host("button").with_handler("onClick", on_click))
    }

    fn type_shifting(scope: &mut Scope) -> Element {
        let alt = scope
            .props()
            .get("alt")
            .map(|value| *value == PropValue::Bool(true))
            .unwrap_or(false);
        let text = if alt {
            let (s, _) = scope.use_state(String::from("fresh"));
            s
        } else {
            let (n, _) = scope.use_state(41i64);
            n.to_string()
        };
        Element::host("div").with_child(Element::host("h1").with_child(text))
    }

    fn heading(tag: &'static str, text: &str) -> Element {
        Element::host("div").with_child(Element::host(tag).with_child(text.to_owned()))
    }

    fn settle(runtime: &mut Runtime<MemoryHost>) {
        while runtime.needs_work() {
            runtime.work_loop(&UnboundedDeadline).expect("work loop");
        }
    }

    fn mounted(element: Element) -> (Runtime<MemoryHost>, HostNodeId) {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        let mut runtime = Runtime::new(host);
        runtime.render(element, container);
        settle(&mut runtime);
        (runtime, container)
    }

    fn rerender(runtime: &mut Runtime<MemoryHost>, element: Element, container: HostNodeId) {
        runtime.render(element, container);
        settle(runtime);
    }

    fn click(runtime: &mut Runtime<MemoryHost>, node: HostNodeId) {
        assert!(
            runtime.host().dispatch(node, "click"),
            "no click listener registered"
        );
        settle(runtime);
    }

    fn h1_of(runtime: &Runtime<MemoryHost>) -> String {
        let host = runtime.host();
        let h1 = host.find_by_tag("h1").expect("h1 committed");
        let text = host.children_of(h1)[0];
        host.text_of(text).expect("text node").to_owned()
    }

    #[test]
    fn identical_rerender_produces_no_placements_or_deletions() {
        let (mut runtime, container) = mounted(Element::component(static_page));
        runtime.host_mut().take_journal();

        rerender(&mut runtime, Element::component(static_page), container);

        let journal = runtime.host_mut().take_journal();
        assert!(journal.iter().all(|m| !matches!(
            m,
            HostMutation::AppendChild { .. }
                | HostMutation::RemoveChild { .. }
                | HostMutation::CreateNode { .. }
                | HostMutation::CreateText { .. }
        )));
    }

    #[test]
    fn same_kind_position_preserves_host_node_identity() {
        let (mut runtime, container) = mounted(Element::host("div").with_prop("id", "a"));
        let div = runtime.host().find_by_tag("div").unwrap();

        rerender(
            &mut runtime,
            Element::host("div").with_prop("id", "b"),
            container,
        );

        assert_eq!(runtime.host().find_by_tag("div"), Some(div));
        assert_eq!(runtime.host().attr(div, "id"), Some(&PropValue::from("b")));
    }

    #[test]
    fn changed_kind_produces_one_deletion_and_one_placement() {
        let (mut runtime, container) =
            mounted(Element::host("div").with_child(Element::host("span")));
        let span = runtime.host().find_by_tag("span").unwrap();
        runtime.host_mut().take_journal();

        rerender(
            &mut runtime,
            Element::host("div").with_child(Element::host("p")),
            container,
        );

        let journal = runtime.host_mut().take_journal();
        let removals: Vec<_> = journal
            .iter()
            .filter(|m| matches!(m, HostMutation::RemoveChild { .. }))
            .collect();
        let appends: Vec<_> = journal
            .iter()
            .filter(|m| matches!(m, HostMutation::AppendChild { .. }))
            .collect();
        assert_eq!(removals.len(), 1);
        assert_eq!(appends.len(), 1);
        assert!(matches!(
            removals[0],
            HostMutation::RemoveChild { child, .. } if *child == span
        ));
        assert!(runtime.host().find_by_tag("p").is_some());
        assert!(runtime.host().find_by_tag("span").is_none());
    }

    #[test]
    fn deletions_commit_before_placements() {
        let (mut runtime, container) =
            mounted(Element::host("div").with_child(Element::host("span")));
        runtime.host_mut().take_journal();

        rerender(
            &mut runtime,
            Element::host("div").with_child(Element::host("p")),
            container,
        );

        let journal = runtime.host_mut().take_journal();
        let removal = journal
            .iter()
            .position(|m| matches!(m, HostMutation::RemoveChild { .. }))
            .expect("one removal");
        let placement = journal
            .iter()
            .position(|m| matches!(m, HostMutation::AppendChild { .. }))
            .expect("one placement");
        assert!(removal < placement);
    }

    #[test]
    fn no_tree_is_exposed_while_work_remains() {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        let mut runtime = Runtime::new(host);
        runtime.render(Element::component(static_page), container);

        let mut slices = 0;
        while runtime.needs_work() {
            runtime.work_loop(&BoundedDeadline::units(1)).unwrap();
            slices += 1;
            if runtime.needs_work() {
                // Mid-pass: nodes may exist detached, but nothing may have
                // been attached anywhere yet.
                assert!(runtime
                    .host()
                    .journal()
                    .iter()
                    .all(|m| !matches!(m, HostMutation::AppendChild { .. })));
            }
            assert!(slices < 64, "scheduler failed to converge");
        }
        assert!(runtime
            .host()
            .journal()
            .iter()
            .any(|m| matches!(m, HostMutation::AppendChild { .. })));
        assert!(slices > 1, "expected the pass to span multiple slices");
    }

    #[test]
    fn counter_folds_both_queued_actions_into_one_pass() {
        let (mut runtime, _container) = mounted(Element::component(counter));
        assert_eq!(h1_of(&runtime), "1");

        let button = runtime.host().find_by_tag("button").unwrap();
        click(&mut runtime, button);

        // Two queued increments fold together on the next pass: 1 -> 3.
        assert_eq!(h1_of(&runtime), "3");
    }

    #[test]
    fn queued_actions_fold_in_call_order() {
        let (mut runtime, _container) = mounted(Element::component(shifting_counter));

        let button = runtime.host().find_by_tag("button").unwrap();
        click(&mut runtime, button);

        // (1 + 1) * 2, not 1 * 2 + 1.
        assert_eq!(h1_of(&runtime), "4");
    }

    #[test]
    fn text_change_is_a_single_update_on_the_text_node() {
        let (mut runtime, container) = mounted(heading("h1", "A"));
        runtime.host_mut().take_journal();

        rerender(&mut runtime, heading("h1", "B"), container);

        let journal = runtime.host_mut().take_journal();
        let updates: Vec<_> = journal
            .iter()
            .filter(|m| matches!(m, HostMutation::SetAttribute { .. }))
            .collect();
        assert_eq!(updates.len(), 1);
        assert!(matches!(
            updates[0],
            HostMutation::SetAttribute { name, value, .. }
                if name == NODE_VALUE && *value == PropValue::from("B")
        ));
        assert!(journal.iter().all(|m| !matches!(
            m,
            HostMutation::AppendChild { .. } | HostMutation::RemoveChild { .. }
        )));
    }

    #[test]
    fn removed_and_changed_props_are_cleared_and_set() {
        let (mut runtime, container) = mounted(
            Element::host("div")
                .with_prop("id", "a")
                .with_prop("title", "t"),
        );
        let div = runtime.host().find_by_tag("div").unwrap();
        runtime.host_mut().take_journal();

        rerender(
            &mut runtime,
            Element::host("div").with_prop("id", "b"),
            container,
        );

        let journal = runtime.host_mut().take_journal();
        assert!(journal.contains(&HostMutation::ClearAttribute {
            node: div,
            name: "title".into()
        }));
        assert!(journal.contains(&HostMutation::SetAttribute {
            node: div,
            name: "id".into(),
            value: PropValue::from("b")
        }));
        assert_eq!(runtime.host().attr(div, "title"), None);
    }

    #[test]
    fn rerendered_handlers_are_rebound_by_identity() {
        let (mut runtime, _container) = mounted(Element::component(counter));
        let button = runtime.host().find_by_tag("button").unwrap();
        runtime.host_mut().take_journal();

        let setter = CAPTURED_SETTER
            .with(|slot| slot.borrow().clone())
            .expect("setter captured");
        setter.update(|i| i);
        settle(&mut runtime);

        // The handler closure is rebuilt each render, so the listener is
        // unregistered and re-registered.
        let journal = runtime.host_mut().take_journal();
        assert!(journal.contains(&HostMutation::RemoveListener {
            node: button,
            event: "click".into()
        }));
        assert!(journal.contains(&HostMutation::AddListener {
            node: button,
            event: "click".into()
        }));
        assert!(runtime.host().has_listener(button, "click"));
    }

    #[test]
    fn new_render_discards_the_in_flight_pass() {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        let mut runtime = Runtime::new(host);

        runtime.render(Element::component(static_page), container);
        // Advance partway through the first pass, then replace it.
        runtime.work_loop(&BoundedDeadline::units(2)).unwrap();
        assert!(runtime.needs_work());

        rerender(&mut runtime, heading("h2", "fresh"), container);

        assert!(runtime.host().find_by_tag("h2").is_some());
        // The abandoned pass never committed: the container holds exactly
        // the replacement tree.
        assert_eq!(runtime.host().children_of(container).len(), 1);
        assert!(runtime.host().find_by_tag("h1").is_none());
    }

    #[test]
    fn superseded_generations_are_swept_from_the_arena() {
        let (mut runtime, _container) = mounted(Element::component(counter));
        let settled = runtime.fiber_count();

        let button = runtime.host().find_by_tag("button").unwrap();
        for _ in 0..5 {
            click(&mut runtime, button);
        }

        assert_eq!(runtime.fiber_count(), settled);
        // Host nodes are reused across generations, not recreated.
        assert_eq!(runtime.host().find_all_by_tag("h1").len(), 1);
    }

    #[test]
    fn independent_mounts_do_not_interfere() {
        let (mut a, _a_container) = mounted(Element::component(counter));
        let (b, _b_container) = mounted(heading("h1", "static"));

        let a_button = a.host().find_by_tag("button").unwrap();
        click(&mut a, a_button);

        assert_eq!(h1_of(&a), "3");
        assert_eq!(h1_of(&b), "static");
    }

    #[test]
    fn hook_type_change_reseeds_instead_of_carrying_stale_state() {
        let (mut runtime, container) = mounted(Element::component(type_shifting));
        assert_eq!(h1_of(&runtime), "41");

        rerender(
            &mut runtime,
            Element::component(type_shifting).with_prop("alt", true),
            container,
        );
        assert_eq!(h1_of(&runtime), "fresh");
    }

    #[test]
    fn setter_outliving_its_runtime_is_a_noop() {
        let (runtime, _container) = mounted(Element::component(counter));
        let setter = CAPTURED_SETTER
            .with(|slot| slot.borrow().clone())
            .expect("setter captured");

        drop(runtime);
        setter.update(|i| i + 1);
    }

    #[test]
    fn waker_fires_when_work_is_scheduled() {
        let (runtime, _container) = mounted(Element::component(counter));
        let woke = Rc::new(Cell::new(false));
        let flag = woke.clone();
        runtime.set_waker(move || flag.set(true));

        let setter = CAPTURED_SETTER
            .with(|slot| slot.borrow().clone())
            .expect("setter captured");
        setter.update(|i| i + 1);

        assert!(woke.get());
        assert!(runtime.needs_work());
    }

    #[test]
    fn render_error_messages_name_the_failure() {
        assert_eq!(
            RenderError::MissingNode { node: 3 }.to_string(),
            "host node 3 missing"
        );
        assert_eq!(
            RenderError::NoHostAncestor.to_string(),
            "no host-bearing ancestor for committed fiber"
        );
    }
}
