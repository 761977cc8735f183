//! Per-evaluation hook context.
//!
//! Every component evaluation gets a fresh [`Scope`]: the fiber's props and
//! children, the previous generation's hooks (reached through the alternate
//! chain), and a cursor that advances one position per hook call. Hook
//! identity is purely positional, so a component must call its hooks in the
//! same order on every render of the same position.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::element::{Element, Props};
use crate::fiber::{Hook, HookAction};
use crate::scheduler::RuntimeHandle;

/// Evaluation context passed to a component function.
///
/// Exists only while the scheduler is evaluating the component, which is
/// what makes hook calls outside an active evaluation unrepresentable.
pub struct Scope {
    handle: RuntimeHandle,
    props: Props,
    children: Vec<Element>,
    old_hooks: Vec<Hook>,
    hooks: Vec<Hook>,
    cursor: usize,
}

impl Scope {
    pub(crate) fn new(
        handle: RuntimeHandle,
        props: Props,
        children: Vec<Element>,
        old_hooks: Vec<Hook>,
    ) -> Self {
        Self {
            handle,
            props,
            children,
            old_hooks,
            hooks: Vec::new(),
            cursor: 0,
        }
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Declares a positional state cell.
    ///
    /// Seeds from the hook at this position in the previous render when one
    /// exists, folds any actions its setter queued since, and returns the
    /// resolved value together with the setter for this position. Setter
    /// calls enqueue an action and request a re-render; actions issued
    /// before the scheduler next drains fold together, in call order, on
    /// the next pass.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, Setter<T>) {
        let old_hook = self.old_hooks.get(self.cursor);

        let mut state: Rc<dyn Any> = match old_hook {
            Some(hook) if hook.state.is::<T>() => Rc::clone(&hook.state),
            Some(_) => {
                // Positional protocol got out of step; reseed rather than
                // carry a value of the wrong type forward.
                warn!("hook at position {} changed state type; reseeding", self.cursor);
                Rc::new(initial)
            }
            None => Rc::new(initial),
        };

        if let Some(hook) = old_hook {
            let actions: Vec<HookAction> = hook.queue.borrow_mut().drain(..).collect();
            for action in actions {
                state = action(state);
            }
        }

        let queue: Rc<RefCell<Vec<HookAction>>> = Rc::new(RefCell::new(Vec::new()));
        self.hooks.push(Hook {
            state: Rc::clone(&state),
            queue: Rc::clone(&queue),
        });
        self.cursor += 1;

        let value = state
            .downcast_ref::<T>()
            .cloned()
            .expect("hook state type pinned above");
        (
            value,
            Setter {
                queue,
                handle: self.handle.clone(),
                _marker: std::marker::PhantomData,
            },
        )
    }

    #[allow(non_snake_case)]
    pub fn useState<T: Clone + 'static>(&mut self, initial: T) -> (T, Setter<T>) {
        self.use_state(initial)
    }

    pub(crate) fn into_hooks(self) -> Vec<Hook> {
        self.hooks
    }
}

/// Setter for one hook position.
///
/// Cloneable and `'static`; typically captured by event handler closures.
/// Once the owning runtime is gone, calls become no-ops.
pub struct Setter<T> {
    queue: Rc<RefCell<Vec<HookAction>>>,
    handle: RuntimeHandle,
    _marker: std::marker::PhantomData<fn(T) -> T>,
}

impl<T: Clone + 'static> Setter<T> {
    /// Enqueues a state-folding action and requests a re-render.
    pub fn update(&self, f: impl Fn(T) -> T + 'static) {
        let action: HookAction = Rc::new(move |state: Rc<dyn Any>| -> Rc<dyn Any> {
            match state.downcast::<T>() {
                Ok(current) => Rc::new(f((*current).clone())),
                Err(original) => original,
            }
        });
        self.queue.borrow_mut().push(action);
        self.handle.request_render();
    }

    /// Replaces the state outright.
    pub fn set(&self, value: T) {
        self.update(move |_| value.clone());
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            handle: self.handle.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}
