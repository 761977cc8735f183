//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides the concrete scheduling pieces the core leaves
//! abstract: [`StdDeadline`], an [`Instant`]-budgeted time slice, and
//! [`IdlePump`], the perpetually re-armed driver that plays the role of the
//! host's idle-callback loop. The pump runs until explicitly shut down, so
//! tearing the runtime down is a visible operation rather than an implied
//! one.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use weft_core::{Deadline, HostBackend, RenderError, Runtime};

/// Default per-slice budget, in the ballpark of one frame's idle time.
pub const DEFAULT_SLICE_BUDGET: Duration = Duration::from_millis(8);

/// How long the pump sleeps between polls when the runtime is idle.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Time slice measured against a real clock.
pub struct StdDeadline {
    started: Instant,
    budget: Duration,
}

impl StdDeadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }
}

impl Deadline for StdDeadline {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

/// Handle for stopping a running [`IdlePump`] from a handler or another
/// borrow of the same thread.
#[derive(Clone)]
pub struct PumpHandle {
    stop: Rc<Cell<bool>>,
}

impl PumpHandle {
    /// Asks the pump to stop after the slice in progress.
    pub fn shutdown(&self) {
        self.stop.set(true);
    }

    pub fn is_shutdown(&self) -> bool {
        self.stop.get()
    }
}

/// Perpetually re-armed work-loop driver.
///
/// Owns the runtime and keeps invoking its work loop in budgeted slices, the
/// way a host idle callback would, until the [`PumpHandle`] asks it to stop.
pub struct IdlePump<H: HostBackend> {
    runtime: Runtime<H>,
    budget: Duration,
    stop: Rc<Cell<bool>>,
}

impl<H: HostBackend> IdlePump<H> {
    pub fn new(runtime: Runtime<H>) -> Self {
        Self::with_budget(runtime, DEFAULT_SLICE_BUDGET)
    }

    pub fn with_budget(runtime: Runtime<H>, budget: Duration) -> Self {
        Self {
            runtime,
            budget,
            stop: Rc::new(Cell::new(false)),
        }
    }

    pub fn handle(&self) -> PumpHandle {
        PumpHandle {
            stop: Rc::clone(&self.stop),
        }
    }

    pub fn runtime(&self) -> &Runtime<H> {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime<H> {
        &mut self.runtime
    }

    pub fn into_runtime(self) -> Runtime<H> {
        self.runtime
    }

    /// Runs one budgeted slice; returns whether work remains afterwards.
    pub fn pump_once(&mut self) -> Result<bool, RenderError> {
        let deadline = StdDeadline::new(self.budget);
        self.runtime.work_loop(&deadline)?;
        Ok(self.runtime.needs_work())
    }

    /// Pumps until the runtime is idle or the pump is shut down.
    pub fn run_until_idle(&mut self) -> Result<(), RenderError> {
        while !self.stop.get() && self.pump_once()? {}
        Ok(())
    }

    /// Runs forever, sleeping briefly while idle, until [`PumpHandle::shutdown`]
    /// is observed. Event handlers re-arm work on the runtime as they fire,
    /// and the pump picks it up on the next poll.
    pub fn run(&mut self) -> Result<(), RenderError> {
        debug!("idle pump started");
        while !self.stop.get() {
            if !self.pump_once()? {
                thread::sleep(IDLE_POLL);
            }
        }
        debug!("idle pump shut down");
        Ok(())
    }
}

impl<H: HostBackend> fmt::Debug for IdlePump<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdlePump")
            .field("budget", &self.budget)
            .field("stopped", &self.stop.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{Element, MemoryHost};

    #[test]
    fn std_deadline_runs_out_of_budget() {
        let deadline = StdDeadline::new(Duration::ZERO);
        assert!(deadline.time_remaining().is_zero());

        let generous = StdDeadline::new(Duration::from_secs(60));
        assert!(!generous.time_remaining().is_zero());
    }

    #[test]
    fn pump_drains_a_render_to_idle() {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        let mut runtime = Runtime::new(host);
        runtime.render(
            Element::host("div").with_child(Element::host("h1").with_child("hi")),
            container,
        );

        let mut pump = IdlePump::new(runtime);
        pump.run_until_idle().unwrap();

        assert!(!pump.runtime().needs_work());
        assert!(pump.runtime().host().find_by_tag("h1").is_some());
    }

    #[test]
    fn shutdown_stops_the_pump_with_work_pending() {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        let mut runtime = Runtime::new(host);
        runtime.render(Element::host("div"), container);

        let mut pump = IdlePump::new(runtime);
        pump.handle().shutdown();
        pump.run().unwrap();

        // The pump observed the stop flag before pumping; nothing committed.
        assert!(pump.runtime().needs_work());
    }

    #[test]
    fn tiny_budgets_still_make_progress() {
        let mut host = MemoryHost::new();
        let container = host.create_node("root");
        let mut runtime = Runtime::new(host);
        runtime.render(
            Element::host("div").with_child(Element::host("p").with_child("x")),
            container,
        );

        let mut pump = IdlePump::with_budget(runtime, Duration::ZERO);
        pump.run_until_idle().unwrap();

        assert!(pump.runtime().host().find_by_tag("p").is_some());
    }
}
