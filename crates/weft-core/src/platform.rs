//! Platform abstraction for the cooperative work loop.
//!
//! The scheduler yields between units of work based on a host-supplied
//! deadline, so the runtime can share a thread with whatever else the host
//! is doing. Drivers (a frame pump, a test harness) construct a deadline per
//! slice and re-invoke the work loop for as long as the runtime reports
//! pending work.

use std::cell::Cell;
use std::time::Duration;

/// Remaining budget of the current time slice.
pub trait Deadline {
    /// Returns the time left in this slice; the work loop yields after the
    /// current unit once this reaches zero.
    fn time_remaining(&self) -> Duration;
}

/// Deadline that never expires; one `work_loop` call drains the whole pass.
/// Useful for draining a runtime synchronously.
pub struct UnboundedDeadline;

impl Deadline for UnboundedDeadline {
    fn time_remaining(&self) -> Duration {
        Duration::from_millis(50)
    }
}

/// Deadline that permits a fixed number of units per `work_loop` call.
/// Useful for stepping the scheduler one fiber at a time.
pub struct BoundedDeadline {
    left: Cell<u32>,
}

impl BoundedDeadline {
    /// Permits `units` units of work. The work loop always makes progress
    /// when work is pending, so zero behaves like one.
    pub fn units(units: u32) -> Self {
        Self {
            left: Cell::new(units),
        }
    }
}

impl Deadline for BoundedDeadline {
    fn time_remaining(&self) -> Duration {
        let left = self.left.get();
        if left <= 1 {
            Duration::ZERO
        } else {
            self.left.set(left - 1);
            Duration::from_millis(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_deadline_expires_after_its_units() {
        let deadline = BoundedDeadline::units(2);
        assert!(!deadline.time_remaining().is_zero());
        assert!(deadline.time_remaining().is_zero());
    }

    #[test]
    fn unbounded_deadline_never_reports_zero() {
        assert!(!UnboundedDeadline.time_remaining().is_zero());
    }
}
