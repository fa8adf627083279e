//! Wall-clock budget for analyses whose cost depends on input shape.

use std::time::{Duration, Instant};

/// An optional point in time after which long-running loops give up.
///
/// Graph traversals and forecasts poll [`Deadline::expired`] once per visited
/// item; the unbounded variant never expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub const fn none() -> Self {
        Self { at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    /// `after(budget)` when a budget is set, otherwise unbounded.
    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map_or_else(Self::none, Self::after)
    }

    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}
