//! Execution-order bookkeeping for manually logged runs.
//!
//! When runs are submitted out of band rather than through an
//! instrumented call stack, the service still needs `execution_order`
//! and `parent_run_id` on each payload to reconstruct the call tree.
//! [`RunOrderTracker`] computes those values locally: it keeps one
//! counter per parent, hands out the next value at `begin`, and raises
//! the parent's counter again at `end` so a sibling begun after a close
//! always sorts after everything the closed child produced.
//!
//! The tracker performs no I/O and owns none of the run content — only
//! the transient counters keyed by run id.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct TrackerState {
    /// Execution order assigned to each begun run.
    orders: HashMap<Uuid, u32>,
    /// Highest order handed out beneath each run acting as a parent.
    counters: HashMap<Uuid, u32>,
    /// Open child -> parent linkage, removed when the child closes.
    parents: HashMap<Uuid, Uuid>,
    /// Runs that have been closed. Closing is one-way.
    closed: HashSet<Uuid>,
}

/// Assigns `execution_order` values to manually logged runs.
///
/// Orders are unique among siblings sharing a parent and strictly
/// increasing in call order; a root run always gets order 1. One
/// tracker instance can serve concurrent trace trees: every operation
/// takes a single lock over the counter tables, which is sufficient
/// because each call touches at most two entries (the run's own and
/// its direct parent's).
///
/// # Example
///
/// ```
/// use tracesmith::RunOrderTracker;
/// use uuid::Uuid;
///
/// let tracker = RunOrderTracker::new();
/// let root = Uuid::new_v4();
/// let child = Uuid::new_v4();
///
/// assert_eq!(tracker.begin(root, None).unwrap(), 1);
/// assert_eq!(tracker.begin(child, Some(root)).unwrap(), 1);
/// tracker.end(child).unwrap();
/// tracker.end(root).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct RunOrderTracker {
    state: Mutex<TrackerState>,
}

impl RunOrderTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run as open and return its `execution_order`.
    ///
    /// With a parent, the parent's counter is incremented and the new
    /// value returned; the first child under any parent gets 1.
    /// Without a parent the run is a root and the order is fixed at 1.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateRun`] if `run_id` was already begun.
    pub fn begin(&self, run_id: Uuid, parent_run_id: Option<Uuid>) -> Result<u32> {
        let mut state = self.state.lock();
        if state.orders.contains_key(&run_id) {
            return Err(Error::DuplicateRun(run_id));
        }

        let order = match parent_run_id {
            Some(parent) => {
                let counter = state.counters.entry(parent).or_insert(0);
                *counter += 1;
                let order = *counter;
                state.parents.insert(run_id, parent);
                order
            }
            None => 1,
        };

        state.orders.insert(run_id, order);
        Ok(order)
    }

    /// Close a run, propagating its order to the parent's counter.
    ///
    /// The parent's counter is raised to at least this run's order, so
    /// any sibling begun afterwards receives a strictly larger value.
    /// Children of the closed run need not be closed first; a late
    /// `end` on one of them still finds the counter entry it updates.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownRun`] if `run_id` was never begun,
    /// [`Error::AlreadyClosed`] on a second close.
    pub fn end(&self, run_id: Uuid) -> Result<()> {
        let mut state = self.state.lock();
        let Some(&order) = state.orders.get(&run_id) else {
            return Err(Error::UnknownRun(run_id));
        };
        if !state.closed.insert(run_id) {
            return Err(Error::AlreadyClosed(run_id));
        }

        if let Some(parent) = state.parents.remove(&run_id) {
            let counter = state.counters.entry(parent).or_insert(0);
            *counter = (*counter).max(order);
        }
        Ok(())
    }

    /// Execution order assigned to `run_id`, if it was begun.
    #[must_use]
    pub fn order_of(&self, run_id: Uuid) -> Option<u32> {
        self.state.lock().orders.get(&run_id).copied()
    }

    /// Whether `run_id` has been closed.
    #[must_use]
    pub fn is_closed(&self, run_id: Uuid) -> bool {
        self.state.lock().closed.contains(&run_id)
    }
}
