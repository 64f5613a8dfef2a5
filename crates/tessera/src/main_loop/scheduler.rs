//! Timeout queue and idle handler list
//!
//! Both lists are detached from the scheduler while their callbacks run, so a
//! callback may add or remove entries (including itself) without touching the
//! list being iterated. Entries added during a run land in the live list and
//! are not seen until the next run; entries removed during a run are recorded
//! and skipped.
//!
//! A callback may start a nested run (a modal dialog shown from a timer or
//! idle handler). Bookkeeping is therefore per entry: an id stays in flight,
//! and a removal stays recorded, until that entry itself is settled.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use super::clock::ticks;

/// Callback for timeouts and idle handlers. Returning `false` removes it.
pub type Callback<H> = Box<dyn FnMut(&mut H) -> bool>;

/// Token returned by [`Scheduler::add_timeout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutId(u64);

/// Token returned by [`Scheduler::add_idle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdleId(u64);

impl fmt::Display for TimeoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timeout-{}", self.0)
    }
}

impl fmt::Display for IdleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "idle-{}", self.0)
    }
}

/// A scheduled timeout
pub struct Timeout<H> {
    id: TimeoutId,
    span: Duration,
    callback: Callback<H>,
}

impl<H> Timeout<H> {
    pub fn id(&self) -> TimeoutId {
        self.id
    }

    pub fn span(&self) -> Duration {
        self.span
    }

    /// Run the callback. `true` means reschedule.
    pub fn fire(&mut self, host: &mut H) -> bool {
        (self.callback)(host)
    }
}

/// An idle handler taken out for a run
pub struct Idle<H> {
    id: IdleId,
    callback: Callback<H>,
}

impl<H> Idle<H> {
    pub fn id(&self) -> IdleId {
        self.id
    }

    /// Run the callback. `true` means keep it.
    pub fn fire(&mut self, host: &mut H) -> bool {
        (self.callback)(host)
    }
}

pub struct Scheduler<H> {
    timeouts: BTreeMap<u64, Timeout<H>>,
    idle: Vec<Idle<H>>,
    next_id: u64,
    /// Detached timeouts not yet settled, across nested runs
    timeouts_in_flight: HashSet<TimeoutId>,
    /// Detached idle handlers not yet settled, across nested runs
    idle_in_flight: HashSet<IdleId>,
    removed_timeouts: HashSet<TimeoutId>,
    removed_idle: HashSet<IdleId>,
}

impl<H> Default for Scheduler<H> {
    fn default() -> Self {
        Self {
            timeouts: BTreeMap::new(),
            idle: Vec::new(),
            next_id: 0,
            timeouts_in_flight: HashSet::new(),
            idle_in_flight: HashSet::new(),
            removed_timeouts: HashSet::new(),
            removed_idle: HashSet::new(),
        }
    }
}

impl<H> fmt::Debug for Scheduler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("timeouts", &self.timeouts.keys().collect::<Vec<_>>())
            .field("idle", &self.idle.len())
            .finish()
    }
}

impl<H> Scheduler<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Schedule `callback` at `now + span`
    pub fn add_timeout(
        &mut self,
        now: u64,
        span: Duration,
        callback: impl FnMut(&mut H) -> bool + 'static,
    ) -> TimeoutId {
        let id = TimeoutId(self.next_id());
        self.insert_timeout(
            now,
            Timeout {
                id,
                span,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Put a timeout back at `now + span`. Ignored if it was removed while
    /// it was running.
    pub fn reschedule(&mut self, now: u64, timeout: Timeout<H>) {
        self.timeouts_in_flight.remove(&timeout.id);
        if self.removed_timeouts.remove(&timeout.id) {
            return;
        }
        self.insert_timeout(now, timeout);
    }

    /// Drop a detached timeout that asked not to run again or was removed
    /// before it fired
    pub fn retire(&mut self, id: TimeoutId) {
        self.timeouts_in_flight.remove(&id);
        self.removed_timeouts.remove(&id);
    }

    /// Deadline collisions move the new entry forward one tick at a time
    /// until its key is free.
    fn insert_timeout(&mut self, now: u64, timeout: Timeout<H>) {
        let mut tick = now.saturating_add(ticks(timeout.span));
        while self.timeouts.contains_key(&tick) {
            tick = tick.saturating_add(1);
        }
        self.timeouts.insert(tick, timeout);
    }

    /// Returns `false` if the timeout already finished or never existed
    pub fn remove_timeout(&mut self, id: TimeoutId) -> bool {
        if let Some(tick) = self
            .timeouts
            .iter()
            .find(|(_, t)| t.id == id)
            .map(|(tick, _)| *tick)
        {
            self.timeouts.remove(&tick);
            return true;
        }
        self.timeouts_in_flight.contains(&id) && self.removed_timeouts.insert(id)
    }

    /// Detach every timeout whose deadline is at or before `now`, in
    /// deadline order.
    pub fn take_due(&mut self, now: u64) -> Vec<Timeout<H>> {
        let later = self.timeouts.split_off(&now.saturating_add(1));
        let due = std::mem::replace(&mut self.timeouts, later);
        let due: Vec<Timeout<H>> = due.into_values().collect();
        self.timeouts_in_flight.extend(due.iter().map(|t| t.id));
        due
    }

    /// Whether a detached timeout should still fire
    pub fn is_live_timeout(&self, id: TimeoutId) -> bool {
        self.timeouts_in_flight.contains(&id) && !self.removed_timeouts.contains(&id)
    }

    pub fn add_idle(&mut self, callback: impl FnMut(&mut H) -> bool + 'static) -> IdleId {
        let id = IdleId(self.next_id());
        self.idle.push(Idle {
            id,
            callback: Box::new(callback),
        });
        id
    }

    pub fn remove_idle(&mut self, id: IdleId) -> bool {
        if let Some(index) = self.idle.iter().position(|h| h.id == id) {
            self.idle.remove(index);
            return true;
        }
        self.idle_in_flight.contains(&id) && self.removed_idle.insert(id)
    }

    /// Detach every queued idle handler
    pub fn take_idle(&mut self) -> Vec<Idle<H>> {
        let idle = std::mem::take(&mut self.idle);
        self.idle_in_flight.extend(idle.iter().map(|h| h.id));
        idle
    }

    /// Whether a detached idle handler should still run
    pub fn is_live_idle(&self, id: IdleId) -> bool {
        self.idle_in_flight.contains(&id) && !self.removed_idle.contains(&id)
    }

    /// Record that a detached handler ran, or was skipped with `keep` false.
    /// Returns whether it survives: it asked to stay and was not removed
    /// meanwhile.
    pub fn settle_idle(&mut self, id: IdleId, keep: bool) -> bool {
        self.idle_in_flight.remove(&id);
        let removed = self.removed_idle.remove(&id);
        keep && !removed
    }

    /// Reattach surviving idle handlers ahead of any added during the run
    pub fn restore_idle(&mut self, survivors: Vec<Idle<H>>) {
        let added = std::mem::replace(&mut self.idle, survivors);
        self.idle.extend(added);
    }

    /// Deadline of the earliest timeout
    pub fn next_deadline(&self) -> Option<u64> {
        self.timeouts.keys().next().copied()
    }

    pub fn has_due_timeouts(&self, now: u64) -> bool {
        self.next_deadline().is_some_and(|tick| tick <= now)
    }

    pub fn has_idle(&self) -> bool {
        !self.idle.is_empty()
    }

    pub fn timeout_count(&self) -> usize {
        self.timeouts.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn clear(&mut self) {
        self.timeouts.clear();
        self.idle.clear();
        self.timeouts_in_flight.clear();
        self.removed_timeouts.clear();
        self.idle_in_flight.clear();
        self.removed_idle.clear();
    }
}
