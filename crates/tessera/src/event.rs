//! Subscriber lists for application-level events
//!
//! Handlers receive mutable event args so they can set `handled` or
//! `cancel` flags, which the core checks synchronously right after raising.

use std::fmt;

/// Handle returned by [`EventHandlers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Handler<A> = Box<dyn FnMut(&mut A)>;

/// Ordered list of handlers for one event
pub struct EventHandlers<A> {
    handlers: Vec<(SubscriptionId, Handler<A>)>,
    next_id: u64,
}

impl<A> Default for EventHandlers<A> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<A> fmt::Debug for EventHandlers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("count", &self.handlers.len())
            .finish()
    }
}

impl<A> EventHandlers<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler; handlers run in subscription order
    pub fn subscribe(&mut self, handler: impl FnMut(&mut A) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        self.handlers.len() != before
    }

    /// Invoke every handler with the same args
    pub fn raise(&mut self, args: &mut A) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(args);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
