//! Ordered subscriber list used for state-change notifications.
//!
//! Handlers run synchronously in registration order. A handler may add or
//! remove listeners (itself included) or trigger a nested `emit` while it runs;
//! each `emit` iterates a snapshot taken when it started.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ids::{IdAllocator, ListenerToken};

/// Value returned by a handler to say whether it stays subscribed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Listen {
    Keep,
    Remove,
}

type Handler<T> = Rc<dyn Fn(&T) -> Listen>;

pub struct EventChannel<T> {
    ids: RefCell<IdAllocator>,
    handlers: RefCell<Vec<(ListenerToken, Handler<T>)>>,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            ids: RefCell::new(IdAllocator::new()),
            handlers: RefCell::new(Vec::new()),
        }
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler; it is called for every subsequent `emit`.
    pub fn add<F>(&self, handler: F) -> ListenerToken
    where
        F: Fn(&T) -> Listen + 'static,
    {
        let token = self.ids.borrow_mut().alloc_listener();
        self.handlers.borrow_mut().push((token, Rc::new(handler)));
        token
    }

    /// Unsubscribe. Returns false if the token was not (or no longer) registered.
    pub fn remove(&self, token: ListenerToken) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(t, _)| *t != token);
        handlers.len() != before
    }

    pub fn contains(&self, token: ListenerToken) -> bool {
        self.handlers.borrow().iter().any(|(t, _)| *t == token)
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Notify every handler subscribed when the call began.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<(ListenerToken, Handler<T>)> = self.handlers.borrow().clone();
        for (token, handler) in snapshot {
            // Skip handlers removed by an earlier handler in this same pass.
            if !self.contains(token) {
                continue;
            }
            if handler(event) == Listen::Remove {
                self.remove(token);
            }
        }
    }
}
