//! One-shot "wait until the animator reaches a state" handles.
//!
//! A [`StateWaiter`] resolves with the matching state name. It is a plain
//! `Future` for hosts that drive an executor, and can also be polled by hand
//! through [`StateWaiter::resolved_state`] from a frame loop.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use crate::events::{EventChannel, Listen};
use crate::ids::ListenerToken;

/// Which state names satisfy a wait.
#[derive(Clone)]
pub enum StateQuery {
    /// Exact name, including the reserved `"stop"` and `"pause"`.
    Name(String),
    /// Glob: `*` matches any run of characters, `?` exactly one. There is no
    /// escape syntax, so both are always wildcards; use [`StateQuery::Name`] or a
    /// predicate for state names containing them.
    Pattern(String),
    Predicate(Rc<dyn Fn(&str) -> bool>),
}

impl fmt::Debug for StateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateQuery::Name(name) => f.debug_tuple("Name").field(name).finish(),
            StateQuery::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            StateQuery::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl StateQuery {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        StateQuery::Pattern(pattern.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + 'static,
    {
        StateQuery::Predicate(Rc::new(f))
    }

    pub fn matches(&self, state: &str) -> bool {
        match self {
            StateQuery::Name(name) => name == state,
            StateQuery::Pattern(pattern) => glob_match(pattern, state),
            StateQuery::Predicate(f) => f(state),
        }
    }
}

impl Default for StateQuery {
    fn default() -> Self {
        StateQuery::Name(crate::state::STOP.to_string())
    }
}

impl From<&str> for StateQuery {
    fn from(name: &str) -> Self {
        StateQuery::Name(name.to_string())
    }
}

impl From<String> for StateQuery {
    fn from(name: String) -> Self {
        StateQuery::Name(name)
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    // Position of the last '*' seen and the text index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[derive(Default)]
struct Slot {
    state: Option<String>,
    waker: Option<Waker>,
}

/// Pending or settled wait created by [`Animator::wait_for_state`](crate::Animator::wait_for_state).
///
/// Dropping an unresolved waiter (or calling [`cancel`](Self::cancel))
/// unsubscribes it from the animator.
pub struct StateWaiter {
    slot: Rc<RefCell<Slot>>,
    channel: Weak<EventChannel<String>>,
    token: Option<ListenerToken>,
}

impl fmt::Debug for StateWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateWaiter")
            .field("resolved", &self.slot.borrow().state)
            .finish()
    }
}

impl StateWaiter {
    pub(crate) fn new(
        current: &str,
        query: StateQuery,
        channel: &Rc<EventChannel<String>>,
    ) -> Self {
        let slot = Rc::new(RefCell::new(Slot::default()));
        if query.matches(current) {
            slot.borrow_mut().state = Some(current.to_string());
            return Self {
                slot,
                channel: Rc::downgrade(channel),
                token: None,
            };
        }

        let target = slot.clone();
        let token = channel.add(move |state: &String| {
            if !query.matches(state) {
                return Listen::Keep;
            }
            let waker = {
                let mut slot = target.borrow_mut();
                slot.state = Some(state.clone());
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
            Listen::Remove
        });
        Self {
            slot,
            channel: Rc::downgrade(channel),
            token: Some(token),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().state.is_some()
    }

    /// The state that satisfied the query, once it has happened.
    pub fn resolved_state(&self) -> Option<String> {
        self.slot.borrow().state.clone()
    }

    /// Stop waiting. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl Drop for StateWaiter {
    fn drop(&mut self) {
        if self.is_resolved() {
            return;
        }
        if let (Some(token), Some(channel)) = (self.token, self.channel.upgrade()) {
            channel.remove(token);
        }
    }
}

impl Future for StateWaiter {
    type Output = String;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<String> {
        let mut slot = self.slot.borrow_mut();
        if let Some(state) = slot.state.clone() {
            return Poll::Ready(state);
        }
        slot.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}
