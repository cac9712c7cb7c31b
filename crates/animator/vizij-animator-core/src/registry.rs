//! Active-animator registry and batch update.
//!
//! A [`Registry`] holds every animator that is started and not paused. The host
//! loop advances all of them with one [`Registry::update`] call per tick.
//! Members may start, stop, pause or resume themselves or each other from their
//! callbacks while a batch runs; the batch walks a snapshot of membership taken
//! when the tick began.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{trace, warn};

use crate::error::AnimatorError;
use crate::ids::AnimatorId;

/// Type-erased view of an animator, so one registry can hold animators with
/// different parameter payloads.
pub(crate) trait Member {
    fn id(&self) -> AnimatorId;
    /// Started and not paused.
    fn is_active(&self) -> bool;
    fn tick(&self, delta: f64) -> Result<(), AnimatorError>;
}

/// Shared, cheaply cloneable set of active animators. Iteration order is
/// insertion order.
#[derive(Clone, Default)]
pub struct Registry {
    members: Rc<RefCell<IndexMap<AnimatorId, Rc<dyn Member>>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("members", &self.ids())
            .finish()
    }
}

thread_local! {
    static SHARED: Registry = Registry::new();
}

impl Registry {
    /// Create an isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread's default registry, used by [`Animator::new`](crate::Animator::new).
    pub fn shared() -> Self {
        SHARED.with(Registry::clone)
    }

    pub(crate) fn insert(&self, member: Rc<dyn Member>) {
        self.members.borrow_mut().insert(member.id(), member);
    }

    pub(crate) fn remove(&self, id: AnimatorId) -> bool {
        self.members.borrow_mut().shift_remove(&id).is_some()
    }

    pub fn contains(&self, id: AnimatorId) -> bool {
        self.members.borrow().contains_key(&id)
    }

    pub fn ids(&self) -> Vec<AnimatorId> {
        self.members.borrow().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    /// Whether two handles refer to the same registry.
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Rc::ptr_eq(&self.members, &other.members)
    }

    /// Advance every member by `delta`.
    ///
    /// Members present when the call starts are ticked in insertion order;
    /// animators that join during the batch wait for the next one. A member
    /// that was stopped or paused earlier in the same batch is skipped. The
    /// first error aborts the batch and is returned.
    pub fn update(&self, delta: f64) -> Result<(), AnimatorError> {
        let snapshot: Vec<Rc<dyn Member>> = self.members.borrow().values().cloned().collect();
        trace!("registry batch: {} members, delta {delta}", snapshot.len());
        for member in snapshot {
            if !member.is_active() {
                continue;
            }
            if let Err(err) = member.tick(delta) {
                warn!(
                    "animator {:?} failed during batch update: {err} ({})",
                    member.id(),
                    err.category()
                );
                return Err(err);
            }
        }
        Ok(())
    }
}
