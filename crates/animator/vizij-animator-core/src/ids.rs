//! Identifiers and simple allocators for animators and event listeners.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AnimatorId(pub u64);

/// Handle returned by [`EventChannel::add`](crate::events::EventChannel::add).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ListenerToken(pub u64);

/// Monotonic allocator for AnimatorId and ListenerToken.
/// IDs are opaque externally; only uniqueness within an allocator matters.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_animator: u64,
    next_listener: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_animator(&mut self) -> AnimatorId {
        let id = AnimatorId(self.next_animator);
        self.next_animator = self.next_animator.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_listener(&mut self) -> ListenerToken {
        let id = ListenerToken(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        id
    }
}

thread_local! {
    // Animators are single-threaded handles, so a per-thread allocator keeps ids unique
    // across every registry an animator could join.
    static ANIMATOR_IDS: RefCell<IdAllocator> = RefCell::new(IdAllocator::new());
}

pub(crate) fn next_animator_id() -> AnimatorId {
    ANIMATOR_IDS.with(|ids| ids.borrow_mut().alloc_animator())
}
