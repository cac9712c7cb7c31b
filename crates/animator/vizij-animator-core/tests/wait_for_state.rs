use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use vizij_animator_core::{Animator, Registry, StateDef, StateQuery, StateTable};

type Def = StateDef<()>;

struct CountingWaker(AtomicUsize);

impl Wake for CountingWaker {
    fn wake(self: Arc<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn walker() -> Animator<()> {
    let table = StateTable::new(vec![
        ("initial", Def::new().duration(10.0).transition("walk_left")),
        ("walk_left", Def::new().duration(10.0).transition("walk_right")),
        ("walk_right", Def::new().duration(10.0).transition("stop")),
    ])
    .unwrap();
    Animator::builder(table, ())
        .registry(Registry::new())
        .build()
        .unwrap()
}

/// it should resolve "stop" at once for a never-started animator
#[test]
fn never_started_resolves_stop_immediately() {
    let a = walker();
    let waiter = a.wait_for_state(StateQuery::default());
    assert_eq!(waiter.resolved_state().as_deref(), Some("stop"));
}

/// it should resolve "stop" at once after the animator stopped
#[test]
fn stopped_resolves_immediately() {
    let a = walker();
    a.start_initial().unwrap();
    a.update(0.0).unwrap();
    assert!(!a.wait_for_state("stop").is_resolved());
    a.stop();
    assert!(a.wait_for_state("stop").is_resolved());
}

/// it should resolve when the matching state is entered
#[test]
fn resolves_on_state_change() {
    let a = walker();
    a.start_initial().unwrap();
    let waiter = a.wait_for_state("walk_right");
    a.update(0.0).unwrap();
    a.update(10.0).unwrap();
    assert!(!waiter.is_resolved());
    a.update(10.0).unwrap();
    assert_eq!(waiter.resolved_state().as_deref(), Some("walk_right"));

    let current = a.wait_for_state("walk_right");
    assert!(current.is_resolved(), "already in the state");
}

/// it should match glob patterns and predicates
#[test]
fn pattern_and_predicate_queries() {
    let a = walker();
    a.start_initial().unwrap();
    let any_walk = a.wait_for_state(StateQuery::pattern("walk_*"));
    let right = a.wait_for_state(StateQuery::predicate(|s| s.ends_with("right")));
    a.update(0.0).unwrap();
    a.update(10.0).unwrap();
    assert_eq!(any_walk.resolved_state().as_deref(), Some("walk_left"));
    assert!(!right.is_resolved());
    a.update(10.0).unwrap();
    assert_eq!(right.resolved_state().as_deref(), Some("walk_right"));
}

/// it should resolve "pause" while paused
#[test]
fn pause_is_a_waitable_state() {
    let a = walker();
    a.start_initial().unwrap();
    let paused = a.wait_for_state("pause");
    a.update(1.0).unwrap();
    a.pause();
    assert!(paused.is_resolved());
    assert!(a.wait_for_state("pause").is_resolved());
}

/// it should not resolve stop waiters on a silent stop
#[test]
fn silent_stop_leaves_waiters_pending() {
    let a = walker();
    a.start_initial().unwrap();
    a.update(0.0).unwrap();
    let waiter = a.wait_for_state("stop");
    a.stop_silently();
    assert!(!waiter.is_resolved());
    assert!(a.wait_for_state("stop").is_resolved());
}

/// it should work as a future and wake its task on resolution
#[test]
fn polls_as_a_future() {
    let a = walker();
    a.start_initial().unwrap();
    let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
    let waker = Waker::from(counter.clone());
    let mut cx = Context::from_waker(&waker);

    let mut waiter = a.wait_for_state("walk_left");
    assert!(Pin::new(&mut waiter).poll(&mut cx).is_pending());
    a.update(0.0).unwrap();
    assert!(Pin::new(&mut waiter).poll(&mut cx).is_pending());
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);

    a.update(10.0).unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    assert_eq!(
        Pin::new(&mut waiter).poll(&mut cx),
        Poll::Ready("walk_left".to_string())
    );
}

/// it should stop listening once cancelled
#[test]
fn cancel_detaches_the_waiter() {
    let a = walker();
    a.start_initial().unwrap();
    let waiter = a.wait_for_state("walk_left");
    waiter.cancel();
    a.update(0.0).unwrap();
    a.update(10.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "walk_left");

    let dropped = a.wait_for_state("walk_right");
    drop(dropped);
    a.update(10.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "walk_right");
}
