use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vizij_animator_core::{
    Animator, AnimatorConfig, AnimatorError, Next, Registry, StateDef, StateTable,
};

type Def = StateDef<()>;
type Log = Rc<RefCell<Vec<(String, f64)>>>;

fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn recorder(log: &Log, name: &'static str) -> impl Fn(&Animator<()>, f64) + 'static {
    let log = log.clone();
    move |_, p| log.borrow_mut().push((name.to_string(), p))
}

fn progresses(log: &Log, name: &str) -> Vec<f64> {
    log.borrow()
        .iter()
        .filter(|(n, _)| n == name)
        .map(|(_, p)| *p)
        .collect()
}

fn animator(defs: Vec<(&str, Def)>) -> Animator<()> {
    Animator::builder(StateTable::new(defs).unwrap(), ())
        .registry(Registry::new())
        .build()
        .unwrap()
}

fn overflow_pair(overflow: bool, log: &Log) -> Animator<()> {
    animator(vec![
        (
            "A",
            Def::new()
                .duration(20.0)
                .overflow(overflow)
                .transition("B")
                .on_animation(recorder(log, "A")),
        ),
        (
            "B",
            Def::new().duration(10.0).on_animation(recorder(log, "B")),
        ),
    ])
}

/// it should carry the overshoot of an exhausted phase into the next one
#[test]
fn overflow_carries_overshoot() {
    let log: Log = Rc::default();
    let a = overflow_pair(true, &log);
    a.start("A").unwrap();
    a.update(0.0).unwrap();
    a.update(25.0).unwrap();

    assert_eq!(a.current_state().unwrap(), "B");
    assert_eq!(a.start_time(), 20.0);
    assert!(approx(a.progress(), 0.5, 1e-9));
    assert_eq!(progresses(&log, "A"), vec![0.0, 1.0]);

    a.update(2.0).unwrap();
    assert!(approx(a.progress(), 0.7, 1e-9));
}

/// it should anchor the next phase at the current clock without overflow
#[test]
fn no_overflow_reanchors_at_clock() {
    let log: Log = Rc::default();
    let a = overflow_pair(false, &log);
    a.start("A").unwrap();
    a.update(0.0).unwrap();
    a.update(25.0).unwrap();

    assert_eq!(a.current_state().unwrap(), "B");
    assert_eq!(a.start_time(), 25.0);
    assert_eq!(a.progress(), 0.0);

    a.update(2.0).unwrap();
    assert!(approx(a.progress(), 0.2, 1e-9));
}

/// it should wait out delay_after before asking the transition
#[test]
fn delay_after_holds_the_transition() {
    let a = animator(vec![
        ("A", Def::new().duration(10.0).delay_after(5.0).transition("B")),
        ("B", Def::new().duration(10.0)),
    ]);
    a.start("A").unwrap();
    a.update(12.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "A");
    assert_eq!(a.progress(), 1.0);

    a.update(4.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "B");
    assert_eq!(a.start_time(), 15.0);
    assert!(approx(a.progress(), 0.1, 1e-9));
}

/// it should run setup once across loop restarts
#[test]
fn looping_state_skips_setup_on_restart() {
    let log: Log = Rc::default();
    let setups = Rc::new(Cell::new(0));
    let counter = setups.clone();
    let a = animator(vec![(
        "initial",
        Def::new()
            .duration(10.0)
            .looped(true)
            .on_setup(move |_| counter.set(counter.get() + 1))
            .on_animation(recorder(&log, "initial")),
    )]);
    a.start_initial().unwrap();
    a.update(0.0).unwrap();
    a.update(25.0).unwrap();

    assert_eq!(progresses(&log, "initial"), vec![0.0, 1.0, 1.0, 0.5]);
    assert_eq!(a.start_time(), 20.0);

    for _ in 0..20 {
        a.update(3.0).unwrap();
    }
    assert_eq!(setups.get(), 1);
    assert!(a.animating());
    assert_eq!(a.current_state().unwrap(), "initial");
}

/// it should keep a zero-duration loop from spinning within one tick
#[test]
fn zero_duration_loop_reanchors() {
    let log: Log = Rc::default();
    let a = animator(vec![(
        "initial",
        Def::new().looped(true).on_animation(recorder(&log, "initial")),
    )]);
    a.start_initial().unwrap();
    a.update(5.0).unwrap();
    a.update(5.0).unwrap();
    assert_eq!(a.start_time(), 10.0);
    assert_eq!(progresses(&log, "initial"), vec![1.0]);
}

/// it should force a final frame and skip overflow when an interrupt fires
#[test]
fn interrupt_forces_final_frame_without_carry() {
    let log: Log = Rc::default();
    let a = animator(vec![
        (
            "A",
            Def::new()
                .duration(100.0)
                .interrupt_with(|a| {
                    if a.progress() >= 0.3 {
                        Next::state("B")
                    } else {
                        Next::Stay
                    }
                })
                .on_animation(recorder(&log, "A")),
        ),
        (
            "B",
            Def::new().duration(50.0).on_animation(recorder(&log, "B")),
        ),
    ]);
    a.start("A").unwrap();
    a.update(0.0).unwrap();
    a.update(40.0).unwrap();

    assert_eq!(progresses(&log, "A"), vec![0.0, 0.4, 1.0]);
    assert_eq!(progresses(&log, "B"), vec![0.0]);
    assert_eq!(a.current_state().unwrap(), "B");
    assert_eq!(a.start_time(), 40.0);
}

/// it should stop from an interrupt after reporting progress 1
#[test]
fn interrupt_stop_reports_final_frame() {
    let log: Log = Rc::default();
    let a = animator(vec![(
        "initial",
        Def::new()
            .duration(100.0)
            .interrupt("stop")
            .on_animation(recorder(&log, "initial")),
    )]);
    a.start_initial().unwrap();
    a.update(10.0).unwrap();
    assert_eq!(progresses(&log, "initial"), vec![0.1, 1.0]);
    assert!(!a.started());
}

/// it should re-ask a rule every tick until it picks a state
#[test]
fn transition_rule_reads_parameters() {
    let table = StateTable::new(vec![
        (
            "A",
            StateDef::new()
                .duration(10.0)
                .transition_with(|a: &Animator<Rc<Cell<bool>>>| {
                    if a.parameters().get() {
                        Next::state("B")
                    } else {
                        Next::Stay
                    }
                }),
        ),
        ("B", StateDef::new().duration(10.0)),
    ])
    .unwrap();
    let go = Rc::new(Cell::new(false));
    let a = Animator::builder(table, go.clone())
        .registry(Registry::new())
        .build()
        .unwrap();
    a.start("A").unwrap();
    a.update(15.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "A");
    assert!(!a.animating());

    a.update(1.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "A");

    go.set(true);
    a.update(1.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "B");
    assert_eq!(a.start_time(), 17.0);
}

/// it should trip the step cap on a cycle of zero-duration states
#[test]
fn zero_duration_cycle_hits_iteration_limit() {
    let table = StateTable::new(vec![
        ("initial", Def::new().transition("ping")),
        ("ping", Def::new().transition("pong")),
        ("pong", Def::new().transition("ping")),
    ])
    .unwrap();
    let a = Animator::builder(table, ())
        .registry(Registry::new())
        .config(AnimatorConfig {
            max_steps_per_tick: 50,
            ..AnimatorConfig::default()
        })
        .build()
        .unwrap();
    a.start_initial().unwrap();
    let err = a.update(0.0).unwrap_err();
    assert!(matches!(
        err,
        AnimatorError::IterationLimitExceeded { limit: 50, .. }
    ));
    assert_eq!(err.category(), "runaway");
}

/// it should surface an unknown transition target as an error
#[test]
fn unknown_target_is_fatal() {
    let a = animator(vec![("initial", Def::new().transition("nowhere"))]);
    a.start_initial().unwrap();
    assert_eq!(
        a.update(0.0),
        Err(AnimatorError::StateNotFound {
            name: "nowhere".into()
        })
    );
    assert!(matches!(
        animator(vec![("A", Def::new())]).start("B"),
        Err(AnimatorError::StateNotFound { .. })
    ));
}

/// it should honor config changes made from inside a callback
#[test]
fn callbacks_reconfigure_live_states() {
    let a = animator(vec![
        (
            "A",
            Def::new().duration(10.0).on_animation(|a, p| {
                if p >= 1.0 {
                    a.state_config().unwrap().set_transition("B");
                }
            }),
        ),
        ("B", Def::new().duration(10.0)),
    ]);
    a.start("A").unwrap();
    a.update(0.0).unwrap();
    a.update(10.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "B");

    let b = a.states().get("B").unwrap();
    a.update(5.0).unwrap();
    assert!(approx(a.progress(), 0.5, 1e-9));
    b.set_duration(20.0).unwrap();
    a.update(5.0).unwrap();
    assert!(approx(a.progress(), 0.5, 1e-9));
    assert!(b.set_delay_after(-1.0).is_err());
}

/// it should pause when a transition names "pause" and resolve again on resume
#[test]
fn transition_to_pause_then_resume() {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let a = animator(vec![
        (
            "A",
            Def::new().duration(10.0).transition_with(move |_| {
                seen.set(seen.get() + 1);
                if seen.get() == 1 {
                    Next::Pause
                } else {
                    Next::state("B")
                }
            }),
        ),
        ("B", Def::new().duration(10.0)),
    ]);
    a.start("A").unwrap();
    a.update(10.0).unwrap();
    assert!(a.paused());
    assert!(!a.animating());
    assert_eq!(a.status(), "pause");
    assert!(!a.registry().contains(a.id()));

    a.resume();
    assert!(a.registry().contains(a.id()));
    a.update(0.0).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(a.current_state().unwrap(), "B");
}

/// it should treat reserved names built with Next::state as stop and pause
#[test]
fn rule_reserved_names_map_to_outcomes() {
    let a = animator(vec![(
        "initial",
        Def::new()
            .duration(1.0)
            .transition_with(|_| Next::state("stop")),
    )]);
    a.start_initial().unwrap();
    assert_eq!(a.update(2.0), Ok(()));
    assert!(!a.started());

    let b = animator(vec![(
        "initial",
        Def::new()
            .duration(1.0)
            .transition_with(|_| Next::state(String::from("pause"))),
    )]);
    b.start_initial().unwrap();
    assert_eq!(b.update(2.0), Ok(()));
    assert!(b.paused());
    assert_eq!(b.status(), "pause");
}

/// it should pause from an interrupt without a final frame and finish the phase on resume
#[test]
fn interrupt_pause_then_resume_finishes_phase() {
    let log: Log = Rc::default();
    let fired = Rc::new(Cell::new(false));
    let once = fired.clone();
    let a = animator(vec![
        (
            "A",
            Def::new()
                .duration(10.0)
                .transition("B")
                .interrupt_with(move |a| {
                    if a.progress() >= 0.4 && !once.replace(true) {
                        Next::Pause
                    } else {
                        Next::Stay
                    }
                })
                .on_animation(recorder(&log, "A")),
        ),
        ("B", Def::new().duration(10.0)),
    ]);
    a.start("A").unwrap();
    a.update(4.0).unwrap();

    assert!(fired.get());
    assert!(a.paused());
    assert!(!a.animating());
    assert!(!a.registry().contains(a.id()));
    assert_eq!(progresses(&log, "A"), vec![0.4]);

    a.resume();
    assert!(a.registry().contains(a.id()));
    a.update(1.0).unwrap();
    assert_eq!(progresses(&log, "A"), vec![0.4, 1.0]);
    assert_eq!(a.current_state().unwrap(), "A");
    assert_eq!(a.time(), 5.0);

    a.update(3.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "A");
    a.update(2.0).unwrap();
    assert_eq!(a.current_state().unwrap(), "B");
    assert_eq!(a.start_time(), 10.0);
    assert_eq!(progresses(&log, "A"), vec![0.4, 1.0]);
}

/// it should repeat only the active and hold phases when a delayed state loops
#[test]
fn loop_restart_skips_delay_before() {
    let log: Log = Rc::default();
    let setups = Rc::new(Cell::new(0));
    let counter = setups.clone();
    let a = animator(vec![(
        "initial",
        Def::new()
            .delay_before(5.0)
            .duration(10.0)
            .delay_after(5.0)
            .looped(true)
            .on_setup(move |_| counter.set(counter.get() + 1))
            .on_animation(recorder(&log, "initial")),
    )]);
    a.start_initial().unwrap();
    for _ in 0..4 {
        a.update(5.0).unwrap();
    }
    assert_eq!(a.start_time(), 15.0);

    for _ in 0..3 {
        a.update(5.0).unwrap();
    }
    assert_eq!(a.start_time(), 30.0);
    assert_eq!(
        progresses(&log, "initial"),
        vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0]
    );
    assert_eq!(setups.get(), 1);
}
