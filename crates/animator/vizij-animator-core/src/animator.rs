//! Animator: per-entity phase state machine driven by `update(delta)` ticks.
//!
//! Each state runs three phases on the animator's clock, anchored at
//! `start_time`: `delay_before` (nothing happens), the active `duration`
//! (the animation callback sees progress in [0,1]) and `delay_after` (hold,
//! transition not yet evaluated). Once all three are exhausted the state's
//! transition picks what comes next.
//!
//! Callbacks run synchronously inside `update` and receive the animator
//! handle. They may stop, pause, resume or restart this or any other animator
//! and may retune the shared [`StateConfig`]s; every step of the resolution
//! loop re-checks the run flags after a callback returns. Calling `update` on
//! the same animator from one of its callbacks is rejected with
//! [`AnimatorError::ReentrantUpdate`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::config::AnimatorConfig;
use crate::easing::{default_easings, Easing, EasingRegistry};
use crate::error::AnimatorError;
use crate::events::{EventChannel, Listen};
use crate::ids::{next_animator_id, AnimatorId, ListenerToken};
use crate::registry::{Member, Registry};
use crate::state::{Next, StateConfig, StateTable, INITIAL, PAUSE, STOP};
use crate::wait::{StateQuery, StateWaiter};

struct Inner<P> {
    id: AnimatorId,
    table: Rc<StateTable<P>>,
    parameters: P,
    registry: Registry,
    easings: Rc<EasingRegistry>,
    events: Rc<EventChannel<String>>,
    max_steps: usize,

    current: RefCell<Option<String>>,
    start_time: Cell<f64>,
    time: Cell<f64>,
    delta: Cell<f64>,
    progress: Cell<f64>,
    time_scale: Cell<f64>,

    started: Cell<bool>,
    running: Cell<bool>,
    paused: Cell<bool>,
    animating: Cell<bool>,
    // `animating` as it was when an external pause() cleared it.
    resume_animating: Cell<bool>,
    updating: Cell<bool>,
}

/// Handle to one animator. Clones share the same instance.
pub struct Animator<P> {
    inner: Rc<Inner<P>>,
}

impl<P> Clone for Animator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P> fmt::Debug for Animator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        f.debug_struct("Animator")
            .field("id", &inner.id)
            .field("current", &*inner.current.borrow())
            .field("progress", &inner.progress.get())
            .field("time", &inner.time.get())
            .field("started", &inner.started.get())
            .field("running", &inner.running.get())
            .field("paused", &inner.paused.get())
            .field("animating", &inner.animating.get())
            .finish()
    }
}

/// Resets the reentrancy flag when `update` returns, including on error.
struct UpdateGuard<'a>(&'a Cell<bool>);

impl<'a> UpdateGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Explicit wiring for an [`Animator`].
pub struct AnimatorBuilder<P> {
    table: Rc<StateTable<P>>,
    parameters: P,
    registry: Option<Registry>,
    config: AnimatorConfig,
    easings: Option<Rc<EasingRegistry>>,
}

impl<P: 'static> AnimatorBuilder<P> {
    /// Registry the animator joins while active. Defaults to [`Registry::shared`].
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: AnimatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Easing names available to [`Animator::interpolate`]. Defaults to the built-ins.
    pub fn easings(mut self, easings: Rc<EasingRegistry>) -> Self {
        self.easings = Some(easings);
        self
    }

    pub fn build(self) -> Result<Animator<P>, AnimatorError> {
        self.config.validate()?;
        Ok(Animator::assemble(
            self.table,
            self.parameters,
            self.registry.unwrap_or_else(Registry::shared),
            &self.config,
            self.easings.unwrap_or_else(default_easings),
        ))
    }
}

impl<P: 'static> Animator<P> {
    /// Create an inert animator bound to `table` and the thread's shared registry.
    pub fn new(table: impl Into<Rc<StateTable<P>>>, parameters: P) -> Self {
        Self::assemble(
            table.into(),
            parameters,
            Registry::shared(),
            &AnimatorConfig::default(),
            default_easings(),
        )
    }

    pub fn builder(table: impl Into<Rc<StateTable<P>>>, parameters: P) -> AnimatorBuilder<P> {
        AnimatorBuilder {
            table: table.into(),
            parameters,
            registry: None,
            config: AnimatorConfig::default(),
            easings: None,
        }
    }

    fn assemble(
        table: Rc<StateTable<P>>,
        parameters: P,
        registry: Registry,
        config: &AnimatorConfig,
        easings: Rc<EasingRegistry>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: next_animator_id(),
                table,
                parameters,
                registry,
                easings,
                events: Rc::new(EventChannel::new()),
                max_steps: config.max_steps_per_tick,
                current: RefCell::new(None),
                start_time: Cell::new(0.0),
                time: Cell::new(0.0),
                delta: Cell::new(0.0),
                progress: Cell::new(0.0),
                time_scale: Cell::new(config.time_scale),
                started: Cell::new(false),
                running: Cell::new(false),
                paused: Cell::new(false),
                animating: Cell::new(false),
                resume_animating: Cell::new(false),
                updating: Cell::new(false),
            }),
        }
    }

    fn member(&self) -> Rc<dyn Member> {
        Rc::new(self.clone())
    }

    // ---- lifecycle -------------------------------------------------------

    /// Enter `name` on the next `update`. No-op while already running and not paused.
    pub fn start(&self, name: &str) -> Result<&Self, AnimatorError> {
        let inner = &self.inner;
        if inner.running.get() && !inner.paused.get() {
            return Ok(self);
        }
        inner.table.require(name)?;
        *inner.current.borrow_mut() = Some(name.to_string());
        inner.paused.set(false);
        inner.started.set(true);
        inner.running.set(false);
        inner.animating.set(true);
        inner.registry.insert(self.member());
        debug!("animator {:?} started in '{name}'", inner.id);
        Ok(self)
    }

    /// `start("initial")`.
    pub fn start_initial(&self) -> Result<&Self, AnimatorError> {
        self.start(INITIAL)
    }

    /// Clear the current state, leave the registry and emit `"stop"`.
    pub fn stop(&self) -> &Self {
        self.halt(true)
    }

    /// Like [`stop`](Self::stop) without the `"stop"` notification.
    pub fn stop_silently(&self) -> &Self {
        self.halt(false)
    }

    fn halt(&self, notify: bool) -> &Self {
        let inner = &self.inner;
        if !inner.started.get() {
            return self;
        }
        inner.started.set(false);
        inner.running.set(false);
        inner.paused.set(false);
        inner.animating.set(false);
        inner.resume_animating.set(false);
        let last = inner.current.borrow_mut().take();
        inner.registry.remove(inner.id);
        debug!("animator {:?} stopped (was {:?})", inner.id, last);
        if notify {
            self.notify(STOP);
        }
        self
    }

    /// Leave the registry without losing phase timing; emits `"pause"`.
    pub fn pause(&self) -> &Self {
        let inner = &self.inner;
        if !inner.started.get() || inner.paused.get() {
            return self;
        }
        inner.paused.set(true);
        inner.registry.remove(inner.id);
        inner.resume_animating.set(inner.animating.get());
        inner.animating.set(false);
        debug!("animator {:?} paused", inner.id);
        self.notify(PAUSE);
        self
    }

    /// Rejoin the registry; the next `update` continues the interrupted phase.
    pub fn resume(&self) -> &Self {
        let inner = &self.inner;
        if !inner.paused.get() {
            return self;
        }
        inner.paused.set(false);
        inner.animating.set(inner.resume_animating.get());
        inner.registry.insert(self.member());
        debug!("animator {:?} resumed", inner.id);
        self
    }

    /// Pause requested by a transition or interrupt: the phase counts as cut
    /// short, so resuming resolves the transition instead of animating on.
    fn pause_from_rule(&self) {
        self.inner.animating.set(false);
        self.pause();
    }

    // ---- ticking ---------------------------------------------------------

    /// Advance the clock by `delta * time_scale` and run the state machine.
    ///
    /// A paused animator ignores the tick so that `resume` picks up exactly
    /// where it left off. Negative or non-finite deltas are rejected before the
    /// clock moves.
    pub fn update(&self, delta: f64) -> Result<(), AnimatorError> {
        let inner = &self.inner;
        if !inner.started.get() {
            return Err(AnimatorError::NotStarted);
        }
        if !delta.is_finite() || delta < 0.0 {
            return Err(AnimatorError::invalid(format!(
                "update delta must be finite and non-negative, got {delta}"
            )));
        }
        if inner.paused.get() {
            return Ok(());
        }
        if inner.updating.get() {
            return Err(AnimatorError::ReentrantUpdate);
        }
        let _guard = UpdateGuard::enter(&inner.updating);

        let scaled = delta * inner.time_scale.get();
        let before = inner.time.get();
        inner.delta.set(scaled);
        inner.time.set(before + scaled);

        if !inner.running.get() {
            // The entering tick's delta already counts as time spent in the state.
            inner.running.set(true);
            inner.start_time.set(before);
            inner.progress.set(0.0);
            inner.animating.set(true);
            let name = self.current_state()?;
            let cfg = inner.table.require(&name)?;
            debug!("animator {:?} entering '{name}'", inner.id);
            cfg.run_setup(self);
            if !self.is_live() {
                return Ok(());
            }
            self.notify(&name);
            if !self.is_live() {
                return Ok(());
            }
        }

        self.resolve()
    }

    /// Started, not paused, and not restarted by a callback mid-tick.
    fn is_live(&self) -> bool {
        let inner = &self.inner;
        inner.started.get() && !inner.paused.get() && inner.running.get()
    }

    fn resolve(&self) -> Result<(), AnimatorError> {
        let inner = &self.inner;
        let mut steps = 0usize;
        loop {
            let name = self.current_state()?;
            steps += 1;
            if steps > inner.max_steps {
                warn!(
                    "animator {:?}: more than {} steps in one tick (state '{name}')",
                    inner.id, inner.max_steps
                );
                return Err(AnimatorError::IterationLimitExceeded {
                    state: name,
                    limit: inner.max_steps,
                });
            }
            let cfg = inner.table.require(&name)?;

            let time = inner.time.get();
            let elapsed = time - inner.start_time.get();
            let delay_before = cfg.delay_before();
            if elapsed < delay_before {
                return Ok(());
            }
            let duration = cfg.duration();
            let progress = if duration > 0.0 {
                (elapsed - delay_before) / duration
            } else {
                f64::INFINITY
            };
            trace!(
                "animator {:?} '{name}': elapsed {elapsed}, progress {progress}",
                inner.id
            );

            if progress >= 1.0 || !inner.animating.get() {
                if !self.final_frame(cfg) {
                    return Ok(());
                }
                if elapsed < delay_before + duration + cfg.delay_after() {
                    return Ok(());
                }
                let next = cfg.resolve_transition(self);
                if !self.is_live() {
                    return Ok(());
                }
                match next {
                    Next::Stop => {
                        self.stop();
                        return Ok(());
                    }
                    Next::Pause => {
                        self.pause_from_rule();
                        return Ok(());
                    }
                    Next::State(target) => {
                        let anchor = if inner.animating.get() && cfg.overflow() {
                            inner.start_time.get() + cfg.span()
                        } else {
                            time
                        };
                        if !self.enter(&name, &target, anchor)? {
                            return Ok(());
                        }
                        continue;
                    }
                    Next::Stay => {
                        if cfg.looped() {
                            if duration > 0.0 {
                                inner.progress.set(0.0);
                                inner
                                    .start_time
                                    .set(inner.start_time.get() + duration + cfg.delay_after());
                                continue;
                            }
                            inner.start_time.set(time);
                            return Ok(());
                        }
                        inner.animating.set(false);
                        return Ok(());
                    }
                }
            }

            inner.progress.set(progress);
            cfg.run_animation(self, progress);
            if !self.is_live() {
                return Ok(());
            }
            let next = match cfg.resolve_interrupt(self) {
                None | Some(Next::Stay) => return Ok(()),
                Some(next) => next,
            };
            if !self.is_live() {
                return Ok(());
            }
            match next {
                Next::Pause => {
                    self.pause_from_rule();
                    return Ok(());
                }
                Next::Stop => {
                    if self.final_frame(cfg) {
                        self.stop();
                    }
                    return Ok(());
                }
                Next::State(target) => {
                    // Cut short: never carries overflow.
                    if !self.final_frame(cfg) || !self.enter(&name, &target, time)? {
                        return Ok(());
                    }
                }
                Next::Stay => return Ok(()),
            }
        }
    }

    /// Report progress=1 once per phase. Returns false if the callback tore the
    /// animator down.
    fn final_frame(&self, cfg: &StateConfig<P>) -> bool {
        if self.inner.progress.get() != 1.0 {
            self.inner.progress.set(1.0);
            cfg.run_animation(self, 1.0);
        }
        self.is_live()
    }

    /// Switch to `target` with its clock anchored at `anchor`. Returns false if
    /// setup or a state-change observer tore the animator down.
    fn enter(&self, from: &str, target: &str, anchor: f64) -> Result<bool, AnimatorError> {
        let inner = &self.inner;
        let cfg = inner.table.require(target)?;
        inner.progress.set(0.0);
        inner.start_time.set(anchor);
        *inner.current.borrow_mut() = Some(target.to_string());
        inner.animating.set(true);
        debug!("animator {:?}: '{from}' -> '{target}'", inner.id);
        cfg.run_setup(self);
        if !self.is_live() {
            return Ok(false);
        }
        self.notify(target);
        Ok(self.is_live())
    }

    fn notify(&self, state: &str) {
        self.inner.events.emit(&state.to_string());
    }

    // ---- helpers ---------------------------------------------------------

    /// `from + (to - from) * easing(progress)`.
    pub fn interpolate(
        &self,
        from: f64,
        to: f64,
        easing: impl Into<Easing>,
    ) -> Result<f64, AnimatorError> {
        let ease = easing.into().resolve(&self.inner.easings)?;
        Ok(from + (to - from) * ease(self.progress()))
    }

    /// Value of the last entry whose threshold is at or below the current
    /// progress, or the first entry if none is. `None` only for an empty table.
    pub fn steps<'a, T>(&self, table: &'a [(f64, T)]) -> Option<&'a T> {
        let progress = self.progress();
        table
            .iter()
            .rev()
            .find(|(threshold, _)| *threshold <= progress)
            .or_else(|| table.first())
            .map(|(_, value)| value)
    }

    // ---- notifications ---------------------------------------------------

    /// Subscribe to state changes. Handlers receive the entered state name,
    /// `"stop"` or `"pause"`.
    pub fn on_state_change<F>(&self, handler: F) -> ListenerToken
    where
        F: Fn(&str) -> Listen + 'static,
    {
        self.inner.events.add(move |state: &String| handler(state.as_str()))
    }

    pub fn off_state_change(&self, token: ListenerToken) -> bool {
        self.inner.events.remove(token)
    }

    /// Resolve once the animator is in a state matching `query`. Already
    /// satisfied queries resolve immediately, without waiting for a tick.
    pub fn wait_for_state(&self, query: impl Into<StateQuery>) -> StateWaiter {
        StateWaiter::new(&self.status(), query.into(), &self.inner.events)
    }

    // ---- accessors -------------------------------------------------------

    pub fn id(&self) -> AnimatorId {
        self.inner.id
    }

    pub fn parameters(&self) -> &P {
        &self.inner.parameters
    }

    pub fn states(&self) -> &Rc<StateTable<P>> {
        &self.inner.table
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn progress(&self) -> f64 {
        self.inner.progress.get()
    }

    /// Cumulative scaled clock.
    pub fn time(&self) -> f64 {
        self.inner.time.get()
    }

    /// Scaled delta of the last tick.
    pub fn delta(&self) -> f64 {
        self.inner.delta.get()
    }

    /// Clock value the current phase sequence is anchored at.
    pub fn start_time(&self) -> f64 {
        self.inner.start_time.get()
    }

    pub fn time_scale(&self) -> f64 {
        self.inner.time_scale.get()
    }

    pub fn set_time_scale(&self, scale: f64) -> Result<(), AnimatorError> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(AnimatorError::invalid(format!(
                "time scale must be finite and non-negative, got {scale}"
            )));
        }
        self.inner.time_scale.set(scale);
        Ok(())
    }

    pub fn started(&self) -> bool {
        self.inner.started.get()
    }

    pub fn running(&self) -> bool {
        self.inner.running.get()
    }

    pub fn paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// False once the active phase is exhausted and awaiting its transition.
    pub fn animating(&self) -> bool {
        self.inner.animating.get()
    }

    pub fn current_state(&self) -> Result<String, AnimatorError> {
        self.inner
            .current
            .borrow()
            .clone()
            .ok_or(AnimatorError::NotStarted)
    }

    /// The live config of the current state.
    pub fn state_config(&self) -> Result<&StateConfig<P>, AnimatorError> {
        let name = self.current_state()?;
        self.inner.table.require(&name)
    }

    /// `"stop"` when not started, `"pause"` when paused, otherwise the current state.
    pub fn status(&self) -> String {
        let inner = &self.inner;
        if !inner.started.get() {
            return STOP.to_string();
        }
        if inner.paused.get() {
            return PAUSE.to_string();
        }
        inner
            .current
            .borrow()
            .clone()
            .unwrap_or_else(|| STOP.to_string())
    }
}

impl<P: 'static> Member for Animator<P> {
    fn id(&self) -> AnimatorId {
        self.inner.id
    }

    fn is_active(&self) -> bool {
        self.inner.started.get() && !self.inner.paused.get()
    }

    fn tick(&self, delta: f64) -> Result<(), AnimatorError> {
        self.update(delta)
    }
}
