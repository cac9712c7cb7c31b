//! State definitions and the normalized state table.
//!
//! Callers describe states with [`StateDef`], which leaves every field
//! optional. [`StateTable::new`] fills the defaults and produces one
//! [`StateConfig`] per name. `StateConfig` fields stay mutable after
//! construction: callbacks are allowed to retune upcoming phases (durations,
//! delays, flags, rules) through a shared reference, and the animator reads
//! every field live at the point it needs it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::animator::Animator;
use crate::error::AnimatorError;

/// Reserved transition target that stops the animator.
pub const STOP: &str = "stop";
/// Reserved transition target that pauses the animator.
pub const PAUSE: &str = "pause";
/// State entered by [`Animator::start_initial`].
pub const INITIAL: &str = "initial";

/// Outcome of a transition or interrupt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Next {
    /// Enter the named state.
    State(String),
    Stop,
    Pause,
    /// No transition this tick.
    Stay,
}

impl Next {
    /// Target by name. `"stop"` and `"pause"` map to the reserved outcomes.
    pub fn state(name: impl Into<String>) -> Self {
        Next::from(name.into())
    }
}

impl From<&str> for Next {
    fn from(name: &str) -> Self {
        match name {
            STOP => Next::Stop,
            PAUSE => Next::Pause,
            other => Next::State(other.to_string()),
        }
    }
}

impl From<String> for Next {
    fn from(name: String) -> Self {
        match name.as_str() {
            STOP => Next::Stop,
            PAUSE => Next::Pause,
            _ => Next::State(name),
        }
    }
}

impl<T: Into<Next>> From<Option<T>> for Next {
    fn from(value: Option<T>) -> Self {
        value.map_or(Next::Stay, Into::into)
    }
}

pub type Rule<P> = Rc<dyn Fn(&Animator<P>) -> Next>;
pub type SetupFn<P> = Rc<dyn Fn(&Animator<P>)>;
pub type AnimationFn<P> = Rc<dyn Fn(&Animator<P>, f64)>;

/// Where a state goes next: a fixed outcome or a rule evaluated per tick.
pub enum Transition<P> {
    Fixed(Next),
    Rule(Rule<P>),
}

impl<P> Transition<P> {
    pub fn rule<F>(f: F) -> Self
    where
        F: Fn(&Animator<P>) -> Next + 'static,
    {
        Transition::Rule(Rc::new(f))
    }

    pub(crate) fn evaluate(&self, animator: &Animator<P>) -> Next {
        match self {
            Transition::Fixed(next) => next.clone(),
            Transition::Rule(rule) => rule(animator),
        }
    }
}

impl<P> Clone for Transition<P> {
    fn clone(&self) -> Self {
        match self {
            Transition::Fixed(next) => Transition::Fixed(next.clone()),
            Transition::Rule(rule) => Transition::Rule(rule.clone()),
        }
    }
}

impl<P> fmt::Debug for Transition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Fixed(next) => f.debug_tuple("Fixed").field(next).finish(),
            Transition::Rule(_) => f.write_str("Rule(..)"),
        }
    }
}

impl<P> Default for Transition<P> {
    fn default() -> Self {
        Transition::Fixed(Next::Stay)
    }
}

impl<P> From<Next> for Transition<P> {
    fn from(next: Next) -> Self {
        Transition::Fixed(next)
    }
}

impl<P> From<&str> for Transition<P> {
    fn from(name: &str) -> Self {
        Transition::Fixed(Next::from(name))
    }
}

impl<P> From<String> for Transition<P> {
    fn from(name: String) -> Self {
        Transition::Fixed(Next::from(name))
    }
}

/// Caller-facing state description. Unset fields take the table defaults:
/// zero duration and delays, no loop, overflow on, no transition, no-op animation.
pub struct StateDef<P> {
    pub duration: Option<f64>,
    pub delay_before: Option<f64>,
    pub delay_after: Option<f64>,
    pub looped: Option<bool>,
    pub overflow: Option<bool>,
    pub transition: Option<Transition<P>>,
    pub interrupt: Option<Transition<P>>,
    pub animation: Option<AnimationFn<P>>,
    pub setup: Option<SetupFn<P>>,
}

impl<P> Default for StateDef<P> {
    fn default() -> Self {
        Self {
            duration: None,
            delay_before: None,
            delay_after: None,
            looped: None,
            overflow: None,
            transition: None,
            interrupt: None,
            animation: None,
            setup: None,
        }
    }
}

impl<P> fmt::Debug for StateDef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDef")
            .field("duration", &self.duration)
            .field("delay_before", &self.delay_before)
            .field("delay_after", &self.delay_after)
            .field("looped", &self.looped)
            .field("overflow", &self.overflow)
            .field("transition", &self.transition)
            .field("interrupt", &self.interrupt)
            .field("animation", &self.animation.is_some())
            .field("setup", &self.setup.is_some())
            .finish()
    }
}

impl<P> StateDef<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn delay_before(mut self, delay: f64) -> Self {
        self.delay_before = Some(delay);
        self
    }

    pub fn delay_after(mut self, delay: f64) -> Self {
        self.delay_after = Some(delay);
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = Some(looped);
        self
    }

    pub fn overflow(mut self, overflow: bool) -> Self {
        self.overflow = Some(overflow);
        self
    }

    /// Fixed transition target; `"stop"` and `"pause"` map to the reserved outcomes.
    pub fn transition(mut self, next: impl Into<Transition<P>>) -> Self {
        self.transition = Some(next.into());
        self
    }

    pub fn transition_with<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Animator<P>) -> Next + 'static,
    {
        self.transition = Some(Transition::rule(rule));
        self
    }

    pub fn interrupt(mut self, next: impl Into<Transition<P>>) -> Self {
        self.interrupt = Some(next.into());
        self
    }

    pub fn interrupt_with<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Animator<P>) -> Next + 'static,
    {
        self.interrupt = Some(Transition::rule(rule));
        self
    }

    pub fn on_animation<F>(mut self, f: F) -> Self
    where
        F: Fn(&Animator<P>, f64) + 'static,
    {
        self.animation = Some(Rc::new(f));
        self
    }

    pub fn on_setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&Animator<P>) + 'static,
    {
        self.setup = Some(Rc::new(f));
        self
    }
}

fn check_timing(state: &str, field: &str, value: f64) -> Result<f64, AnimatorError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AnimatorError::invalid(format!(
            "state '{state}': {field} must be finite and non-negative, got {value}"
        )))
    }
}

/// Fully populated state. Shared by every animator bound to the same table.
pub struct StateConfig<P> {
    name: String,
    duration: Cell<f64>,
    delay_before: Cell<f64>,
    delay_after: Cell<f64>,
    looped: Cell<bool>,
    overflow: Cell<bool>,
    transition: RefCell<Transition<P>>,
    interrupt: RefCell<Option<Transition<P>>>,
    animation: RefCell<Option<AnimationFn<P>>>,
    setup: RefCell<Option<SetupFn<P>>>,
}

impl<P> fmt::Debug for StateConfig<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateConfig")
            .field("name", &self.name)
            .field("duration", &self.duration.get())
            .field("delay_before", &self.delay_before.get())
            .field("delay_after", &self.delay_after.get())
            .field("looped", &self.looped.get())
            .field("overflow", &self.overflow.get())
            .field("transition", &*self.transition.borrow())
            .field("interrupt", &*self.interrupt.borrow())
            .finish()
    }
}

impl<P> StateConfig<P> {
    fn normalize(name: String, def: StateDef<P>) -> Result<Self, AnimatorError> {
        let duration = check_timing(&name, "duration", def.duration.unwrap_or(0.0))?;
        let delay_before = check_timing(&name, "delayBefore", def.delay_before.unwrap_or(0.0))?;
        let delay_after = check_timing(&name, "delayAfter", def.delay_after.unwrap_or(0.0))?;
        Ok(Self {
            duration: Cell::new(duration),
            delay_before: Cell::new(delay_before),
            delay_after: Cell::new(delay_after),
            looped: Cell::new(def.looped.unwrap_or(false)),
            overflow: Cell::new(def.overflow.unwrap_or(true)),
            transition: RefCell::new(def.transition.unwrap_or_default()),
            interrupt: RefCell::new(def.interrupt),
            animation: RefCell::new(def.animation),
            setup: RefCell::new(def.setup),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f64 {
        self.duration.get()
    }

    pub fn delay_before(&self) -> f64 {
        self.delay_before.get()
    }

    pub fn delay_after(&self) -> f64 {
        self.delay_after.get()
    }

    pub fn looped(&self) -> bool {
        self.looped.get()
    }

    pub fn overflow(&self) -> bool {
        self.overflow.get()
    }

    /// delayBefore + duration + delayAfter.
    pub fn span(&self) -> f64 {
        self.delay_before() + self.duration() + self.delay_after()
    }

    pub fn set_duration(&self, duration: f64) -> Result<(), AnimatorError> {
        self.duration
            .set(check_timing(&self.name, "duration", duration)?);
        Ok(())
    }

    pub fn set_delay_before(&self, delay: f64) -> Result<(), AnimatorError> {
        self.delay_before
            .set(check_timing(&self.name, "delayBefore", delay)?);
        Ok(())
    }

    pub fn set_delay_after(&self, delay: f64) -> Result<(), AnimatorError> {
        self.delay_after
            .set(check_timing(&self.name, "delayAfter", delay)?);
        Ok(())
    }

    pub fn set_looped(&self, looped: bool) {
        self.looped.set(looped);
    }

    pub fn set_overflow(&self, overflow: bool) {
        self.overflow.set(overflow);
    }

    pub fn transition(&self) -> Transition<P> {
        self.transition.borrow().clone()
    }

    pub fn set_transition(&self, next: impl Into<Transition<P>>) {
        *self.transition.borrow_mut() = next.into();
    }

    pub fn interrupt(&self) -> Option<Transition<P>> {
        self.interrupt.borrow().clone()
    }

    pub fn set_interrupt(&self, next: Option<Transition<P>>) {
        *self.interrupt.borrow_mut() = next;
    }

    pub fn set_animation<F>(&self, f: F)
    where
        F: Fn(&Animator<P>, f64) + 'static,
    {
        *self.animation.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_setup<F>(&self, f: F)
    where
        F: Fn(&Animator<P>) + 'static,
    {
        *self.setup.borrow_mut() = Some(Rc::new(f));
    }

    // Callbacks are cloned out before the call so they can reconfigure this
    // state without tripping the RefCell.

    pub(crate) fn run_setup(&self, animator: &Animator<P>) {
        let setup = self.setup.borrow().clone();
        if let Some(setup) = setup {
            setup(animator);
        }
    }

    pub(crate) fn run_animation(&self, animator: &Animator<P>, progress: f64) {
        let animation = self.animation.borrow().clone();
        if let Some(animation) = animation {
            animation(animator, progress);
        }
    }

    pub(crate) fn resolve_transition(&self, animator: &Animator<P>) -> Next {
        let transition = self.transition();
        transition.evaluate(animator)
    }

    pub(crate) fn resolve_interrupt(&self, animator: &Animator<P>) -> Option<Next> {
        let interrupt = self.interrupt();
        interrupt.map(|rule| rule.evaluate(animator))
    }
}

/// Immutable-shape mapping from state name to [`StateConfig`].
pub struct StateTable<P> {
    states: HashMap<String, StateConfig<P>>,
}

impl<P> fmt::Debug for StateTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.states.iter()).finish()
    }
}

impl<P> StateTable<P> {
    /// Normalize `defs` into a table. Rejects the reserved names `"stop"` and
    /// `"pause"` and any negative or non-finite timing.
    pub fn new<I, K>(defs: I) -> Result<Self, AnimatorError>
    where
        I: IntoIterator<Item = (K, StateDef<P>)>,
        K: Into<String>,
    {
        let mut states = HashMap::new();
        for (name, def) in defs {
            let name = name.into();
            if name == STOP || name == PAUSE {
                return Err(AnimatorError::ReservedName { name });
            }
            let cfg = StateConfig::normalize(name.clone(), def)?;
            states.insert(name, cfg);
        }
        Ok(Self { states })
    }

    pub fn get(&self, name: &str) -> Option<&StateConfig<P>> {
        self.states.get(name)
    }

    pub(crate) fn require(&self, name: &str) -> Result<&StateConfig<P>, AnimatorError> {
        self.get(name)
            .ok_or_else(|| AnimatorError::state_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
