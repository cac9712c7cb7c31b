//! Vizij Animator Core (engine-agnostic)
//!
//! A tick-driven, per-entity state machine that sequences animation phases
//! (delay before -> active duration -> delay after -> transition). It does not
//! render anything: it decides when caller-supplied callbacks fire and what
//! the phase progress is. Hosts call [`Registry::update`] (or the crate-level
//! [`update`]) once per frame with the elapsed time.
//!
//! Everything here is single-threaded; handles are `Rc`-based and cheap to clone.

pub mod animator;
pub mod config;
pub mod easing;
pub mod error;
pub mod events;
pub mod ids;
pub mod registry;
pub mod state;
pub mod stored_states;
pub mod wait;

// Re-exports for consumers (adapters)
pub use animator::{Animator, AnimatorBuilder};
pub use config::AnimatorConfig;
pub use easing::{CubicBezier, Easing, EasingFn, EasingRegistry};
pub use error::AnimatorError;
pub use events::{EventChannel, Listen};
pub use ids::{AnimatorId, ListenerToken};
pub use registry::Registry;
pub use state::{Next, StateConfig, StateDef, StateTable, Transition, INITIAL, PAUSE, STOP};
pub use stored_states::{parse_stored_state_table_json, parse_stored_states_json};
pub use wait::{StateQuery, StateWaiter};

/// Animator result type
pub type Result<T> = core::result::Result<T, AnimatorError>;

/// Advance every animator in this thread's shared registry by `delta`.
pub fn update(delta: f64) -> Result<()> {
    Registry::shared().update(delta)
}
