//! Core configuration for vizij-animator-core.

use serde::{Deserialize, Serialize};

use crate::error::AnimatorError;

/// Per-instance tuning applied when an [`Animator`](crate::Animator) is built.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimatorConfig {
    /// Multiplier applied to every `update` delta before it reaches the clock.
    pub time_scale: f64,

    /// Maximum resolution steps per tick. Tripping it means a cycle of
    /// zero-duration states is transitioning forever.
    pub max_steps_per_tick: usize,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            max_steps_per_tick: 1000,
        }
    }
}

impl AnimatorConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(s: &str) -> Result<Self, AnimatorError> {
        let cfg: AnimatorConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AnimatorError> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(AnimatorError::invalid(format!(
                "time scale must be finite and non-negative, got {}",
                self.time_scale
            )));
        }
        if self.max_steps_per_tick == 0 {
            return Err(AnimatorError::invalid("max steps per tick must be positive"));
        }
        Ok(())
    }
}
