//! Easing curves: named pure functions `progress -> eased value`.
//!
//! Inputs are usually in [0,1] but nothing here clamps them except the
//! cubic-bezier solver, whose x axis is only defined on [0,1].

use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::AnimatorError;

/// Shared easing curve.
pub type EasingFn = Rc<dyn Fn(f64) -> f64>;

#[inline]
pub fn linear(t: f64) -> f64 {
    t
}

/// No interpolation: holds the start value until the phase completes.
#[inline]
pub fn step(t: f64) -> f64 {
    if t >= 1.0 {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn pow_in(t: f64, n: i32) -> f64 {
    t.powi(n)
}

#[inline]
fn pow_out(t: f64, n: i32) -> f64 {
    1.0 - (1.0 - t).powi(n)
}

#[inline]
fn pow_in_out(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

pub fn ease_in_quad(t: f64) -> f64 {
    pow_in(t, 2)
}
pub fn ease_out_quad(t: f64) -> f64 {
    pow_out(t, 2)
}
pub fn ease_in_out_quad(t: f64) -> f64 {
    pow_in_out(t, 2)
}
pub fn ease_in_cubic(t: f64) -> f64 {
    pow_in(t, 3)
}
pub fn ease_out_cubic(t: f64) -> f64 {
    pow_out(t, 3)
}
pub fn ease_in_out_cubic(t: f64) -> f64 {
    pow_in_out(t, 3)
}
pub fn ease_in_quart(t: f64) -> f64 {
    pow_in(t, 4)
}
pub fn ease_out_quart(t: f64) -> f64 {
    pow_out(t, 4)
}
pub fn ease_in_out_quart(t: f64) -> f64 {
    pow_in_out(t, 4)
}
pub fn ease_in_quint(t: f64) -> f64 {
    pow_in(t, 5)
}
pub fn ease_out_quint(t: f64) -> f64 {
    pow_out(t, 5)
}
pub fn ease_in_out_quint(t: f64) -> f64 {
    pow_in_out(t, 5)
}

pub fn ease_in_sine(t: f64) -> f64 {
    1.0 - (t * PI / 2.0).cos()
}
pub fn ease_out_sine(t: f64) -> f64 {
    (t * PI / 2.0).sin()
}
pub fn ease_in_out_sine(t: f64) -> f64 {
    -((PI * t).cos() - 1.0) / 2.0
}

pub fn ease_in_expo(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else {
        2f64.powf(10.0 * t - 10.0)
    }
}
pub fn ease_out_expo(t: f64) -> f64 {
    if t == 1.0 {
        1.0
    } else {
        1.0 - 2f64.powf(-10.0 * t)
    }
}
pub fn ease_in_out_expo(t: f64) -> f64 {
    if t == 0.0 || t == 1.0 {
        t
    } else if t < 0.5 {
        2f64.powf(20.0 * t - 10.0) / 2.0
    } else {
        (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
    }
}

pub fn ease_in_circ(t: f64) -> f64 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}
pub fn ease_out_circ(t: f64) -> f64 {
    (1.0 - (t - 1.0) * (t - 1.0)).max(0.0).sqrt()
}
pub fn ease_in_out_circ(t: f64) -> f64 {
    if t < 0.5 {
        (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
    } else {
        ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
    }
}

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;

pub fn ease_in_back(t: f64) -> f64 {
    BACK_C3 * t * t * t - BACK_C1 * t * t
}
pub fn ease_out_back(t: f64) -> f64 {
    let u = t - 1.0;
    1.0 + BACK_C3 * u * u * u + BACK_C1 * u * u
}
pub fn ease_in_out_back(t: f64) -> f64 {
    if t < 0.5 {
        ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
    } else {
        ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0) / 2.0
    }
}

pub fn ease_in_elastic(t: f64) -> f64 {
    let c4 = (2.0 * PI) / 3.0;
    if t == 0.0 || t == 1.0 {
        t
    } else {
        -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
    }
}
pub fn ease_out_elastic(t: f64) -> f64 {
    let c4 = (2.0 * PI) / 3.0;
    if t == 0.0 || t == 1.0 {
        t
    } else {
        2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
    }
}
pub fn ease_in_out_elastic(t: f64) -> f64 {
    let c5 = (2.0 * PI) / 4.5;
    if t == 0.0 || t == 1.0 {
        t
    } else if t < 0.5 {
        -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
    } else {
        (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
    }
}

pub fn ease_out_bounce(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
pub fn ease_in_bounce(t: f64) -> f64 {
    1.0 - ease_out_bounce(1.0 - t)
}
pub fn ease_in_out_bounce(t: f64) -> f64 {
    if t < 0.5 {
        (1.0 - ease_out_bounce(1.0 - 2.0 * t)) / 2.0
    } else {
        (1.0 + ease_out_bounce(2.0 * t - 1.0)) / 2.0
    }
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// CSS-style timing curve through (0,0), (x1,y1), (x2,y2), (1,1).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const EASE: CubicBezier = CubicBezier::new(0.25, 0.1, 0.25, 1.0);
    pub const EASE_IN: CubicBezier = CubicBezier::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: CubicBezier = CubicBezier::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: CubicBezier = CubicBezier::new(0.42, 0.0, 0.58, 1.0);

    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Given an input t in [0,1], compute the eased y by inverting the x
    /// bezier via binary search.
    pub fn ease(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let Self { x1, y1, x2, y2 } = *self;
        // Bezier(0,0,1,1) is exactly linear
        if x1 == 0.0 && y1 == 0.0 && x2 == 1.0 && y2 == 1.0 {
            return t;
        }
        // Monotonic X in [0,1] assumed for x1/x2 in [0,1]
        let mut lo = 0.0f64;
        let mut hi = 1.0f64;
        let mut mid = t;
        for _ in 0..48 {
            let x = cubic_bezier(0.0, x1, x2, 1.0, mid);
            if (x - t).abs() < 1e-9 {
                break;
            }
            if x < t {
                lo = mid;
            } else {
                hi = mid;
            }
            mid = 0.5 * (lo + hi);
        }
        cubic_bezier(0.0, y1, y2, 1.0, mid)
    }

    pub fn into_fn(self) -> EasingFn {
        Rc::new(move |t| self.ease(t))
    }
}

const BUILTINS: &[(&str, fn(f64) -> f64)] = &[
    ("linear", linear),
    ("step", step),
    ("ease_in_quad", ease_in_quad),
    ("ease_out_quad", ease_out_quad),
    ("ease_in_out_quad", ease_in_out_quad),
    ("ease_in_cubic", ease_in_cubic),
    ("ease_out_cubic", ease_out_cubic),
    ("ease_in_out_cubic", ease_in_out_cubic),
    ("ease_in_quart", ease_in_quart),
    ("ease_out_quart", ease_out_quart),
    ("ease_in_out_quart", ease_in_out_quart),
    ("ease_in_quint", ease_in_quint),
    ("ease_out_quint", ease_out_quint),
    ("ease_in_out_quint", ease_in_out_quint),
    ("ease_in_sine", ease_in_sine),
    ("ease_out_sine", ease_out_sine),
    ("ease_in_out_sine", ease_in_out_sine),
    ("ease_in_expo", ease_in_expo),
    ("ease_out_expo", ease_out_expo),
    ("ease_in_out_expo", ease_in_out_expo),
    ("ease_in_circ", ease_in_circ),
    ("ease_out_circ", ease_out_circ),
    ("ease_in_out_circ", ease_in_out_circ),
    ("ease_in_back", ease_in_back),
    ("ease_out_back", ease_out_back),
    ("ease_in_out_back", ease_in_out_back),
    ("ease_in_elastic", ease_in_elastic),
    ("ease_out_elastic", ease_out_elastic),
    ("ease_in_out_elastic", ease_in_out_elastic),
    ("ease_in_bounce", ease_in_bounce),
    ("ease_out_bounce", ease_out_bounce),
    ("ease_in_out_bounce", ease_in_out_bounce),
];

/// Name -> curve lookup. `Default` carries every built-in curve plus the CSS
/// presets `ease`, `ease_in`, `ease_out` and `ease_in_out`.
#[derive(Clone)]
pub struct EasingRegistry {
    fns: HashMap<String, EasingFn>,
}

impl fmt::Debug for EasingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("EasingRegistry")
            .field("names", &names)
            .finish()
    }
}

impl Default for EasingRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        for (name, f) in BUILTINS {
            let f = *f;
            reg.register(*name, move |t| f(t));
        }
        reg.register_bezier("ease", CubicBezier::EASE);
        reg.register_bezier("ease_in", CubicBezier::EASE_IN);
        reg.register_bezier("ease_out", CubicBezier::EASE_OUT);
        reg.register_bezier("ease_in_out", CubicBezier::EASE_IN_OUT);
        reg
    }
}

impl EasingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no curves at all.
    pub fn empty() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }

    /// Add or replace a named curve.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(f64) -> f64 + 'static,
    {
        self.fns.insert(name.into(), Rc::new(f));
    }

    pub fn register_bezier(&mut self, name: impl Into<String>, curve: CubicBezier) {
        self.fns.insert(name.into(), curve.into_fn());
    }

    pub fn get(&self, name: &str) -> Option<EasingFn> {
        self.fns.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fns.keys().map(String::as_str).collect()
    }
}

thread_local! {
    static DEFAULT_EASINGS: Rc<EasingRegistry> = Rc::new(EasingRegistry::default());
}

/// Built-in registry shared by every animator on this thread that was not
/// given its own.
pub fn default_easings() -> Rc<EasingRegistry> {
    DEFAULT_EASINGS.with(Rc::clone)
}

/// Easing argument: a registered name or a curve supplied inline.
#[derive(Clone)]
pub enum Easing {
    Named(String),
    Func(EasingFn),
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Easing::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl Easing {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        Easing::Func(Rc::new(f))
    }

    /// Look the curve up in `registry` (inline curves resolve to themselves).
    pub fn resolve(&self, registry: &EasingRegistry) -> Result<EasingFn, AnimatorError> {
        match self {
            Easing::Named(name) => {
                registry
                    .get(name)
                    .ok_or_else(|| AnimatorError::EasingNotFound { name: name.clone() })
            }
            Easing::Func(f) => Ok(f.clone()),
        }
    }
}

impl From<&str> for Easing {
    fn from(name: &str) -> Self {
        Easing::Named(name.to_string())
    }
}

impl From<String> for Easing {
    fn from(name: String) -> Self {
        Easing::Named(name)
    }
}

impl From<CubicBezier> for Easing {
    fn from(curve: CubicBezier) -> Self {
        Easing::Func(curve.into_fn())
    }
}

impl From<EasingFn> for Easing {
    fn from(f: EasingFn) -> Self {
        Easing::Func(f)
    }
}
