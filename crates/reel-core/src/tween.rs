//! # Tween Engine
//!
//! Interpolated transforms between authored keys. Sampling is pure: every call
//! recomputes from the authored endpoints, so ticking never accumulates error.

use crate::timeline::Frame;
use crate::types::Transform;
use keyframe::{CanTween, EasingFunction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timing curve of a tween segment.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TweenCurve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// CSS-style cubic bezier timing with control points (x1, y1) and (x2, y2).
    Bezier { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl EasingFunction for TweenCurve {
    fn y(&self, x: f64) -> f64 {
        match self {
            TweenCurve::Linear => keyframe::functions::Linear.y(x),
            TweenCurve::EaseIn => keyframe::functions::EaseIn.y(x),
            TweenCurve::EaseOut => keyframe::functions::EaseOut.y(x),
            TweenCurve::EaseInOut => keyframe::functions::EaseInOut.y(x),
            TweenCurve::Bezier { x1, y1, x2, y2 } => {
                bezier_ease(x as f32, *x1, *y1, *x2, *y2) as f64
            }
        }
    }
}

impl TweenCurve {
    /// Evaluates the curve at `x` in `[0, 1]`.
    pub fn eval(&self, x: f32) -> f32 {
        self.y(x.clamp(0.0, 1.0) as f64) as f32
    }
}

#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Inverts the x polynomial by bisection, then evaluates y.
fn bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if x1 == y1 && x2 == y2 {
        return t;
    }
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut mid = t;
    for _ in 0..24 {
        let x = cubic_bezier(0.0, x1, x2, 1.0, mid);
        if (x - t).abs() < 1e-6 {
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

/// The tweenable subset of a transform.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TweenValues {
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub alpha: f32,
}

impl Default for TweenValues {
    fn default() -> Self {
        Self::from(&Transform::default())
    }
}

impl From<&Transform> for TweenValues {
    fn from(t: &Transform) -> Self {
        Self {
            x: t.x,
            y: t.y,
            scale_x: t.scale_x,
            scale_y: t.scale_y,
            rotation: t.rotation,
            alpha: t.alpha,
        }
    }
}

impl TweenValues {
    /// Writes the values into `transform`, leaving the flip flags alone.
    pub fn apply_to(&self, transform: &mut Transform) {
        transform.x = self.x;
        transform.y = self.y;
        transform.scale_x = self.scale_x;
        transform.scale_y = self.scale_y;
        transform.rotation = self.rotation;
        transform.alpha = self.alpha;
    }
}

impl CanTween for TweenValues {
    fn ease(from: Self, to: Self, time: impl keyframe::num_traits::Float) -> Self {
        let t = time.to_f64().unwrap_or(0.0) as f32;
        let lerp = |a: f32, b: f32| a + (b - a) * t;
        Self {
            x: lerp(from.x, to.x),
            y: lerp(from.y, to.y),
            scale_x: lerp(from.scale_x, to.scale_x),
            scale_y: lerp(from.scale_y, to.scale_y),
            rotation: lerp(from.rotation, to.rotation),
            alpha: lerp(from.alpha, to.alpha),
        }
    }
}

/// One authored key. `position` is a 0-based offset inside the owning frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TweenKey {
    pub position: u32,
    pub values: TweenValues,
    /// Shapes the segment that starts at this key.
    #[serde(default)]
    pub curve: TweenCurve,
}

/// Motion of one child of a frame, identified by its universal id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    pub target: Uuid,
    pub keys: Vec<TweenKey>,
}

impl Tween {
    pub fn new(target: Uuid, mut keys: Vec<TweenKey>) -> Self {
        keys.sort_by_key(|k| k.position);
        Self { target, keys }
    }

    /// Samples the tween at a frame-local position.
    ///
    /// Before the first key and after the last one the nearest key holds.
    pub fn sample(&self, position: u32) -> Option<TweenValues> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if position <= first.position {
            return Some(first.values);
        }
        if position >= last.position {
            return Some(last.values);
        }
        let segment = self
            .keys
            .windows(2)
            .find(|w| w[0].position <= position && position < w[1].position)?;
        let (a, b) = (&segment[0], &segment[1]);
        let span = (b.position - a.position) as f32;
        let t = (position - a.position) as f32 / span;
        Some(TweenValues::ease(a.values, b.values, a.curve.eval(t)))
    }
}

/// Computes the transform of every tweened child of `frame` at a frame-local position.
pub fn compute_tweens(frame: &Frame, local_position: u32) -> Vec<(Uuid, TweenValues)> {
    frame
        .tweens
        .iter()
        .filter_map(|tween| tween.sample(local_position).map(|v| (tween.target, v)))
        .collect()
}
