//! Scalar interpolation curves for banking and widening
//!
//! Banking angle and per-side widening are interpolated along each track
//! curve by a 1D curve built from four surrounding samples: the previous
//! curve's value, this curve's start and end values, and the next curve's
//! value. Smooth interpolation builds a Catmull-Rom-like cubic bezier from
//! them; the clamped variant keeps control points inside the min/max of
//! their three surrounding samples to prevent overshoot at sharp direction
//! changes.

use serde::{Deserialize, Serialize};

/// How a scalar value (bank angle, widening) is interpolated along a curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    Linear,
    /// Cubic with control points clamped into neighbor range (no overshoot).
    #[default]
    Smooth,
    /// Cubic with smaller tangents and no clamping.
    SmoothUnclamped,
}

/// A 1D interpolation curve over t in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarCurve {
    Linear { p0: f32, p1: f32 },
    Bezier { p0: f32, p1: f32, p2: f32, p3: f32 },
}

impl ScalarCurve {
    /// Evaluate the curve at `t` in [0, 1].
    pub fn point(&self, t: f32) -> f32 {
        match *self {
            ScalarCurve::Linear { p0, p1 } => (1.0 - t) * p0 + t * p1,
            ScalarCurve::Bezier { p0, p1, p2, p3 } => {
                let u = 1.0 - t;
                u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
            }
        }
    }
}

/// Build the interpolation curve for the span between `z[1]` and `z[2]`,
/// with `z[0]` and `z[3]` as smoothing context.
pub fn scalar_curve(z: [f32; 4], interpolation: Interpolation) -> ScalarCurve {
    let fraction = match interpolation {
        Interpolation::Linear => return ScalarCurve::Linear { p0: z[1], p1: z[2] },
        Interpolation::Smooth => 1.0 / 3.0,
        Interpolation::SmoothUnclamped => 1.0 / 10.0,
    };

    let mut p1 = z[1] + (z[2] - z[0]) * fraction;
    let mut p2 = z[2] - (z[3] - z[1]) * fraction;

    if interpolation == Interpolation::Smooth {
        p1 = p1
            .max(z[0].min(z[1]).min(z[2]))
            .min(z[0].max(z[1]).max(z[2]));
        p2 = p2
            .max(z[1].min(z[2]).min(z[3]))
            .min(z[1].max(z[2]).max(z[3]));
    }

    ScalarCurve::Bezier {
        p0: z[1],
        p1,
        p2,
        p3: z[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_interpolates_endpoints() {
        let c = scalar_curve([0.0, 0.0, 10.0, 10.0], Interpolation::Linear);
        assert_eq!(c.point(0.0), 0.0);
        assert_eq!(c.point(1.0), 10.0);
        assert!((c.point(0.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn smooth_hits_endpoints_exactly() {
        let c = scalar_curve([-5.0, 0.0, 10.0, 20.0], Interpolation::Smooth);
        assert!((c.point(0.0) - 0.0).abs() < 1e-6);
        assert!((c.point(1.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn smooth_clamps_against_overshoot() {
        // Sharp direction change: previous sample far above the span.
        let c = scalar_curve([100.0, 10.0, 0.0, 0.0], Interpolation::Smooth);
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            let v = c.point(t);
            assert!((-1e-4..=10.0 + 1e-4).contains(&v), "t={} v={}", t, v);
        }
    }

    #[test]
    fn unclamped_may_overshoot() {
        let clamped = scalar_curve([100.0, 10.0, 0.0, 0.0], Interpolation::Smooth);
        let unclamped = scalar_curve([100.0, 10.0, 0.0, 0.0], Interpolation::SmoothUnclamped);
        assert_ne!(clamped, unclamped);
    }

    #[test]
    fn flat_samples_stay_flat() {
        let c = scalar_curve([3.0, 3.0, 3.0, 3.0], Interpolation::Smooth);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((c.point(t) - 3.0).abs() < 1e-6);
        }
    }
}
