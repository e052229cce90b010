//! Cubic bezier evaluation and arc-length lookup
//!
//! Arcs sample directly (arc length is linear in angle), but beziers need
//! a distance-to-parameter table to convert authoring space (smooth curve)
//! into sampling space (fixed-length segments).

use glam::Vec3;

/// A cubic bezier in 3D.
#[derive(Clone, Copy, Debug)]
pub struct Bezier3 {
    points: [Vec3; 4],
}

impl Bezier3 {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        Self {
            points: [p0, p1, p2, p3],
        }
    }

    /// Evaluate the curve at `t` in [0, 1].
    pub fn point(&self, t: f32) -> Vec3 {
        let [p0, p1, p2, p3] = self.points;
        let u = 1.0 - t;
        p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
    }

    /// Derivative at `t` (not normalized).
    pub fn tangent(&self, t: f32) -> Vec3 {
        let [p0, p1, p2, p3] = self.points;
        let u = 1.0 - t;
        (p1 - p0) * (3.0 * u * u) + (p2 - p1) * (6.0 * u * t) + (p3 - p2) * (3.0 * t * t)
    }

    /// Build the distance-to-parameter lookup table.
    ///
    /// Walks `t` upward in `t_step` increments accumulating chord length and
    /// records the parameter at each multiple of `segment_length`. The
    /// returned table holds parameters for the boundaries z = 0, S, 2S, ...;
    /// one path segment is emitted per adjacent pair, so the realized curve
    /// length is `(table.len() - 1) * segment_length`, rounded down to whole
    /// segments. The final entry is forced to t = 1 so the authored endpoint
    /// is honored exactly.
    pub fn distance_lookup(&self, t_step: f32, segment_length: f32) -> Vec<f32> {
        let mut table = vec![0.0f32];
        if t_step <= 0.0 || segment_length <= 0.0 {
            return table;
        }

        let mut accumulated = 0.0f32;
        let mut next_boundary = segment_length;
        let mut prev = self.point(0.0);
        let mut t = 0.0f32;

        while t < 1.0 {
            t = (t + t_step).min(1.0);
            let pos = self.point(t);
            accumulated += (pos - prev).length();
            prev = pos;

            while accumulated >= next_boundary {
                table.push(t);
                next_boundary += segment_length;
            }
        }

        // Honor the authored endpoint exactly; the last segment absorbs the
        // sub-segment remainder.
        if table.len() > 1 {
            let last = table.len() - 1;
            table[last] = 1.0;
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_hits_endpoints() {
        let b = Bezier3::new(
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(3.0, 0.0, 3.0),
        );
        assert!((b.point(0.0) - Vec3::ZERO).length() < 1e-6);
        assert!((b.point(1.0) - Vec3::new(3.0, 0.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn tangent_of_straight_line_is_constant_direction() {
        let b = Bezier3::new(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 0.0, 3.0),
        );
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            let tan = b.tangent(t).normalize();
            assert!((tan - Vec3::Z).length() < 1e-5, "t={}", t);
        }
    }

    #[test]
    fn lookup_of_straight_line_floors_to_whole_segments() {
        // Straight 10.5-unit line, 1-unit segments: boundaries at 1..=10,
        // the half-segment remainder is absorbed by the final entry.
        let b = Bezier3::new(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 3.5),
            Vec3::new(0.0, 0.0, 7.0),
            Vec3::new(0.0, 0.0, 10.5),
        );
        let table = b.distance_lookup(0.0005, 1.0);
        assert_eq!(table.len(), 11);
        assert_eq!(table[0], 0.0);
        assert_eq!(*table.last().unwrap(), 1.0);
    }

    #[test]
    fn lookup_endpoint_is_exact_regardless_of_step() {
        let b = Bezier3::new(
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(15.0, 2.0, 15.0),
        );
        for segment_length in [0.25, 0.5, 1.3] {
            let table = b.distance_lookup(0.001, segment_length);
            let end = b.point(*table.last().unwrap());
            assert!(
                (end - Vec3::new(15.0, 2.0, 15.0)).length() < 1e-4,
                "segment_length={}",
                segment_length
            );
        }
    }

    #[test]
    fn lookup_parameters_are_monotonic() {
        let b = Bezier3::new(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 8.0),
            Vec3::new(8.0, 0.0, 8.0),
            Vec3::new(8.0, 0.0, 0.0),
        );
        let table = b.distance_lookup(0.001, 0.5);
        for pair in table.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
