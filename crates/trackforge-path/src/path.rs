//! Path generation and caching
//!
//! Walks the ordered curve list maintaining a running frame (position,
//! direction, bank pivot, widening) and emits fixed-length segments. Arcs
//! sample directly since their arc length is linear in angle; beziers go
//! through the distance lookup table. The derived path is cached against
//! the track's generation id and rebuilt from scratch on any edit — curve
//! edits are infrequent interactive operations, not a hot path.

use glam::Vec3;
use trackforge_core::{
    normalize_degrees, scalar_curve, Interpolation, Result, ScalarCurve, TrackError,
};

use crate::bezier::Bezier3;
use crate::curve::{CurveDescriptor, CurveKind, Widening};
use crate::segment::{rotation_from_degrees, PathSegment};

/// Hard ceiling on generated segments; pathological input trips this
/// instead of hanging.
const MAX_SEGMENTS: usize = 1_000_000;

/// What `Path::segment` returns for indices beyond the last real segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Overrun {
    /// Continue the last segment's direction in a straight line.
    Extrapolate,
    /// Wrap back to the start, nudging Y per wrap to avoid z-fighting where
    /// the seam overlaps itself.
    Loop { y_offset: f32 },
}

/// Immutable snapshot of the track-level settings a path build needs.
#[derive(Clone, Debug)]
pub struct PathParams {
    /// Sampling step; every segment has this length.
    pub segment_length: f32,
    pub start_position: Vec3,
    /// Euler degrees (x gradient, y turn, z bank).
    pub start_direction: Vec3,
    pub start_bank_pivot: Vec3,
    pub start_widening: Widening,
    pub banking_interpolation: Interpolation,
    pub widening_interpolation: Interpolation,
    pub overrun: Overrun,
    /// Track space to world space.
    pub world_transform: glam::Mat4,
}

impl Default for PathParams {
    fn default() -> Self {
        Self {
            segment_length: 0.25,
            start_position: Vec3::ZERO,
            start_direction: Vec3::ZERO,
            start_bank_pivot: Vec3::ZERO,
            start_widening: Widening::ZERO,
            banking_interpolation: Interpolation::Smooth,
            widening_interpolation: Interpolation::Linear,
            overrun: Overrun::Extrapolate,
            world_transform: glam::Mat4::IDENTITY,
        }
    }
}

/// Running state while walking the curve list.
struct Frame {
    position: Vec3,
    direction: Vec3,
    bank_pivot: Vec3,
    widening: Widening,
}

/// The derived fixed-step polyline approximation of the curve sequence.
#[derive(Clone, Debug)]
pub struct Path {
    params: PathParams,
    segments: Vec<PathSegment>,
}

impl Path {
    /// Generate the full segment sequence for `curves`.
    ///
    /// Bezier curves get their realized length written back (length is an
    /// emergent property of arc-length sampling, not authored input).
    pub fn generate(curves: &mut [CurveDescriptor], params: &PathParams) -> Result<Self> {
        let seg_len = params.segment_length;
        if seg_len <= 0.0 {
            return Err(TrackError::InvalidCurve(
                "segment length must be positive".to_string(),
            ));
        }

        let mut segments: Vec<PathSegment> = Vec::new();
        let mut frame = Frame {
            position: params.start_position,
            direction: params.start_direction,
            bank_pivot: params.start_bank_pivot,
            widening: params.start_widening,
        };

        // Smoothing context from the previous curve; falls back to the
        // path's own start values at the track boundary.
        let mut prev_bank_start = params.start_direction.z;
        let mut prev_widening_start = params.start_widening;

        for index in 0..curves.len() {
            let banking_interpolation = curves[index]
                .banking_interpolation
                .unwrap_or(params.banking_interpolation);
            let widening_interpolation = curves[index]
                .widening_interpolation
                .unwrap_or(params.widening_interpolation);

            let bank_start = frame.direction.z;
            let bank_end = bank_start + curves[index].angles.z;
            let next_bank_end = curves
                .get(index + 1)
                .map(|c| bank_end + c.angles.z)
                .unwrap_or(bank_end);
            let bank_curve = scalar_curve(
                [prev_bank_start, bank_start, bank_end, next_bank_end],
                banking_interpolation,
            );

            let widening_start = frame.widening;
            let widening_end = curves[index].widening;
            let next_widening = curves
                .get(index + 1)
                .map(|c| c.widening)
                .unwrap_or(widening_end);
            let left_curve = scalar_curve(
                [
                    prev_widening_start.left,
                    widening_start.left,
                    widening_end.left,
                    next_widening.left,
                ],
                widening_interpolation,
            );
            let right_curve = scalar_curve(
                [
                    prev_widening_start.right,
                    widening_start.right,
                    widening_end.right,
                    next_widening.right,
                ],
                widening_interpolation,
            );

            let pivot_start = frame.bank_pivot;
            let pivot_end = curves[index].bank_pivot;
            let curve = &mut curves[index];

            match curve.kind {
                CurveKind::Arc => {
                    let length = curve.length;
                    if length <= 0.0 {
                        log::warn!("arc curve {} has non-positive length, skipped", index);
                    } else {
                        let steps = (length / seg_len + 1e-5).floor() as usize;
                        let pitch_step = curve.angles.x * seg_len / length;
                        let yaw_step = curve.angles.y * seg_len / length;

                        for step in 0..steps {
                            let frac = step as f32 * seg_len / length;
                            segments.push(sample_segment(
                                frame.position,
                                Vec3::new(
                                    frame.direction.x,
                                    frame.direction.y,
                                    bank_curve.point(frac),
                                ),
                                pivot_start.lerp(pivot_end, frac),
                                &left_curve,
                                &right_curve,
                                frac,
                                seg_len,
                            ));

                            // Direction advances first so curvature compounds
                            // smoothly through the rotated forward step.
                            frame.direction.x += pitch_step;
                            frame.direction.y += yaw_step;
                            let forward = rotation_from_degrees(Vec3::new(
                                frame.direction.x,
                                frame.direction.y,
                                0.0,
                            ))
                            .transform_vector3(Vec3::Z);
                            frame.position += forward * seg_len;
                        }
                    }
                }
                CurveKind::Bezier {
                    end_position,
                    start_control,
                    end_control,
                } => {
                    let orient = rotation_from_degrees(Vec3::new(
                        frame.direction.x,
                        frame.direction.y,
                        0.0,
                    ));
                    let p0 = frame.position;
                    let p3 = p0 + orient.transform_vector3(end_position);
                    let separation = (p3 - p0).length();
                    if separation <= 1e-5 {
                        log::warn!("bezier curve {} has zero separation, skipped", index);
                        curve.length = 0.0;
                    } else {
                        let start_forward = orient.transform_vector3(Vec3::Z);
                        let end_euler = Vec3::new(
                            frame.direction.x + curve.angles.x,
                            frame.direction.y + curve.angles.y,
                            0.0,
                        );
                        let end_forward =
                            rotation_from_degrees(end_euler).transform_vector3(Vec3::Z);
                        let bezier = Bezier3::new(
                            p0,
                            p0 + start_forward * separation * start_control,
                            p3 - end_forward * separation * end_control,
                            p3,
                        );

                        let t_step = (seg_len / (separation * 4.0)).clamp(1e-5, 0.01);
                        let table = bezier.distance_lookup(t_step, seg_len);
                        let count = table.len() - 1;
                        let realized = count as f32 * seg_len;
                        curve.length = realized;

                        for (i, &t) in table.iter().take(count).enumerate() {
                            let tangent = bezier.tangent(t);
                            let tangent = if tangent.length_squared() > 1e-12 {
                                tangent.normalize()
                            } else {
                                start_forward
                            };
                            let yaw = tangent.x.atan2(tangent.z).to_degrees();
                            let pitch = (-tangent.y.clamp(-1.0, 1.0)).asin().to_degrees();
                            let frac = i as f32 * seg_len / realized.max(seg_len);
                            segments.push(sample_segment(
                                bezier.point(t),
                                Vec3::new(pitch, yaw, bank_curve.point(frac)),
                                pivot_start.lerp(pivot_end, frac),
                                &left_curve,
                                &right_curve,
                                frac,
                                seg_len,
                            ));
                        }

                        // Authored endpoint and end orientation are exact.
                        frame.position = p3;
                        frame.direction.x = end_euler.x;
                        frame.direction.y = end_euler.y;
                    }
                }
            }

            prev_bank_start = bank_start;
            prev_widening_start = widening_start;
            frame.direction.z = bank_end;
            frame.widening = widening_end;
            frame.bank_pivot = pivot_end;

            if segments.len() > MAX_SEGMENTS {
                return Err(TrackError::RunawayGuard(format!(
                    "path exceeded {} segments at curve {}",
                    MAX_SEGMENTS, index
                )));
            }
        }

        // Terminal segment carrying the end-of-track state.
        segments.push(PathSegment {
            position: frame.position,
            direction: frame.direction,
            bank_pivot: frame.bank_pivot,
            widening: frame.widening,
            length: seg_len,
            ..Default::default()
        });

        compute_deltas(&mut segments, seg_len);

        Ok(Self {
            params: params.clone(),
            segments,
        })
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Track length covered by real segments (the terminal segment marks
    /// the end and contributes none).
    pub fn total_length(&self) -> f32 {
        self.segments.len().saturating_sub(1) as f32 * self.params.segment_length
    }

    /// Segment at `index`, applying the overrun policy beyond the end.
    pub fn segment(&self, index: usize) -> PathSegment {
        if index < self.segments.len() {
            return self.segments[index].clone();
        }
        match self.params.overrun {
            Overrun::Extrapolate => {
                let last = self.segments.last().cloned().unwrap_or_default();
                let extra = (index + 1 - self.segments.len()) as f32;
                let forward =
                    rotation_from_degrees(last.direction).transform_vector3(Vec3::Z);
                PathSegment {
                    position: last.position + forward * last.length * extra,
                    position_delta: forward * last.length,
                    direction_delta: Vec3::ZERO,
                    bank_pivot_delta: Vec3::ZERO,
                    widening_delta: Widening::ZERO,
                    ..last
                }
            }
            Overrun::Loop { y_offset } => {
                let n = self.segments.len();
                if n < 2 {
                    return self.segments.first().cloned().unwrap_or_default();
                }
                let wraps = (index / (n - 1)) as f32;
                let mut segment = self.segments[index % (n - 1)].clone();
                segment.position.y += y_offset * wraps;
                segment
            }
        }
    }

    /// Split an absolute path offset into (segment index, offset within it).
    pub fn locate(&self, z: f32) -> (usize, f32) {
        let seg_len = self.params.segment_length;
        if z <= 0.0 {
            return (0, z.max(0.0));
        }
        let index = (z / seg_len).floor() as usize;
        (index, z - index as f32 * seg_len)
    }
}

fn sample_segment(
    position: Vec3,
    direction: Vec3,
    bank_pivot: Vec3,
    left_curve: &ScalarCurve,
    right_curve: &ScalarCurve,
    frac: f32,
    length: f32,
) -> PathSegment {
    PathSegment {
        position,
        direction,
        bank_pivot,
        widening: Widening::new(left_curve.point(frac), right_curve.point(frac)),
        length,
        ..Default::default()
    }
}

/// Post-pass: every segment gets its to-next deltas; angle deltas are
/// normalized into (-180, 180].
fn compute_deltas(segments: &mut [PathSegment], seg_len: f32) {
    for i in 0..segments.len().saturating_sub(1) {
        let next = segments[i + 1].clone();
        let seg = &mut segments[i];
        seg.position_delta = next.position - seg.position;
        seg.direction_delta = Vec3::new(
            normalize_degrees(next.direction.x - seg.direction.x),
            normalize_degrees(next.direction.y - seg.direction.y),
            normalize_degrees(next.direction.z - seg.direction.z),
        );
        seg.bank_pivot_delta = next.bank_pivot - seg.bank_pivot;
        seg.widening_delta = Widening::new(
            next.widening.left - seg.widening.left,
            next.widening.right - seg.widening.right,
        );
    }
    if let Some(last) = segments.last_mut() {
        let forward = rotation_from_degrees(last.direction).transform_vector3(Vec3::Z);
        last.position_delta = forward * seg_len;
    }
}

/// An editable track: ordered curves plus path params, with the derived
/// path cached against a generation id bumped on every mutation.
#[derive(Clone, Debug)]
pub struct Track {
    curves: Vec<CurveDescriptor>,
    params: PathParams,
    generation: u64,
    cached: Option<(u64, Path)>,
}

impl Track {
    pub fn new(params: PathParams) -> Self {
        Self {
            curves: Vec::new(),
            params,
            generation: 0,
            cached: None,
        }
    }

    pub fn with_curves(params: PathParams, curves: Vec<CurveDescriptor>) -> Self {
        Self {
            curves,
            params,
            generation: 0,
            cached: None,
        }
    }

    pub fn curves(&self) -> &[CurveDescriptor] {
        &self.curves
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    pub fn push_curve(&mut self, curve: CurveDescriptor) {
        self.curves.push(curve);
        self.touch();
    }

    pub fn insert_curve(&mut self, index: usize, curve: CurveDescriptor) {
        self.curves.insert(index, curve);
        self.touch();
    }

    pub fn remove_curve(&mut self, index: usize) -> CurveDescriptor {
        self.touch();
        self.curves.remove(index)
    }

    /// Mutable access to a curve. Conservatively invalidates the cached
    /// path even if the caller ends up not changing anything.
    pub fn curve_mut(&mut self, index: usize) -> Option<&mut CurveDescriptor> {
        self.touch();
        self.curves.get_mut(index)
    }

    pub fn set_params(&mut self, params: PathParams) {
        self.params = params;
        self.touch();
    }

    /// The derived path, rebuilt if any curve or the params changed since
    /// the last build. Rebuilds are always from scratch; the path is never
    /// patched in place.
    pub fn path(&mut self) -> Result<&Path> {
        let stale = !matches!(&self.cached, Some((generation, _)) if *generation == self.generation);
        if stale {
            let path = Path::generate(&mut self.curves, &self.params)?;
            self.cached = Some((self.generation, path));
        }
        match &self.cached {
            Some((_, path)) => Ok(path),
            None => Err(TrackError::BuildError(
                "path cache missing after rebuild".to_string(),
            )),
        }
    }
}
