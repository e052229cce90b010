//! Authored curve descriptors

use glam::Vec3;
use trackforge_core::{GeometryHasher, Interpolation};

/// Per-side horizontal widening of the track cross-section.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Widening {
    pub left: f32,
    pub right: f32,
}

impl Widening {
    pub const ZERO: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub fn hash_into(&self, hasher: &mut dyn GeometryHasher) {
        hasher.write_rounded_f32(self.left);
        hasher.write_rounded_f32(self.right);
    }
}

/// The shape of one authored curve.
#[derive(Clone, Debug, PartialEq)]
pub enum CurveKind {
    /// Constant-curvature section. Length is authored directly.
    Arc,
    /// Cubic bezier to an end position expressed in the curve-start frame.
    /// Length is derived by arc-length sampling during path generation,
    /// never authored.
    Bezier {
        end_position: Vec3,
        /// Distance from the start point to its control point, as a
        /// fraction of the straight-line separation.
        start_control: f32,
        /// Same for the end point's control point.
        end_control: f32,
    },
}

/// One authored track element.
///
/// Curves form a strictly ordered sequence owned by a [`crate::Track`];
/// the index is positional. Angles are deltas across the curve, in degrees
/// (x = gradient/pitch, y = turn/yaw, z = bank); banking and widening reach
/// their authored values at the curve's end.
#[derive(Clone, Debug)]
pub struct CurveDescriptor {
    pub kind: CurveKind,
    /// Authored for arcs; derived (written back) for beziers.
    pub length: f32,
    /// Orientation delta across the curve, degrees.
    pub angles: Vec3,
    /// Bank pivot offset at the curve's end.
    pub bank_pivot: Vec3,
    /// Widening at the curve's end.
    pub widening: Widening,
    /// Overrides the path default when set.
    pub banking_interpolation: Option<Interpolation>,
    pub widening_interpolation: Option<Interpolation>,
    /// Jump curves produce path segments but no template copies.
    pub jump: bool,
    /// Whether lap-progress tracking may respawn vehicles onto this curve.
    /// Carried for collaborators; no effect on geometry.
    pub respawnable: bool,
    /// Mesh template activated from this curve onward. `None` inherits the
    /// previous curve's template.
    pub template: Option<String>,
    /// Ends an alignment window: template copies are z-scaled so they tile
    /// the window exactly to this curve's end.
    pub align_meshes_to_end: bool,
    /// Terrain sculpting hints for collaborators; no effect on geometry.
    pub raise_terrain: bool,
    pub lower_terrain: bool,
    /// Force internal-face removal at template-copy boundaries on this
    /// curve, overriding the planner's visibility rules.
    pub remove_start_faces: Option<bool>,
    pub remove_end_faces: Option<bool>,
}

impl CurveDescriptor {
    /// An arc of the given length with no orientation change.
    pub fn arc(length: f32) -> Self {
        Self {
            kind: CurveKind::Arc,
            length,
            angles: Vec3::ZERO,
            bank_pivot: Vec3::ZERO,
            widening: Widening::ZERO,
            banking_interpolation: None,
            widening_interpolation: None,
            jump: false,
            respawnable: true,
            template: None,
            align_meshes_to_end: false,
            raise_terrain: false,
            lower_terrain: false,
            remove_start_faces: None,
            remove_end_faces: None,
        }
    }

    /// A bezier to `end_position` (curve-start frame) with default control
    /// point distances.
    pub fn bezier(end_position: Vec3) -> Self {
        Self {
            kind: CurveKind::Bezier {
                end_position,
                start_control: 1.0 / 3.0,
                end_control: 1.0 / 3.0,
            },
            length: 0.0,
            ..Self::arc(0.0)
        }
    }

    pub fn with_angles(mut self, angles: Vec3) -> Self {
        self.angles = angles;
        self
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, CurveKind::Arc)
    }
}
