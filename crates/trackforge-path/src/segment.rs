//! Fixed-length path segments
//!
//! A segment is one short straight slice of track. It carries enough state
//! (position, orientation, bank pivot, widening, and the deltas to the next
//! segment) to interpolate continuously at any offset within the slice, and
//! exposes the segment-local-to-track-space transform in two flavors:
//! rotation banking and shear banking.

use glam::{Mat4, Vec3, Vec4};
use trackforge_core::GeometryHasher;

use crate::curve::Widening;

/// Shear angles are clamped here to keep `tan` finite.
const MAX_SHEAR_DEGREES: f32 = 89.0;

/// Rotation matrix from Euler degrees (x pitch, y yaw, z bank), applied
/// bank first, then pitch, then yaw.
pub fn rotation_from_degrees(direction: Vec3) -> Mat4 {
    Mat4::from_rotation_y(direction.y.to_radians())
        * Mat4::from_rotation_x(direction.x.to_radians())
        * Mat4::from_rotation_z(direction.z.to_radians())
}

/// y' = y + x * shear
fn shear_y_by_x(shear: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, shear, 0.0, 0.0),
        Vec4::Y,
        Vec4::Z,
        Vec4::W,
    )
}

/// y' = y + z * shear
fn shear_y_by_z(shear: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::X,
        Vec4::Y,
        Vec4::new(0.0, shear, 1.0, 0.0),
        Vec4::W,
    )
}

/// One fixed-length slice of the sampled path.
#[derive(Clone, Debug, Default)]
pub struct PathSegment {
    /// Start position in track space.
    pub position: Vec3,
    /// Euler degrees at the start (x gradient, y turn, z bank).
    pub direction: Vec3,
    pub bank_pivot: Vec3,
    pub widening: Widening,
    pub length: f32,
    /// Deltas to the next segment, for intra-segment interpolation.
    /// Angle deltas are normalized into (-180, 180].
    pub position_delta: Vec3,
    pub direction_delta: Vec3,
    pub bank_pivot_delta: Vec3,
    pub widening_delta: Widening,
}

impl PathSegment {
    fn fraction(&self, seg_z: f32) -> f32 {
        if self.length > 0.0 {
            seg_z / self.length
        } else {
            0.0
        }
    }

    fn interpolated(&self, seg_z: f32) -> (Vec3, Vec3, Vec3) {
        let f = self.fraction(seg_z);
        (
            self.position + self.position_delta * f,
            self.direction + self.direction_delta * f,
            self.bank_pivot + self.bank_pivot_delta * f,
        )
    }

    /// Transform from the cross-section plane at `seg_z` into track space,
    /// banking via rotation. Composition: translate to the interpolated
    /// position, rotate by yaw and pitch, and rotate by bank about the bank
    /// pivot.
    pub fn segment_to_track(&self, seg_z: f32) -> Mat4 {
        let (position, direction, pivot) = self.interpolated(seg_z);
        Mat4::from_translation(position)
            * Mat4::from_rotation_y(direction.y.to_radians())
            * Mat4::from_rotation_x(direction.x.to_radians())
            * Mat4::from_translation(pivot)
            * Mat4::from_rotation_z(direction.z.to_radians())
            * Mat4::from_translation(-pivot)
    }

    /// Shear-banking variant: pitch and bank become vertical shears
    /// (angles clamped to ±89°), yaw stays a rotation. Flat templates keep
    /// their authored widths at steep bank angles this way.
    pub fn shear_segment_to_track(&self, seg_z: f32) -> Mat4 {
        let (position, direction, pivot) = self.interpolated(seg_z);
        let pitch = direction.x.clamp(-MAX_SHEAR_DEGREES, MAX_SHEAR_DEGREES);
        let bank = direction.z.clamp(-MAX_SHEAR_DEGREES, MAX_SHEAR_DEGREES);
        Mat4::from_translation(position)
            * Mat4::from_rotation_y(direction.y.to_radians())
            * shear_y_by_z(-pitch.to_radians().tan())
            * Mat4::from_translation(pivot)
            * shear_y_by_x(bank.to_radians().tan())
            * Mat4::from_translation(-pivot)
    }

    /// Widening interpolated at `seg_z`.
    pub fn widening(&self, seg_z: f32) -> Widening {
        let f = self.fraction(seg_z);
        Widening {
            left: self.widening.left + self.widening_delta.left * f,
            right: self.widening.right + self.widening_delta.right * f,
        }
    }

    /// Feed the rounded geometric state into a hash accumulator. Segments
    /// that hash identically are interchangeable for mesh reuse, so absolute
    /// position is deliberately excluded.
    pub fn hash_into(&self, hasher: &mut dyn GeometryHasher) {
        hasher.write_rounded_f32(self.length);
        hasher.write_vec3(self.direction);
        hasher.write_vec3(self.direction_delta);
        hasher.write_vec3(self.bank_pivot);
        hasher.write_vec3(self.bank_pivot_delta);
        self.widening.hash_into(hasher);
        self.widening_delta.hash_into(hasher);
    }
}
