//! Template mesh warping
//!
//! Bends a template surface mesh along the sampled path. Each vertex maps
//! through template space to an absolute path offset, picks up the widening
//! and banking of the segment there, and lands in world space via the
//! cross-section transform. Warping is pure; it reads the path and placement
//! and produces fresh buffers.

use glam::{Vec2, Vec3};

use trackforge_path::Path;

use crate::layout::TemplateCopyPlacement;
use crate::mesh_data::MeshData;
use crate::template::{
    BankingMode, CoordSource, SurfaceMesh, TemplateInfo, UvGenerator, WidenRange,
};

/// Cap-face classification tolerance: a triangle counts as a boundary cap
/// when all its template-space z values sit within this of the extent.
const FACE_EPSILON: f32 = 1e-3;

/// Everything a single surface warp needs to know about its surroundings.
pub struct WarpContext<'a> {
    pub path: &'a Path,
    pub placement: &'a TemplateCopyPlacement,
    /// Measured extents of the template the placement instantiates.
    pub info: TemplateInfo,
    pub banking: BankingMode,
}

impl WarpContext<'_> {
    /// Absolute path offset a template-space z maps to.
    fn path_z(&self, template_z: f32) -> f32 {
        (template_z - self.info.min_z) * self.placement.z_scale + self.placement.start_z
    }
}

/// Horizontal widening remap of a template-space x coordinate.
///
/// Geometry inside a widen range stretches across it; geometry outside the
/// union of ranges translates rigidly with the nearer edge; geometry between
/// two ranges stays put. No ranges means the surface ignores widening.
fn widen_x(x: f32, ranges: &[WidenRange], left: f32, right: f32) -> f32 {
    if ranges.is_empty() {
        return x;
    }
    let mut union_min = f32::MAX;
    let mut union_max = f32::MIN;
    for range in ranges {
        union_min = union_min.min(range.min_x);
        union_max = union_max.max(range.max_x);
        if x >= range.min_x && x <= range.max_x {
            let span = range.max_x - range.min_x;
            let f = if span > 0.0 { (x - range.min_x) / span } else { 0.0 };
            let new_min = range.min_x - left;
            let new_max = range.max_x + right;
            return new_min + (new_max - new_min) * f;
        }
    }
    if x < union_min {
        x - left
    } else if x > union_max {
        x + right
    } else {
        x
    }
}

/// Warp one template surface into world space for a placement.
///
/// Collision surfaces skip normals, UV generation and tangents. The caller
/// is responsible for naming and registering the produced mesh.
pub fn warp_surface(surface: &SurfaceMesh, ctx: &WarpContext) -> MeshData {
    let world_from_track = ctx.path.params().world_transform;
    let source = &surface.mesh;

    let mut out = MeshData::new(&source.name);
    out.indices = filter_cap_faces(surface, ctx);
    out.uvs = source.uvs.clone();

    let count = source.positions.len();
    out.positions = Vec::with_capacity(count);
    let has_normals = !surface.collision && source.normals.len() == count;
    if has_normals {
        out.normals = Vec::with_capacity(count);
    }

    // Track-space positions are kept alongside world positions; generated
    // UVs can read from either frame.
    let mut track_positions = Vec::with_capacity(count);

    for (i, p) in source.positions.iter().enumerate() {
        let template_pos = surface.template_from_mesh.transform_point3(*p);
        let z_abs = ctx.path_z(template_pos.z);
        let (index, seg_z) = ctx.path.locate(z_abs);
        let segment = ctx.path.segment(index);

        let widening = segment.widening(seg_z);
        let x = widen_x(
            template_pos.x,
            &surface.widen_ranges,
            widening.left,
            widening.right,
        );
        let cross = Vec3::new(x, template_pos.y, 0.0);

        let section_to_track = match ctx.banking {
            BankingMode::Rotate => segment.segment_to_track(seg_z),
            BankingMode::Shear => segment.shear_segment_to_track(seg_z),
        };
        let track_pos = section_to_track.transform_point3(cross);
        track_positions.push(track_pos);
        out.positions.push(world_from_track.transform_point3(track_pos));

        if has_normals {
            let template_normal = surface
                .template_from_mesh
                .transform_vector3(source.normals[i]);
            let normal = world_from_track
                .transform_vector3(section_to_track.transform_vector3(template_normal));
            out.normals.push(normal.normalize_or_zero());
        }
    }

    if !surface.collision {
        if let Some(generator) = &surface.uv_generator {
            project_uvs(&mut out, &track_positions, generator);
        }
        out.recalculate_tangents();
    }
    out.recalculate_bounds();
    out
}

/// Drop boundary cap triangles the placement marks internal. A triangle is
/// a start (end) cap when every vertex lies at the template's min (max) z.
fn filter_cap_faces(surface: &SurfaceMesh, ctx: &WarpContext) -> Vec<u32> {
    let remove_start = ctx.placement.remove_start_faces;
    let remove_end = ctx.placement.remove_end_faces;
    if !remove_start && !remove_end {
        return surface.mesh.indices.clone();
    }

    let start_cutoff = ctx.info.min_z + FACE_EPSILON;
    let end_cutoff = ctx.info.max_z - FACE_EPSILON;
    let template_z = |index: u32| -> f32 {
        surface
            .template_from_mesh
            .transform_point3(surface.mesh.positions[index as usize])
            .z
    };

    let mut kept = Vec::with_capacity(surface.mesh.indices.len());
    for tri in surface.mesh.indices.chunks_exact(3) {
        let zs = [template_z(tri[0]), template_z(tri[1]), template_z(tri[2])];
        let at_start = zs.iter().all(|&z| z <= start_cutoff);
        let at_end = zs.iter().all(|&z| z >= end_cutoff);
        if (remove_start && at_start) || (remove_end && at_end) {
            continue;
        }
        kept.extend_from_slice(tri);
    }
    kept
}

fn coord(source: CoordSource, track: Vec3, world: Vec3) -> f32 {
    match source {
        CoordSource::TrackX => track.x,
        CoordSource::TrackY => track.y,
        CoordSource::TrackZ => track.z,
        CoordSource::WorldX => world.x,
        CoordSource::WorldY => world.y,
        CoordSource::WorldZ => world.z,
    }
}

/// Overwrite UVs on faces whose warped normal falls in the generator's cone.
/// Runs after warping so curvature-stretched faces get evenly projected
/// coordinates instead of stretched authored ones.
fn project_uvs(mesh: &mut MeshData, track_positions: &[Vec3], generator: &UvGenerator) {
    let (sin, cos) = generator.rotation.to_radians().sin_cos();
    let indices = mesh.indices.clone();
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face_normal = (mesh.positions[i1] - mesh.positions[i0])
            .cross(mesh.positions[i2] - mesh.positions[i0])
            .normalize_or_zero();
        if !generator.matches(face_normal) {
            continue;
        }
        for &i in &[i0, i1, i2] {
            let u = coord(generator.source_u, track_positions[i], mesh.positions[i]);
            let v = coord(generator.source_v, track_positions[i], mesh.positions[i]);
            let rotated = Vec2::new(u * cos - v * sin, u * sin + v * cos);
            mesh.uvs[i] = rotated * generator.scale + generator.offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::SurfaceMesh;
    use glam::Vec2;
    use trackforge_path::{CurveDescriptor, PathParams, Track};

    fn strip(length: f32, slices: usize) -> MeshData {
        // A ribbon of quads along +Z, 4 units wide, with caps at both ends
        // marked by their z extents.
        let mut mesh = MeshData::new("strip");
        for s in 0..=slices {
            let z = length * s as f32 / slices as f32;
            mesh.positions.push(Vec3::new(-2.0, 0.0, z));
            mesh.positions.push(Vec3::new(2.0, 0.0, z));
            mesh.normals.push(Vec3::Y);
            mesh.normals.push(Vec3::Y);
            mesh.uvs.push(Vec2::new(0.0, z));
            mesh.uvs.push(Vec2::new(1.0, z));
        }
        for s in 0..slices as u32 {
            let base = s * 2;
            mesh.indices
                .extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);
        }
        mesh
    }

    fn straight_path(length: f32) -> Path {
        let mut track =
            Track::with_curves(PathParams::default(), vec![CurveDescriptor::arc(length)]);
        track.path().unwrap().clone()
    }

    fn banked_path(length: f32, bank: f32) -> Path {
        let mut first = CurveDescriptor::arc(1.0);
        first.angles = Vec3::new(0.0, 0.0, bank);
        let mut track = Track::with_curves(
            PathParams::default(),
            vec![first, CurveDescriptor::arc(length)],
        );
        track.path().unwrap().clone()
    }

    fn placement(start_z: f32, end_z: f32, z_scale: f32) -> TemplateCopyPlacement {
        TemplateCopyPlacement {
            curve_index: 0,
            template: "road".to_string(),
            start_z,
            end_z,
            z_scale,
            remove_start_faces: false,
            remove_end_faces: false,
            spacing_snapshot: Vec::new(),
        }
    }

    fn info(max_z: f32) -> TemplateInfo {
        TemplateInfo {
            min_z: 0.0,
            max_z,
        }
    }

    #[test]
    fn straight_flat_path_is_identity() {
        let path = straight_path(20.0);
        let surface = SurfaceMesh::new(strip(10.0, 4));
        let p = placement(0.0, 10.0, 1.0);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        for (a, b) in warped.positions.iter().zip(&surface.mesh.positions) {
            assert!((*a - *b).length() < 1e-4, "{:?} vs {:?}", a, b);
        }
        for n in &warped.normals {
            assert!((*n - Vec3::Y).length() < 1e-4);
        }
    }

    #[test]
    fn placement_offset_shifts_along_path() {
        let path = straight_path(40.0);
        let surface = SurfaceMesh::new(strip(10.0, 2));
        let p = placement(10.0, 20.0, 1.0);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        assert!((warped.positions[0].z - 10.0).abs() < 1e-4);
        assert!((warped.positions.last().unwrap().z - 20.0).abs() < 1e-4);
    }

    #[test]
    fn z_scale_compresses_template_depth() {
        let path = straight_path(40.0);
        let surface = SurfaceMesh::new(strip(10.0, 2));
        let p = placement(0.0, 8.0, 0.8);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        assert!((warped.positions.last().unwrap().z - 8.0).abs() < 1e-4);
    }

    #[test]
    fn rotate_banking_narrows_horizontal_extent() {
        let path = banked_path(20.0, 60.0);
        let surface = SurfaceMesh::new(strip(10.0, 4));
        let p = placement(5.0, 15.0, 1.0);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        // At 60° the rotated 4-unit cross-section spans 4·cos60 = 2 in x.
        let (min_x, max_x) = warped
            .positions
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        assert!((max_x - min_x - 2.0).abs() < 0.05);
    }

    #[test]
    fn shear_banking_preserves_horizontal_extent() {
        let path = banked_path(20.0, 60.0);
        let surface = SurfaceMesh::new(strip(10.0, 4));
        let p = placement(5.0, 15.0, 1.0);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Shear,
        };
        let warped = warp_surface(&surface, &ctx);
        let (min_x, max_x) = warped
            .positions
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        assert!((max_x - min_x - 4.0).abs() < 0.05);
    }

    #[test]
    fn widen_range_stretches_only_inside() {
        let ranges = [WidenRange {
            min_x: -1.0,
            max_x: 1.0,
        }];
        // Inside the range: endpoints move to the widened edges.
        assert!((widen_x(-1.0, &ranges, 0.5, 0.25) - -1.5).abs() < 1e-6);
        assert!((widen_x(1.0, &ranges, 0.5, 0.25) - 1.25).abs() < 1e-6);
        assert!((widen_x(0.0, &ranges, 0.5, 0.25) - -0.125).abs() < 1e-5);
        // Outside: rigid translation with the nearer edge.
        assert!((widen_x(-2.0, &ranges, 0.5, 0.25) - -2.5).abs() < 1e-6);
        assert!((widen_x(2.0, &ranges, 0.5, 0.25) - 2.25).abs() < 1e-6);
    }

    #[test]
    fn between_two_ranges_is_untouched() {
        let ranges = [
            WidenRange {
                min_x: -3.0,
                max_x: -2.0,
            },
            WidenRange {
                min_x: 2.0,
                max_x: 3.0,
            },
        ];
        assert_eq!(widen_x(0.0, &ranges, 1.0, 1.0), 0.0);
        assert!((widen_x(-4.0, &ranges, 1.0, 1.0) - -5.0).abs() < 1e-6);
        assert!((widen_x(4.0, &ranges, 1.0, 1.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn cap_faces_removed_per_flags() {
        // Add explicit vertical cap quads at both ends of the ribbon.
        let mut mesh = strip(10.0, 2);
        let base = mesh.positions.len() as u32;
        for &(z, x) in &[(0.0, -2.0), (0.0, 2.0), (10.0, -2.0), (10.0, 2.0)] {
            mesh.positions.push(Vec3::new(x, 1.0, z));
            mesh.normals.push(Vec3::Z);
            mesh.uvs.push(Vec2::ZERO);
        }
        // start cap uses the ribbon's first two verts (z = 0)
        mesh.indices.extend_from_slice(&[0, 1, base]);
        mesh.indices.extend_from_slice(&[1, base + 1, base]);
        let tail = 2 * 2; // first vertex of the last slice (z = 10)
        mesh.indices.extend_from_slice(&[tail, base + 2, tail + 1]);
        mesh.indices
            .extend_from_slice(&[tail + 1, base + 2, base + 3]);
        let full = mesh.triangle_count();
        let surface = SurfaceMesh::new(mesh);
        let path = straight_path(20.0);

        let mut p = placement(0.0, 10.0, 1.0);
        p.remove_start_faces = true;
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        assert_eq!(warped.triangle_count(), full - 2);

        p.remove_end_faces = true;
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        assert_eq!(warped.triangle_count(), full - 4);
    }

    #[test]
    fn uv_generator_projects_matching_faces() {
        let path = straight_path(40.0);
        let mut surface = SurfaceMesh::new(strip(10.0, 2));
        surface.uv_generator = Some(UvGenerator {
            facing: Vec3::Y,
            max_angle: 30.0,
            source_u: CoordSource::TrackX,
            source_v: CoordSource::TrackZ,
            rotation: 0.0,
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
        });
        let p = placement(10.0, 20.0, 1.0);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        // Top faces project from track coordinates: u = x, v = absolute z.
        assert!((warped.uvs[0] - Vec2::new(-2.0, 10.0)).length() < 1e-3);
        let last = warped.uvs.len() - 1;
        assert!((warped.uvs[last] - Vec2::new(2.0, 20.0)).length() < 1e-3);
    }

    #[test]
    fn collision_surface_carries_no_normals_or_tangents() {
        let path = straight_path(20.0);
        let mut surface = SurfaceMesh::new(strip(10.0, 2));
        surface.collision = true;
        let p = placement(0.0, 10.0, 1.0);
        let ctx = WarpContext {
            path: &path,
            placement: &p,
            info: info(10.0),
            banking: BankingMode::Rotate,
        };
        let warped = warp_surface(&surface, &ctx);
        assert!(warped.normals.is_empty());
        assert!(warped.tangents.is_empty());
        assert_eq!(warped.positions.len(), surface.mesh.positions.len());
    }
}
