//! Mesh templates and geometry metadata caching
//!
//! A template is an authored mesh prefab warped repeatedly along the path.
//! Its "continuous" surfaces tile the track (road, barriers); its "spaced"
//! objects repeat periodically (support poles) under spacing-group rules.
//! Measuring a template's Z extents walks every surface mesh, so measured
//! results are cached per template name.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3};

use crate::host::HostServices;
use crate::mesh_data::MeshData;

/// Spacing group indices live in 0..MAX_SPACING_GROUPS.
pub const MAX_SPACING_GROUPS: usize = 16;

/// How a template's cross-section follows bank angle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BankingMode {
    /// Rotate the cross-section (true roll).
    #[default]
    Rotate,
    /// Shear vertically instead; flat templates keep their widths at steep
    /// bank angles.
    Shear,
}

/// A horizontal span of the cross-section that stretches under widening.
/// Geometry outside every range translates rigidly; geometry between two
/// ranges is left alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WidenRange {
    pub min_x: f32,
    pub max_x: f32,
}

/// Where a generated UV coordinate reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordSource {
    TrackX,
    TrackY,
    TrackZ,
    WorldX,
    WorldY,
    WorldZ,
}

/// Recomputes UVs for faces that point in a particular axis direction
/// (e.g. project the road surface's top faces from above).
#[derive(Clone, Debug)]
pub struct UvGenerator {
    /// Axis-aligned facing direction a triangle normal must match.
    pub facing: Vec3,
    /// Cone half-angle in degrees for the match.
    pub max_angle: f32,
    pub source_u: CoordSource,
    pub source_v: CoordSource,
    /// Rotation applied to the (u, v) pair, degrees.
    pub rotation: f32,
    pub scale: Vec2,
    pub offset: Vec2,
}

impl UvGenerator {
    /// Whether a (world-space) triangle normal falls inside the cone.
    pub fn matches(&self, normal: Vec3) -> bool {
        let facing = self.facing.normalize_or_zero();
        normal.normalize_or_zero().dot(facing) >= self.max_angle.to_radians().cos()
    }
}

/// One continuous (tiled) mesh subtree of a template.
#[derive(Clone, Debug)]
pub struct SurfaceMesh {
    pub mesh: MeshData,
    /// Collision surfaces skip normals, tangents and UV generation.
    pub collision: bool,
    /// Mesh space to template space.
    pub template_from_mesh: Mat4,
    pub widen_ranges: Vec<WidenRange>,
    pub uv_generator: Option<UvGenerator>,
}

impl SurfaceMesh {
    pub fn new(mesh: MeshData) -> Self {
        Self {
            mesh,
            collision: false,
            template_from_mesh: Mat4::IDENTITY,
            widen_ranges: Vec::new(),
            uv_generator: None,
        }
    }
}

/// Periodic-placement rule: one placement every `before + after` units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpacingGroup {
    pub spacing_before: f32,
    pub spacing_after: f32,
}

impl SpacingGroup {
    pub fn spacing(&self) -> f32 {
        self.spacing_before + self.spacing_after
    }
}

/// A prop repeated along the track under a spacing group.
#[derive(Clone, Debug)]
pub struct SpacedObject {
    pub name: String,
    pub group: usize,
    /// Template-space offset of the prop at each placement point.
    pub position: Vec3,
    /// Placement is suppressed where |bank| exceeds this, degrees.
    pub max_bank_angle: f32,
}

/// An authored mesh prefab warped along the path.
#[derive(Clone, Debug)]
pub struct MeshTemplate {
    pub name: String,
    /// Manual Z extent overrides; measured from surfaces when `None`.
    pub min_z: Option<f32>,
    pub max_z: Option<f32>,
    pub banking: BankingMode,
    pub surfaces: Vec<SurfaceMesh>,
    pub spaced: Vec<SpacedObject>,
    pub spacing_groups: HashMap<usize, SpacingGroup>,
}

impl MeshTemplate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min_z: None,
            max_z: None,
            banking: BankingMode::default(),
            surfaces: Vec::new(),
            spaced: Vec::new(),
            spacing_groups: HashMap::new(),
        }
    }
}

/// Measured per-template metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateInfo {
    pub min_z: f32,
    pub max_z: f32,
}

impl TemplateInfo {
    pub fn length(&self) -> f32 {
        self.max_z - self.min_z
    }
}

/// Cache of measured template metadata, keyed by template name.
///
/// Owned by whichever top-level build call constructs it and passed by
/// reference into the core; there is no ambient global cache.
#[derive(Debug, Default)]
pub struct TemplateGeometryCache {
    infos: HashMap<String, TemplateInfo>,
}

impl TemplateGeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.infos.clear();
    }

    /// Measured (or manually overridden) Z extents for a template.
    ///
    /// A template whose measured length comes out non-positive is forced to
    /// length 1.0 so tiling can never loop forever; this is a safety clamp,
    /// not a correctness guarantee, and is reported as a warning.
    pub fn info(&mut self, template: &MeshTemplate, host: &mut dyn HostServices) -> TemplateInfo {
        if let Some(info) = self.infos.get(&template.name) {
            return *info;
        }
        let info = measure(template, host);
        self.infos.insert(template.name.clone(), info);
        info
    }
}

fn measure(template: &MeshTemplate, host: &mut dyn HostServices) -> TemplateInfo {
    let mut min_z = f32::MAX;
    let mut max_z = f32::MIN;
    for surface in &template.surfaces {
        if surface.mesh.is_empty() {
            host.warning(&format!(
                "template '{}' surface '{}' has no geometry, skipped in measurement",
                template.name, surface.mesh.name
            ));
            continue;
        }
        for p in &surface.mesh.positions {
            let z = surface.template_from_mesh.transform_point3(*p).z;
            min_z = min_z.min(z);
            max_z = max_z.max(z);
        }
    }
    if min_z > max_z {
        min_z = 0.0;
        max_z = 0.0;
    }

    let mut info = TemplateInfo {
        min_z: template.min_z.unwrap_or(min_z),
        max_z: template.max_z.unwrap_or(max_z),
    };
    if info.length() <= 0.0 {
        host.warning(&format!(
            "template '{}' has non-positive length, clamped to 1.0",
            template.name
        ));
        info.max_z = info.min_z + 1.0;
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CollectingHost;

    fn strip(name: &str, length: f32) -> MeshData {
        let mut mesh = MeshData::new(name);
        mesh.positions = vec![
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, length),
            Vec3::new(-1.0, 0.0, length),
        ];
        mesh.normals = vec![Vec3::Y; 4];
        mesh.uvs = vec![Vec2::ZERO; 4];
        mesh.indices = vec![0, 2, 1, 0, 3, 2];
        mesh
    }

    #[test]
    fn measures_z_extent_across_surfaces() {
        let mut template = MeshTemplate::new("road");
        template.surfaces.push(SurfaceMesh::new(strip("a", 10.0)));
        let mut offset = SurfaceMesh::new(strip("b", 4.0));
        offset.template_from_mesh = Mat4::from_translation(Vec3::new(0.0, 0.0, 8.0));
        template.surfaces.push(offset);

        let mut cache = TemplateGeometryCache::new();
        let mut host = CollectingHost::default();
        let info = cache.info(&template, &mut host);
        assert_eq!(info.min_z, 0.0);
        assert_eq!(info.max_z, 12.0);
        assert!(host.warnings.is_empty());
    }

    #[test]
    fn manual_extents_override_measurement() {
        let mut template = MeshTemplate::new("road");
        template.surfaces.push(SurfaceMesh::new(strip("a", 10.0)));
        template.min_z = Some(1.0);
        template.max_z = Some(5.0);

        let mut cache = TemplateGeometryCache::new();
        let mut host = CollectingHost::default();
        let info = cache.info(&template, &mut host);
        assert_eq!(info.length(), 4.0);
    }

    #[test]
    fn zero_length_template_is_clamped_with_warning() {
        let template = MeshTemplate::new("empty");
        let mut cache = TemplateGeometryCache::new();
        let mut host = CollectingHost::default();
        let info = cache.info(&template, &mut host);
        assert_eq!(info.length(), 1.0);
        assert_eq!(host.warnings.len(), 1);
    }

    #[test]
    fn measurement_is_cached() {
        let mut template = MeshTemplate::new("road");
        template.surfaces.push(SurfaceMesh::new(strip("a", 10.0)));
        let mut cache = TemplateGeometryCache::new();
        let mut host = CollectingHost::default();
        let first = cache.info(&template, &mut host);
        // Mutating the template does not re-measure until the cache is cleared.
        template.surfaces.clear();
        assert_eq!(cache.info(&template, &mut host), first);
        cache.clear();
        assert_ne!(cache.info(&template, &mut host), first);
    }

    #[test]
    fn uv_generator_cone_match() {
        let generator = UvGenerator {
            facing: Vec3::Y,
            max_angle: 30.0,
            source_u: CoordSource::TrackX,
            source_v: CoordSource::TrackZ,
            rotation: 0.0,
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
        };
        assert!(generator.matches(Vec3::Y));
        assert!(generator.matches(Vec3::new(0.2, 1.0, 0.0).normalize()));
        assert!(!generator.matches(Vec3::X));
        assert!(!generator.matches(-Vec3::Y));
    }
}
