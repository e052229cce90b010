//! Track build and incremental update
//!
//! Ties the pipeline together: derive the path, plan the layout, realize a
//! warped mesh set for every template copy, and on update reconcile the new
//! placement list against the previously built copies so unchanged ones
//! survive untouched. Identity across edits is by content hash, not index;
//! inserting a curve shifts every later copy's range but their geometric
//! state still matches and they are adopted rather than rebuilt.

use std::collections::HashMap;
use std::fmt;

use trackforge_core::{HashMethod, Result};
use trackforge_path::{CurveDescriptor, Path, Track};

use crate::host::HostServices;
use crate::layout::{plan_layout, SpacedPlacement, TemplateCopyPlacement};
use crate::reuse::{MeshKey, MeshReuseIndex, StoredMesh};
use crate::template::{MeshTemplate, TemplateGeometryCache, TemplateInfo};
use crate::warp::{warp_surface, WarpContext};

/// Everything a build call needs from its surroundings.
pub struct BuildContext<'a> {
    pub templates: &'a HashMap<String, MeshTemplate>,
    pub geometry_cache: &'a mut TemplateGeometryCache,
    pub reuse: &'a mut MeshReuseIndex,
    pub host: &'a mut dyn HostServices,
}

/// One realized template copy: its placement plus the hashes that identify
/// it across edits and the reusable meshes it references.
#[derive(Clone, Debug)]
pub struct GeneratedCopy {
    pub name: String,
    pub placement: TemplateCopyPlacement,
    /// Path-derived shape over the placement range.
    pub param_hash: i32,
    /// Spacing-group snapshot; differs when only spaced objects moved.
    pub spacing_hash: i32,
    /// World placement of the copy's start.
    pub transform_hash: i32,
    pub meshes: Vec<MeshKey>,
    /// Monotonic id assigned at creation, stable across updates. Ambiguous
    /// matches resolve to the oldest copy so repeated updates are
    /// deterministic.
    pub creation_order: u64,
}

/// The generated state of a track, carried between build and update calls.
#[derive(Clone, Debug, Default)]
pub struct BuiltTrack {
    pub copies: Vec<GeneratedCopy>,
    pub spaced: Vec<SpacedPlacement>,
    pub next_creation: u64,
}

/// What a build or update call did, for display to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub created: usize,
    pub spaced_regenerated: usize,
    pub unmodified: usize,
    pub deleted: usize,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} spacing-updated, {} unmodified, {} deleted",
            self.created, self.spaced_regenerated, self.unmodified, self.deleted
        )
    }
}

/// Hash of the path-derived state shaping a copy. Absolute position is
/// excluded (segments hash without it); two straights with the same
/// curvature profile collide intentionally.
fn param_hash(path: &Path, placement: &TemplateCopyPlacement, method: HashMethod) -> i32 {
    let mut hasher = method.hasher();
    hasher.write_rounded_f32(placement.z_scale);
    hasher.write_bool(placement.remove_start_faces);
    hasher.write_bool(placement.remove_end_faces);
    let (first, first_offset) = path.locate(placement.start_z);
    let (last, _) = path.locate(placement.end_z);
    hasher.write_rounded_f32(first_offset);
    for index in first..=last {
        path.segment(index).hash_into(hasher.as_mut());
    }
    hasher.finish()
}

/// Hash of the spacing-group snapshot, offsets relative to the copy start.
fn spacing_hash(placement: &TemplateCopyPlacement, method: HashMethod) -> i32 {
    let mut hasher = method.hasher();
    for state in &placement.spacing_snapshot {
        hasher.write_i32(state.group as i32);
        hasher.write_rounded_f32(state.next_z - placement.start_z);
        hasher.write_rounded_f32(state.spacing);
    }
    hasher.finish()
}

/// Hash of where the copy's start lands in the world.
fn transform_hash(path: &Path, placement: &TemplateCopyPlacement, method: HashMethod) -> i32 {
    let mut hasher = method.hasher();
    hasher.write_mat4(&path.params().world_transform);
    let (index, seg_z) = path.locate(placement.start_z);
    let segment = path.segment(index);
    let f = if segment.length > 0.0 {
        seg_z / segment.length
    } else {
        0.0
    };
    hasher.write_vec3(segment.position + segment.position_delta * f);
    hasher.write_vec3(segment.direction + segment.direction_delta * f);
    hasher.finish()
}

/// Unscaled copies over arc-only ranges recur across tracks and are worth
/// persisting in a shared registry; anything else is effectively unique.
fn select_for_save(curves: &[CurveDescriptor], placement: &TemplateCopyPlacement) -> bool {
    if (placement.z_scale - 1.0).abs() > 1e-5 {
        return false;
    }
    let mut z = 0.0f32;
    for curve in curves {
        let start = z;
        let end = z + curve.length;
        z = end;
        if end <= placement.start_z + 1e-4 || start >= placement.end_z - 1e-4 {
            continue;
        }
        if !curve.is_arc() {
            return false;
        }
    }
    true
}

/// Look up or warp the mesh set for one placement.
fn realize_meshes(
    template: &MeshTemplate,
    info: TemplateInfo,
    placement: &TemplateCopyPlacement,
    path: &Path,
    param: i32,
    transform: i32,
    select: bool,
    reuse: &mut MeshReuseIndex,
    host: &mut dyn HostServices,
) -> Vec<MeshKey> {
    let mut keys = Vec::with_capacity(template.surfaces.len());
    for surface in &template.surfaces {
        let key = MeshKey {
            base_mesh: surface.mesh.name.clone(),
            param_hash: param,
            transform_hash: transform,
        };
        if reuse.get(&key).is_none() {
            let warp_ctx = WarpContext {
                path,
                placement,
                info,
                banking: template.banking,
            };
            let mut mesh = warp_surface(surface, &warp_ctx);
            mesh.name = format!("{}_{:08x}", surface.mesh.name, param as u32);
            if !surface.collision {
                host.generate_secondary_uvs(&mut mesh);
            }
            let name = mesh.name.clone();
            reuse.store(
                key.clone(),
                StoredMesh {
                    mesh,
                    name,
                    select_for_save: select,
                },
            );
        }
        keys.push(key);
    }
    keys
}

/// Build a track from scratch. Every planned copy is created.
pub fn build_track(track: &mut Track, ctx: &mut BuildContext) -> Result<(BuiltTrack, BuildReport)> {
    let path = track.path()?.clone();
    let curves = track.curves().to_vec();
    let layout = plan_layout(&curves, &path, ctx.templates, ctx.geometry_cache, ctx.host)?;
    let method = ctx.reuse.method();

    let mut built = BuiltTrack {
        copies: Vec::with_capacity(layout.copies.len()),
        spaced: layout.spaced,
        next_creation: 0,
    };
    let mut report = BuildReport::default();

    for placement in layout.copies {
        let Some(template) = ctx.templates.get(&placement.template) else {
            continue;
        };
        let info = ctx.geometry_cache.info(template, ctx.host);
        let param = param_hash(&path, &placement, method);
        let spacing = spacing_hash(&placement, method);
        let transform = transform_hash(&path, &placement, method);
        let select = select_for_save(&curves, &placement);

        let creation_order = built.next_creation;
        built.next_creation += 1;
        let name = format!("{}_copy_{}", placement.template, creation_order);
        let meshes = realize_meshes(
            template, info, &placement, &path, param, transform, select, ctx.reuse, ctx.host,
        );
        ctx.host.object_created(&name);
        report.created += 1;
        built.copies.push(GeneratedCopy {
            name,
            placement,
            param_hash: param,
            spacing_hash: spacing,
            transform_hash: transform,
            meshes,
            creation_order,
        });
    }

    Ok((built, report))
}

/// Oldest unclaimed previous copy matching the new placement's hashes.
/// `spacing` of `None` relaxes the spacing tier of the match.
fn find_match(
    previous: &BuiltTrack,
    claimed: &[bool],
    placement: &TemplateCopyPlacement,
    param: i32,
    transform: i32,
    spacing: Option<i32>,
) -> Option<usize> {
    previous
        .copies
        .iter()
        .enumerate()
        .filter(|(i, c)| {
            !claimed[*i]
                && c.placement.template == placement.template
                && c.param_hash == param
                && c.transform_hash == transform
                && spacing.map_or(true, |s| c.spacing_hash == s)
        })
        .min_by_key(|(_, c)| c.creation_order)
        .map(|(i, _)| i)
}

/// Rebuild after an edit, adopting previous copies wherever their geometric
/// state still matches.
///
/// Matching is two-tier: an exact hash triple means the copy (meshes and
/// spaced objects) is untouched; matching shape and transform with a
/// different spacing snapshot keeps the meshes and regenerates only the
/// spaced objects. Everything else is created fresh, and previous copies
/// nothing claimed are destroyed.
pub fn update_track(
    track: &mut Track,
    previous: &BuiltTrack,
    ctx: &mut BuildContext,
) -> Result<(BuiltTrack, BuildReport)> {
    let path = track.path()?.clone();
    let curves = track.curves().to_vec();
    let layout = plan_layout(&curves, &path, ctx.templates, ctx.geometry_cache, ctx.host)?;
    let method = ctx.reuse.method();

    let mut claimed = vec![false; previous.copies.len()];
    let mut built = BuiltTrack {
        copies: Vec::with_capacity(layout.copies.len()),
        spaced: layout.spaced,
        next_creation: previous.next_creation,
    };
    let mut report = BuildReport::default();

    for placement in layout.copies {
        let Some(template) = ctx.templates.get(&placement.template) else {
            continue;
        };
        let info = ctx.geometry_cache.info(template, ctx.host);
        let param = param_hash(&path, &placement, method);
        let spacing = spacing_hash(&placement, method);
        let transform = transform_hash(&path, &placement, method);

        if let Some(i) = find_match(previous, &claimed, &placement, param, transform, Some(spacing))
        {
            claimed[i] = true;
            let mut copy = previous.copies[i].clone();
            copy.placement = placement;
            built.copies.push(copy);
            report.unmodified += 1;
            continue;
        }
        if let Some(i) = find_match(previous, &claimed, &placement, param, transform, None) {
            claimed[i] = true;
            let prev = &previous.copies[i];
            built.copies.push(GeneratedCopy {
                name: prev.name.clone(),
                placement,
                param_hash: param,
                spacing_hash: spacing,
                transform_hash: transform,
                meshes: prev.meshes.clone(),
                creation_order: prev.creation_order,
            });
            report.spaced_regenerated += 1;
            continue;
        }

        let select = select_for_save(&curves, &placement);
        let creation_order = built.next_creation;
        built.next_creation += 1;
        let name = format!("{}_copy_{}", placement.template, creation_order);
        let meshes = realize_meshes(
            template, info, &placement, &path, param, transform, select, ctx.reuse, ctx.host,
        );
        ctx.host.object_created(&name);
        report.created += 1;
        built.copies.push(GeneratedCopy {
            name,
            placement,
            param_hash: param,
            spacing_hash: spacing,
            transform_hash: transform,
            meshes,
            creation_order,
        });
    }

    for (i, copy) in previous.copies.iter().enumerate() {
        if !claimed[i] {
            ctx.host.object_destroyed(&copy.name);
            report.deleted += 1;
        }
    }

    let mut usage: HashMap<MeshKey, usize> = HashMap::new();
    for copy in &built.copies {
        for key in &copy.meshes {
            *usage.entry(key.clone()).or_insert(0) += 1;
        }
    }
    ctx.reuse.garbage_collect(&usage);

    Ok((built, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CollectingHost;
    use crate::mesh_data::MeshData;
    use crate::template::{MeshTemplate, SurfaceMesh};
    use glam::{Vec2, Vec3};
    use trackforge_path::PathParams;

    fn template(name: &str, length: f32) -> MeshTemplate {
        let mut mesh = MeshData::new(&format!("{}_surface", name));
        mesh.positions = vec![
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, length),
            Vec3::new(-2.0, 0.0, length),
        ];
        mesh.normals = vec![Vec3::Y; 4];
        mesh.uvs = vec![Vec2::ZERO; 4];
        mesh.indices = vec![0, 2, 1, 0, 3, 2];
        let mut t = MeshTemplate::new(name);
        t.surfaces.push(SurfaceMesh::new(mesh));
        t
    }

    struct Fixture {
        templates: HashMap<String, MeshTemplate>,
        cache: TemplateGeometryCache,
        reuse: MeshReuseIndex,
        host: CollectingHost,
    }

    impl Fixture {
        fn new() -> Self {
            let mut templates = HashMap::new();
            templates.insert("road".to_string(), template("road", 10.0));
            Self {
                templates,
                cache: TemplateGeometryCache::new(),
                reuse: MeshReuseIndex::new(HashMethod::Md5),
                host: CollectingHost::default(),
            }
        }

        fn ctx(&mut self) -> BuildContext<'_> {
            BuildContext {
                templates: &self.templates,
                geometry_cache: &mut self.cache,
                reuse: &mut self.reuse,
                host: &mut self.host,
            }
        }
    }

    fn road_track(length: f32) -> Track {
        Track::with_curves(
            PathParams::default(),
            vec![CurveDescriptor::arc(length).with_template("road")],
        )
    }

    #[test]
    fn initial_build_creates_all_copies() {
        let mut fixture = Fixture::new();
        let mut track = road_track(30.0);
        let (built, report) = build_track(&mut track, &mut fixture.ctx()).unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(built.copies.len(), 3);
        assert_eq!(fixture.host.created.len(), 3);
        // Every copy references a mesh present in the reuse index.
        for copy in &built.copies {
            for key in &copy.meshes {
                assert!(fixture.reuse.contains(key));
            }
        }
    }

    #[test]
    fn unchanged_update_touches_nothing() {
        let mut fixture = Fixture::new();
        let mut track = road_track(30.0);
        let (built, _) = build_track(&mut track, &mut fixture.ctx()).unwrap();
        let (again, report) = update_track(&mut track, &built, &mut fixture.ctx()).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.unmodified, 3);
        assert_eq!(report.deleted, 0);
        assert!(fixture.host.destroyed.is_empty());
        assert_eq!(again.copies.len(), 3);
        for (a, b) in built.copies.iter().zip(&again.copies) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.creation_order, b.creation_order);
        }
    }

    #[test]
    fn extending_the_track_keeps_existing_copies() {
        let mut fixture = Fixture::new();
        let mut track = road_track(30.0);
        let (built, _) = build_track(&mut track, &mut fixture.ctx()).unwrap();
        track.push_curve(CurveDescriptor::arc(10.0));
        let (_, report) = update_track(&mut track, &built, &mut fixture.ctx()).unwrap();
        // The old final copy showed its end cap; that position is now
        // interior, so it is rebuilt along with the appended copy.
        assert_eq!(report.created, 2);
        assert_eq!(report.unmodified, 2);
        assert_eq!(report.deleted, 1);
    }

    #[test]
    fn shortening_the_track_destroys_orphans() {
        let mut fixture = Fixture::new();
        let mut track = road_track(40.0);
        let (built, _) = build_track(&mut track, &mut fixture.ctx()).unwrap();
        if let Some(curve) = track.curve_mut(0) {
            curve.length = 20.0;
        }
        let (_, report) = update_track(&mut track, &built, &mut fixture.ctx()).unwrap();
        // The first copy survives; the new final copy shows its end cap now
        // (different shape hash), so it is created rather than adopted, and
        // three old copies go.
        assert_eq!(report.unmodified, 1);
        assert_eq!(report.created, 1);
        assert_eq!(report.deleted, 3);
        assert_eq!(fixture.host.destroyed.len(), 3);
    }

    #[test]
    fn bank_edit_rebuilds_only_affected_copies() {
        let mut fixture = Fixture::new();
        let mut track = Track::with_curves(
            PathParams::default(),
            vec![
                CurveDescriptor::arc(20.0).with_template("road"),
                CurveDescriptor::arc(10.0),
            ],
        );
        let (built, _) = build_track(&mut track, &mut fixture.ctx()).unwrap();
        // Bank the second curve; the first 20 units keep their shape.
        if let Some(curve) = track.curve_mut(1) {
            curve.angles = Vec3::new(0.0, 0.0, 45.0);
        }
        let (_, report) = update_track(&mut track, &built, &mut fixture.ctx()).unwrap();
        assert!(report.unmodified >= 1, "report: {}", report);
        assert!(report.created >= 1, "report: {}", report);
        assert_eq!(report.created, report.deleted);
    }

    #[test]
    fn spacing_edit_regenerates_spaced_only() {
        use crate::template::{SpacedObject, SpacingGroup};
        let mut fixture = Fixture::new();
        {
            let road = fixture.templates.get_mut("road").unwrap();
            road.spacing_groups.insert(
                0,
                SpacingGroup {
                    spacing_before: 2.0,
                    spacing_after: 8.0,
                },
            );
            road.spaced.push(SpacedObject {
                name: "pole".to_string(),
                group: 0,
                position: Vec3::ZERO,
                max_bank_angle: 90.0,
            });
        }
        let mut track = road_track(30.0);
        let (built, _) = build_track(&mut track, &mut fixture.ctx()).unwrap();

        let road = fixture.templates.get_mut("road").unwrap();
        if let Some(group) = road.spacing_groups.get_mut(&0) {
            group.spacing_before = 4.0;
        }
        let (_, report) = update_track(&mut track, &built, &mut fixture.ctx()).unwrap();
        assert_eq!(report.created, 0, "report: {}", report);
        assert!(report.spaced_regenerated > 0, "report: {}", report);
        assert_eq!(report.deleted, 0);
    }

    #[test]
    fn identical_straights_share_param_hash_but_not_transform() {
        let mut fixture = Fixture::new();
        let mut track = road_track(40.0);
        let (built, _) = build_track(&mut track, &mut fixture.ctx()).unwrap();
        // Interior copies share face flags and straight geometry.
        assert_eq!(built.copies[1].param_hash, built.copies[2].param_hash);
        assert_ne!(built.copies[1].transform_hash, built.copies[2].transform_hash);
    }

    #[test]
    fn only_unscaled_arc_copies_are_save_candidates() {
        let curves = vec![CurveDescriptor::arc(20.0), CurveDescriptor::bezier(Vec3::new(5.0, 0.0, 20.0))];
        let arc_copy = TemplateCopyPlacement {
            curve_index: 0,
            template: "road".to_string(),
            start_z: 0.0,
            end_z: 10.0,
            z_scale: 1.0,
            remove_start_faces: false,
            remove_end_faces: true,
            spacing_snapshot: Vec::new(),
        };
        assert!(select_for_save(&curves, &arc_copy));

        let mut over_bezier = arc_copy.clone();
        over_bezier.start_z = 18.0;
        over_bezier.end_z = 28.0;
        assert!(!select_for_save(&curves, &over_bezier));

        let mut scaled = arc_copy.clone();
        scaled.z_scale = 0.9;
        assert!(!select_for_save(&curves, &scaled));
    }

    #[test]
    fn report_formats_for_display() {
        let report = BuildReport {
            created: 0,
            spaced_regenerated: 1,
            unmodified: 7,
            deleted: 2,
        };
        assert_eq!(
            report.to_string(),
            "0 created, 1 spacing-updated, 7 unmodified, 2 deleted"
        );
    }
}
