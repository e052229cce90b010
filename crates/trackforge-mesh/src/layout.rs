//! Template layout planning
//!
//! Single pass over the curve list that decides where template copies go.
//! Two intertwined concerns: tiling template-length slices along the track
//! (with optional end-alignment z-scaling per window, and gaps at jump
//! curves), and stepping spacing groups forward to place periodic props.
//! Placements are transient; a fresh set is produced on every layout pass
//! and never persisted.

use std::collections::{BTreeMap, HashMap};

use trackforge_core::{Result, TrackError};
use trackforge_path::{CurveDescriptor, Path};

use crate::host::HostServices;
use crate::template::{MeshTemplate, TemplateGeometryCache, MAX_SPACING_GROUPS};

/// Ceiling on emitted template copies; pathological input trips this
/// instead of hanging.
const MAX_COPIES: usize = 100_000;

/// Tolerance for "this copy starts exactly where the previous one ends".
const CONTIGUITY_EPSILON: f32 = 1e-3;

/// Live state of one spacing group during layout.
#[derive(Clone, Debug, PartialEq)]
pub struct SpacingState {
    pub group: usize,
    /// Absolute path z of the next placement point.
    pub next_z: f32,
    pub spacing: f32,
}

/// One template copy tiled onto a path sub-range [start_z, end_z).
#[derive(Clone, Debug)]
pub struct TemplateCopyPlacement {
    /// Curve containing `start_z`.
    pub curve_index: usize,
    pub template: String,
    pub start_z: f32,
    pub end_z: f32,
    /// 1.0 unless the alignment window scaled copies to tile exactly.
    pub z_scale: f32,
    /// Whether the boundary cap faces are internal and should be dropped.
    pub remove_start_faces: bool,
    pub remove_end_faces: bool,
    /// Private snapshot of all active spacing groups at `start_z`, so a
    /// partial regeneration of just this copy replays deterministically.
    pub spacing_snapshot: Vec<SpacingState>,
}

impl TemplateCopyPlacement {
    pub fn length(&self) -> f32 {
        self.end_z - self.start_z
    }
}

/// One periodic prop placement.
#[derive(Clone, Debug)]
pub struct SpacedPlacement {
    pub template: String,
    pub object: String,
    pub group: usize,
    /// Absolute path z of the placement point.
    pub z: f32,
}

/// Output of one layout pass.
#[derive(Clone, Debug, Default)]
pub struct LayoutResult {
    pub copies: Vec<TemplateCopyPlacement>,
    pub spaced: Vec<SpacedPlacement>,
}

/// Interpolated bank angle at an absolute path offset, degrees.
fn bank_angle_at(path: &Path, z: f32) -> f32 {
    let (index, seg_z) = path.locate(z);
    let segment = path.segment(index);
    let f = if segment.length > 0.0 {
        seg_z / segment.length
    } else {
        0.0
    };
    segment.direction.z + segment.direction_delta.z * f
}

/// Plan template-copy and spaced-object placements along the path.
pub fn plan_layout(
    curves: &[CurveDescriptor],
    path: &Path,
    templates: &HashMap<String, MeshTemplate>,
    cache: &mut TemplateGeometryCache,
    host: &mut dyn HostServices,
) -> Result<LayoutResult> {
    let mut result = LayoutResult::default();
    if curves.is_empty() {
        return Ok(result);
    }
    if curves.iter().all(|c| c.jump) {
        // A jump-only track tiles nothing and, when looped, would chase its
        // own tail forever.
        host.error("track consists entirely of jump curves; nothing to lay out");
        return Ok(result);
    }

    // Absolute path z at each curve's start.
    let mut starts = Vec::with_capacity(curves.len());
    let mut z = 0.0f32;
    for curve in curves {
        starts.push(z);
        z += curve.length;
    }
    let track_end = z;
    let segment_length = path.params().segment_length;

    let mut active_template: Option<String> = None;
    // BTreeMap keeps spacing-group iteration (and snapshots) deterministic.
    let mut groups: BTreeMap<usize, SpacingState> = BTreeMap::new();
    let mut mesh_z = 0.0f32;
    let mut index = 0;

    while index < curves.len() {
        let curve = &curves[index];
        let curve_end = starts[index] + curve.length;

        if curve.jump {
            // No placements over the gap; offsets advance to its end so
            // tiling and spacing re-align past it.
            mesh_z = mesh_z.max(curve_end);
            for state in groups.values_mut() {
                if state.next_z < curve_end {
                    state.next_z = curve_end;
                }
            }
            index += 1;
            continue;
        }

        if let Some(name) = &curve.template {
            active_template = Some(name.clone());
        }
        let Some(template_name) = active_template.clone() else {
            mesh_z = mesh_z.max(curve_end);
            index += 1;
            continue;
        };
        let Some(template) = templates.get(&template_name) else {
            host.error(&format!(
                "curve {}: template '{}' not found, curve skipped",
                index, template_name
            ));
            mesh_z = mesh_z.max(curve_end);
            index += 1;
            continue;
        };

        // Window: curves from here until an explicit end-alignment, a jump,
        // a template switch, or track end.
        let mut aligned = false;
        let mut window_end = track_end;
        let mut next_index = index;
        while next_index < curves.len() {
            let c = &curves[next_index];
            if c.jump {
                window_end = starts[next_index];
                break;
            }
            if next_index > index
                && c.template.as_deref().is_some_and(|t| t != template_name)
            {
                window_end = starts[next_index];
                break;
            }
            if c.align_meshes_to_end {
                aligned = true;
                window_end = starts[next_index] + c.length;
                next_index += 1;
                break;
            }
            next_index += 1;
        }

        activate_spacing_groups(
            template,
            &mut groups,
            mesh_z.max(starts[index]),
            segment_length,
            host,
        );

        let info = cache.info(template, host);
        let template_length = info.length();
        mesh_z = mesh_z.max(starts[index]);
        let remaining = window_end - mesh_z;
        let z_scale = if aligned && remaining > 0.0 {
            let count = (remaining / template_length).round().max(1.0);
            remaining / (count * template_length)
        } else {
            1.0
        };
        let copy_length = template_length * z_scale;

        while mesh_z < window_end - CONTIGUITY_EPSILON {
            let start_z = mesh_z;
            let end_z = start_z + copy_length;
            let curve_index = curve_at(&starts, start_z);

            // Snapshot before stepping so a replay of this copy regenerates
            // exactly the spaced objects it owns.
            let snapshot: Vec<SpacingState> = groups.values().cloned().collect();
            step_spacing_groups(
                &mut groups,
                template,
                path,
                start_z,
                end_z,
                &mut result.spaced,
            );

            result.copies.push(TemplateCopyPlacement {
                curve_index,
                template: template_name.clone(),
                start_z,
                end_z,
                z_scale,
                remove_start_faces: true,
                remove_end_faces: true,
                spacing_snapshot: snapshot,
            });
            if result.copies.len() > MAX_COPIES {
                return Err(TrackError::RunawayGuard(format!(
                    "layout exceeded {} template copies",
                    MAX_COPIES
                )));
            }
            mesh_z = end_z;
        }

        index = next_index.max(index + 1);
    }

    resolve_face_visibility(&mut result.copies, curves);
    Ok(result)
}

/// Activate groups this template declares that are not yet running.
fn activate_spacing_groups(
    template: &MeshTemplate,
    groups: &mut BTreeMap<usize, SpacingState>,
    at_z: f32,
    segment_length: f32,
    host: &mut dyn HostServices,
) {
    for object in &template.spaced {
        if object.group >= MAX_SPACING_GROUPS {
            host.error(&format!(
                "template '{}' object '{}': spacing group {} out of range (0..{}), skipped",
                template.name, object.name, object.group, MAX_SPACING_GROUPS
            ));
            continue;
        }
        if groups.contains_key(&object.group) {
            continue;
        }
        let Some(config) = template.spacing_groups.get(&object.group) else {
            host.error(&format!(
                "template '{}' object '{}': spacing group {} not declared, skipped",
                template.name, object.name, object.group
            ));
            continue;
        };
        let spacing = config.spacing();
        if spacing < segment_length {
            host.error(&format!(
                "template '{}': spacing group {} spacing {} is smaller than the sampling step {}, skipped",
                template.name, object.group, spacing, segment_length
            ));
            continue;
        }
        groups.insert(
            object.group,
            SpacingState {
                group: object.group,
                next_z: at_z + config.spacing_before,
                spacing,
            },
        );
    }
}

/// Step all groups across [start_z, end_z), emitting placements for the
/// template's spaced objects at each point passed.
fn step_spacing_groups(
    groups: &mut BTreeMap<usize, SpacingState>,
    template: &MeshTemplate,
    path: &Path,
    start_z: f32,
    end_z: f32,
    out: &mut Vec<SpacedPlacement>,
) {
    for state in groups.values_mut() {
        while state.next_z < end_z - 1e-6 {
            if state.next_z >= start_z {
                let bank = bank_angle_at(path, state.next_z);
                for object in template.spaced.iter().filter(|o| o.group == state.group) {
                    if bank.abs() <= object.max_bank_angle {
                        out.push(SpacedPlacement {
                            template: template.name.clone(),
                            object: object.name.clone(),
                            group: state.group,
                            z: state.next_z,
                        });
                    }
                }
            }
            state.next_z += state.spacing;
        }
    }
}

fn curve_at(starts: &[f32], z: f32) -> usize {
    match starts.iter().rposition(|&s| s <= z + 1e-6) {
        Some(i) => i,
        None => 0,
    }
}

/// A slice's cap faces are internal (removed) exactly where another copy of
/// the same template continues seamlessly; track start/end, template
/// switches and jump gaps keep theirs. Curve-level overrides then force
/// either way.
fn resolve_face_visibility(copies: &mut [TemplateCopyPlacement], curves: &[CurveDescriptor]) {
    let n = copies.len();
    for i in 0..n {
        let continues_before = i > 0
            && copies[i - 1].template == copies[i].template
            && (copies[i - 1].end_z - copies[i].start_z).abs() < CONTIGUITY_EPSILON;
        let continues_after = i + 1 < n
            && copies[i + 1].template == copies[i].template
            && (copies[i].end_z - copies[i + 1].start_z).abs() < CONTIGUITY_EPSILON;

        let copy = &mut copies[i];
        copy.remove_start_faces = continues_before;
        copy.remove_end_faces = continues_after;

        if let Some(curve) = curves.get(copy.curve_index) {
            if let Some(force) = curve.remove_start_faces {
                copy.remove_start_faces = force;
            }
            if let Some(force) = curve.remove_end_faces {
                copy.remove_end_faces = force;
            }
        }
    }
}
