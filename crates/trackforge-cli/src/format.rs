//! Track file format definitions
//!
//! A track is authored as a single TOML file: metadata, path settings, an
//! ordered curve list and the templates it references. Template surfaces
//! are described as 2D cross-section profiles extruded along +Z; the CLI
//! synthesizes mesh buffers from them so a track file is self-contained.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use trackforge_core::{HashMethod, Interpolation};
use trackforge_mesh::{
    BankingMode, CoordSource, MeshData, MeshTemplate, SpacedObject, SpacingGroup, SurfaceMesh,
    UvGenerator, WidenRange,
};
use trackforge_path::{CurveDescriptor, Overrun, PathParams, Track, Widening};

/// Root structure of a track TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFile {
    pub track: TrackMetadata,
    #[serde(default)]
    pub path: PathSettings,
    #[serde(default)]
    pub curves: Vec<CurveDef>,
    #[serde(default)]
    pub templates: HashMap<String, TemplateDef>,
}

/// Track metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hash_method: HashMethod,
}

/// Path-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_segment_length")]
    pub segment_length: f32,
    #[serde(default)]
    pub start_position: [f32; 3],
    #[serde(default)]
    pub start_direction: [f32; 3],
    #[serde(default = "Interpolation::default")]
    pub banking_interpolation: Interpolation,
    #[serde(default = "default_linear")]
    pub widening_interpolation: Interpolation,
    /// Closed tracks wrap the path past its end instead of extrapolating.
    #[serde(default)]
    pub closed: bool,
    /// Vertical nudge per wrap on closed tracks.
    #[serde(default)]
    pub loop_y_offset: f32,
}

fn default_segment_length() -> f32 {
    0.25
}

fn default_linear() -> Interpolation {
    Interpolation::Linear
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            segment_length: default_segment_length(),
            start_position: [0.0; 3],
            start_direction: [0.0; 3],
            banking_interpolation: Interpolation::default(),
            widening_interpolation: Interpolation::Linear,
            closed: false,
            loop_y_offset: 0.0,
        }
    }
}

/// One authored curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveDef {
    #[serde(default)]
    pub kind: CurveKindDef,
    /// Arc length; ignored for beziers (derived during generation).
    #[serde(default)]
    pub length: f32,
    /// Bezier end position in the curve-start frame.
    #[serde(default)]
    pub end_position: [f32; 3],
    /// Orientation delta across the curve, degrees (gradient, turn, bank).
    #[serde(default)]
    pub angles: [f32; 3],
    #[serde(default)]
    pub bank_pivot: [f32; 3],
    /// Left/right widening at the curve's end.
    #[serde(default)]
    pub widening: [f32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banking_interpolation: Option<Interpolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widening_interpolation: Option<Interpolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub jump: bool,
    #[serde(default = "default_true")]
    pub respawnable: bool,
    #[serde(default)]
    pub align_meshes_to_end: bool,
    #[serde(default)]
    pub raise_terrain: bool,
    #[serde(default)]
    pub lower_terrain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_start_faces: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_end_faces: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKindDef {
    #[default]
    Arc,
    Bezier,
}

/// One mesh template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDef {
    #[serde(default)]
    pub banking: BankingDef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_z: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_z: Option<f32>,
    #[serde(default)]
    pub surfaces: Vec<SurfaceDef>,
    #[serde(default)]
    pub spaced: Vec<SpacedDef>,
    /// Keyed by group index (TOML keys are strings).
    #[serde(default)]
    pub spacing_groups: HashMap<String, SpacingGroupDef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankingDef {
    #[default]
    Rotate,
    Shear,
}

/// A continuous surface: a cross-section profile extruded along +Z.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceDef {
    pub name: String,
    /// Cross-section polyline, (x, y) pairs left to right.
    pub profile: Vec<[f32; 2]>,
    pub length: f32,
    /// Subdivisions along the length; more slices warp smoother.
    #[serde(default = "default_slices")]
    pub slices: usize,
    #[serde(default)]
    pub collision: bool,
    /// (min_x, max_x) spans that stretch under widening.
    #[serde(default)]
    pub widen_ranges: Vec<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv: Option<UvDef>,
}

fn default_slices() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UvDef {
    pub facing: [f32; 3],
    #[serde(default = "default_max_angle")]
    pub max_angle: f32,
    pub source_u: String,
    pub source_v: String,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_uv_scale")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub offset: [f32; 2],
}

fn default_max_angle() -> f32 {
    45.0
}

fn default_uv_scale() -> [f32; 2] {
    [1.0, 1.0]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacedDef {
    pub name: String,
    pub group: usize,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_max_bank")]
    pub max_bank_angle: f32,
}

fn default_max_bank() -> f32 {
    90.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpacingGroupDef {
    #[serde(default)]
    pub spacing_before: f32,
    #[serde(default)]
    pub spacing_after: f32,
}

fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::from_array(v)
}

fn coord_source(name: &str) -> Result<CoordSource> {
    Ok(match name {
        "track_x" => CoordSource::TrackX,
        "track_y" => CoordSource::TrackY,
        "track_z" => CoordSource::TrackZ,
        "world_x" => CoordSource::WorldX,
        "world_y" => CoordSource::WorldY,
        "world_z" => CoordSource::WorldZ,
        _ => bail!(
            "unknown UV source '{}'; valid values: track_x, track_y, track_z, world_x, world_y, world_z",
            name
        ),
    })
}

impl TrackFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse track file")
    }

    /// Build the runtime track from the authored definitions.
    pub fn to_track(&self) -> Track {
        let params = PathParams {
            segment_length: self.path.segment_length,
            start_position: vec3(self.path.start_position),
            start_direction: vec3(self.path.start_direction),
            start_bank_pivot: Vec3::ZERO,
            start_widening: Widening::ZERO,
            banking_interpolation: self.path.banking_interpolation,
            widening_interpolation: self.path.widening_interpolation,
            overrun: if self.path.closed {
                Overrun::Loop {
                    y_offset: self.path.loop_y_offset,
                }
            } else {
                Overrun::Extrapolate
            },
            world_transform: glam::Mat4::IDENTITY,
        };
        let curves = self.curves.iter().map(CurveDef::to_descriptor).collect();
        Track::with_curves(params, curves)
    }

    /// Build the runtime template set, synthesizing surface meshes.
    pub fn to_templates(&self) -> Result<HashMap<String, MeshTemplate>> {
        let mut templates = HashMap::new();
        for (name, def) in &self.templates {
            templates.insert(
                name.clone(),
                def.to_template(name)
                    .with_context(|| format!("template '{}'", name))?,
            );
        }
        Ok(templates)
    }
}

impl CurveDef {
    pub fn to_descriptor(&self) -> CurveDescriptor {
        let mut curve = match self.kind {
            CurveKindDef::Arc => CurveDescriptor::arc(self.length),
            CurveKindDef::Bezier => CurveDescriptor::bezier(vec3(self.end_position)),
        };
        curve.angles = vec3(self.angles);
        curve.bank_pivot = vec3(self.bank_pivot);
        curve.widening = Widening::new(self.widening[0], self.widening[1]);
        curve.banking_interpolation = self.banking_interpolation;
        curve.widening_interpolation = self.widening_interpolation;
        curve.template = self.template.clone();
        curve.jump = self.jump;
        curve.respawnable = self.respawnable;
        curve.align_meshes_to_end = self.align_meshes_to_end;
        curve.raise_terrain = self.raise_terrain;
        curve.lower_terrain = self.lower_terrain;
        curve.remove_start_faces = self.remove_start_faces;
        curve.remove_end_faces = self.remove_end_faces;
        curve
    }
}

impl TemplateDef {
    pub fn to_template(&self, name: &str) -> Result<MeshTemplate> {
        let mut template = MeshTemplate::new(name);
        template.min_z = self.min_z;
        template.max_z = self.max_z;
        template.banking = match self.banking {
            BankingDef::Rotate => BankingMode::Rotate,
            BankingDef::Shear => BankingMode::Shear,
        };
        for surface in &self.surfaces {
            template.surfaces.push(surface.to_surface()?);
        }
        for spaced in &self.spaced {
            template.spaced.push(SpacedObject {
                name: spaced.name.clone(),
                group: spaced.group,
                position: vec3(spaced.position),
                max_bank_angle: spaced.max_bank_angle,
            });
        }
        for (key, group) in &self.spacing_groups {
            let index: usize = key
                .parse()
                .with_context(|| format!("spacing group key '{}' is not an index", key))?;
            template.spacing_groups.insert(
                index,
                SpacingGroup {
                    spacing_before: group.spacing_before,
                    spacing_after: group.spacing_after,
                },
            );
        }
        Ok(template)
    }
}

impl SurfaceDef {
    /// Extrude the profile into mesh buffers.
    pub fn to_surface(&self) -> Result<SurfaceMesh> {
        if self.profile.len() < 2 {
            bail!("surface '{}' needs at least 2 profile points", self.name);
        }
        if self.length <= 0.0 {
            bail!("surface '{}' needs a positive length", self.name);
        }
        let slices = self.slices.max(1);
        let mut mesh = MeshData::new(&self.name);

        // Each profile segment extrudes into its own quad strip so edges
        // between segments stay crisp.
        for pair in self.profile.windows(2) {
            let a = Vec2::from_array(pair[0]);
            let b = Vec2::from_array(pair[1]);
            let edge = b - a;
            let normal = Vec2::new(-edge.y, edge.x).normalize_or_zero();
            let normal = Vec3::new(normal.x, normal.y, 0.0);

            let base = mesh.positions.len() as u32;
            for s in 0..=slices {
                let z = self.length * s as f32 / slices as f32;
                mesh.positions.push(Vec3::new(a.x, a.y, z));
                mesh.positions.push(Vec3::new(b.x, b.y, z));
                mesh.normals.push(normal);
                mesh.normals.push(normal);
                mesh.uvs.push(Vec2::new(0.0, z));
                mesh.uvs.push(Vec2::new(edge.length(), z));
            }
            for s in 0..slices as u32 {
                let row = base + s * 2;
                mesh.indices
                    .extend_from_slice(&[row, row + 2, row + 1, row + 1, row + 2, row + 3]);
            }
        }
        mesh.recalculate_bounds();

        let mut surface = SurfaceMesh::new(mesh);
        surface.collision = self.collision;
        surface.widen_ranges = self
            .widen_ranges
            .iter()
            .map(|r| WidenRange {
                min_x: r[0],
                max_x: r[1],
            })
            .collect();
        if let Some(uv) = &self.uv {
            surface.uv_generator = Some(UvGenerator {
                facing: vec3(uv.facing),
                max_angle: uv.max_angle,
                source_u: coord_source(&uv.source_u)?,
                source_v: coord_source(&uv.source_v)?,
                rotation: uv.rotation,
                scale: Vec2::from_array(uv.scale),
                offset: Vec2::from_array(uv.offset),
            });
        }
        Ok(surface)
    }
}
