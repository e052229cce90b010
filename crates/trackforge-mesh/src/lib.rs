//! Trackforge Mesh - Template layout, warping and reuse
//!
//! The second half of the pipeline: given a sampled [`trackforge_path::Path`]
//! and a set of mesh templates, plan template-copy placements along the
//! track (tiling, end alignment, jump gaps, spacing groups), warp template
//! geometry into the curved path frame, and reuse previously warped meshes
//! across incremental edits through content-hash keys.

mod build;
mod host;
mod layout;
mod mesh_data;
mod reuse;
mod template;
mod warp;

pub use build::{build_track, update_track, BuildContext, BuildReport, BuiltTrack, GeneratedCopy};
pub use host::{CollectingHost, HostServices, NullHost};
pub use layout::{
    plan_layout, LayoutResult, SpacedPlacement, SpacingState, TemplateCopyPlacement,
};
pub use mesh_data::MeshData;
pub use reuse::{MeshKey, MeshReuseIndex, MeshRegistry, StoredMesh};
pub use template::{
    BankingMode, CoordSource, MeshTemplate, SpacedObject, SpacingGroup, SurfaceMesh,
    TemplateGeometryCache, TemplateInfo, UvGenerator, WidenRange, MAX_SPACING_GROUPS,
};
pub use warp::{warp_surface, WarpContext};
