//! Wavefront OBJ export of built geometry

use std::fmt::Write as _;

use anyhow::Result;
use trackforge_mesh::MeshData;

/// Serialize meshes into one OBJ document, one named object per mesh.
pub fn to_obj_string(meshes: &[&MeshData]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "# trackforge export")?;

    // OBJ face indices are global and 1-based.
    let mut position_base = 1usize;
    let mut uv_base = 1usize;
    let mut normal_base = 1usize;

    for mesh in meshes {
        writeln!(out, "o {}", mesh.name)?;
        for p in &mesh.positions {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for uv in &mesh.uvs {
            writeln!(out, "vt {} {}", uv.x, uv.y)?;
        }
        for n in &mesh.normals {
            writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
        }

        let has_uvs = mesh.uvs.len() == mesh.positions.len();
        let has_normals = mesh.normals.len() == mesh.positions.len();
        for tri in mesh.indices.chunks_exact(3) {
            write!(out, "f")?;
            for &index in tri {
                let i = index as usize;
                match (has_uvs, has_normals) {
                    (true, true) => write!(
                        out,
                        " {}/{}/{}",
                        position_base + i,
                        uv_base + i,
                        normal_base + i
                    )?,
                    (true, false) => write!(out, " {}/{}", position_base + i, uv_base + i)?,
                    (false, true) => write!(out, " {}//{}", position_base + i, normal_base + i)?,
                    (false, false) => write!(out, " {}", position_base + i)?,
                }
            }
            writeln!(out)?;
        }

        position_base += mesh.positions.len();
        uv_base += mesh.uvs.len();
        normal_base += mesh.normals.len();
    }
    Ok(out)
}
