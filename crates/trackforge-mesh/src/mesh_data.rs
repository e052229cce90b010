//! Mesh buffers
//!
//! The core consumes read-only vertex/normal/UV/triangle buffers from
//! externally-authored template meshes and produces new buffers; it never
//! loads or saves files itself.

use glam::{Vec2, Vec3, Vec4};

/// Plain mesh buffers with an AABB.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Triangle list, CCW winding.
    pub indices: Vec<u32>,
    /// xyz = tangent, w = bitangent sign. Empty until recalculated.
    pub tangents: Vec<Vec4>,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
}

impl MeshData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Recompute the AABB from vertex positions.
    pub fn recalculate_bounds(&mut self) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in &self.positions {
            min = min.min(*p);
            max = max.max(*p);
        }
        if self.positions.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        self.aabb_min = min;
        self.aabb_max = max;
    }

    /// Recompute per-vertex tangents from positions, normals and UVs.
    ///
    /// Standard per-triangle accumulation with Gram-Schmidt
    /// orthogonalization against the vertex normal. Skipped by callers for
    /// collision meshes, which carry no tangents.
    pub fn recalculate_tangents(&mut self) {
        let count = self.positions.len();
        if count == 0 || self.uvs.len() != count || self.normals.len() != count {
            self.tangents.clear();
            return;
        }

        let mut tan_accum = vec![Vec3::ZERO; count];
        let mut bitan_accum = vec![Vec3::ZERO; count];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (p0, p1, p2) = (self.positions[i0], self.positions[i1], self.positions[i2]);
            let (u0, u1, u2) = (self.uvs[i0], self.uvs[i1], self.uvs[i2]);

            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let duv1 = u1 - u0;
            let duv2 = u2 - u0;

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (e1 * duv2.y - e2 * duv1.y) * r;
            let bitangent = (e2 * duv1.x - e1 * duv2.x) * r;

            for &i in &[i0, i1, i2] {
                tan_accum[i] += tangent;
                bitan_accum[i] += bitangent;
            }
        }

        self.tangents = (0..count)
            .map(|i| {
                let n = self.normals[i];
                let t = tan_accum[i];
                let ortho = (t - n * n.dot(t)).normalize_or_zero();
                let sign = if n.cross(t).dot(bitan_accum[i]) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
                Vec4::new(ortho.x, ortho.y, ortho.z, sign)
            })
            .collect();
    }
}
