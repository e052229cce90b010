//! Warped-mesh reuse across rebuilds
//!
//! Warping is deterministic, so a warped mesh is fully identified by its
//! source mesh plus the content hashes of the geometric state that shaped
//! it. Keys look up meshes in two registries: an optional read-only project
//! registry shared between tracks, then the scene-local registry where new
//! meshes land. Both registries carry the hash method that produced their
//! keys; mixing methods would silently miss every lookup, so it is an error
//! instead.

use std::collections::HashMap;

use trackforge_core::{HashMethod, Result, TrackError};

use crate::mesh_data::MeshData;

/// Identity of a warped mesh: the template mesh it came from plus hashes of
/// the path state and world placement that shaped it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub base_mesh: String,
    /// Hash of the path-derived shape parameters over the placement range.
    pub param_hash: i32,
    /// Hash of the world placement; differs where the same shape lands at a
    /// different spot.
    pub transform_hash: i32,
}

/// A warped mesh held for reuse.
#[derive(Clone, Debug)]
pub struct StoredMesh {
    pub mesh: MeshData,
    pub name: String,
    /// Eligible for promotion into a shared project registry. Unscaled
    /// copies over arc-only ranges recur across tracks; scaled or
    /// bezier-shaped ones are effectively unique and stay scene-local.
    pub select_for_save: bool,
}

/// One flat key-to-mesh store tagged with its hash method.
#[derive(Debug)]
pub struct MeshRegistry {
    method: HashMethod,
    entries: HashMap<MeshKey, StoredMesh>,
}

impl MeshRegistry {
    pub fn new(method: HashMethod) -> Self {
        Self {
            method,
            entries: HashMap::new(),
        }
    }

    pub fn method(&self) -> HashMethod {
        self.method
    }

    pub fn get(&self, key: &MeshKey) -> Option<&StoredMesh> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: MeshKey, mesh: StoredMesh) {
        self.entries.insert(key, mesh);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MeshKey, &StoredMesh)> {
        self.entries.iter()
    }
}

/// Two-level lookup the build pipeline consults before warping anything.
#[derive(Debug)]
pub struct MeshReuseIndex {
    method: HashMethod,
    project: Option<MeshRegistry>,
    scene: MeshRegistry,
}

impl MeshReuseIndex {
    pub fn new(method: HashMethod) -> Self {
        Self {
            method,
            project: None,
            scene: MeshRegistry::new(method),
        }
    }

    pub fn method(&self) -> HashMethod {
        self.method
    }

    /// Attach a shared read-only registry, consulted before the scene.
    pub fn attach_project_registry(&mut self, registry: MeshRegistry) -> Result<()> {
        if registry.method() != self.method {
            return Err(TrackError::HashMethodMismatch {
                stored: registry.method(),
                requested: self.method,
            });
        }
        self.project = Some(registry);
        Ok(())
    }

    pub fn get(&self, key: &MeshKey) -> Option<&StoredMesh> {
        if let Some(project) = &self.project {
            if let Some(stored) = project.get(key) {
                return Some(stored);
            }
        }
        self.scene.get(key)
    }

    pub fn contains(&self, key: &MeshKey) -> bool {
        self.get(key).is_some()
    }

    /// Record a freshly warped mesh in the scene registry. A key already
    /// present in either registry keeps its existing mesh.
    pub fn store(&mut self, key: MeshKey, mesh: StoredMesh) {
        if self.contains(&key) {
            return;
        }
        self.scene.insert(key, mesh);
    }

    pub fn scene(&self) -> &MeshRegistry {
        &self.scene
    }

    /// Drop scene entries no longer referenced by any generated copy and
    /// return their names. The project registry is shared and never
    /// collected here.
    pub fn garbage_collect(&mut self, usage: &HashMap<MeshKey, usize>) -> Vec<String> {
        let mut removed: Vec<String> = Vec::new();
        self.scene.entries.retain(|key, stored| {
            if usage.get(key).copied().unwrap_or(0) > 0 {
                true
            } else {
                removed.push(stored.name.clone());
                false
            }
        });
        removed.sort();
        removed
    }

    /// Scene meshes worth persisting into a project registry, most-reused
    /// first (ties broken by name for a stable listing).
    pub fn save_candidates(&self, usage: &HashMap<MeshKey, usize>) -> Vec<MeshKey> {
        let mut candidates: Vec<(usize, &str, &MeshKey)> = self
            .scene
            .entries
            .iter()
            .filter(|(_, stored)| stored.select_for_save)
            .map(|(key, stored)| {
                (
                    usage.get(key).copied().unwrap_or(0),
                    stored.name.as_str(),
                    key,
                )
            })
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        candidates.into_iter().map(|(_, _, key)| key.clone()).collect()
    }
}
